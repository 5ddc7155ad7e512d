//! Publication sink
//!
//! Every run in which the candidate executed ends by handing its
//! [`ExperimentResult`] to the experiment's [`Publisher`]. The default sink
//! does nothing; [`Publisher::tracing`] logs a summary; anything else is a
//! caller-supplied closure.

use crate::result::ExperimentResult;
use std::fmt;
use std::sync::Arc;

type Sink<T, U, E> = dyn Fn(&ExperimentResult<T, U, E>) -> anyhow::Result<()> + Send + Sync;

/// Observer invoked with each completed result.
///
/// A sink may fail. In synchronous mode, and in asynchronous mode with
/// raise-on-mismatch, the failure reaches the caller as
/// [`Error::Publish`](crate::Error::Publish); in background mode it is
/// logged and dropped.
pub struct Publisher<T, U = T, E = anyhow::Error> {
    sink: Option<Arc<Sink<T, U, E>>>,
}

impl<T, U, E> Publisher<T, U, E> {
    /// Sink that ignores every result.
    #[must_use]
    pub const fn noop() -> Self {
        Self { sink: None }
    }

    /// Wrap a closure.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&ExperimentResult<T, U, E>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Sink that logs each result through `tracing`.
    ///
    /// Matches are logged at `INFO`, mismatches at `WARN`, each with the
    /// JSON-serialized [`ResultSummary`](crate::ResultSummary).
    #[must_use]
    pub fn tracing() -> Self
    where
        T: 'static,
        U: 'static,
        E: 'static,
    {
        Self::new(|result: &ExperimentResult<T, U, E>| {
            let summary = result.summary();
            let rendered = serde_json::to_string(&summary)?;
            if summary.matched == Some(false) {
                tracing::warn!(
                    experiment = %summary.experiment,
                    summary = %rendered,
                    "candidate mismatched control"
                );
            } else {
                tracing::info!(
                    experiment = %summary.experiment,
                    summary = %rendered,
                    "candidate matched control"
                );
            }
            Ok(())
        })
    }

    /// Whether this is the no-op sink.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.sink.is_none()
    }

    /// Hand `result` to the sink.
    ///
    /// # Errors
    ///
    /// Whatever the sink returns.
    pub fn publish(&self, result: &ExperimentResult<T, U, E>) -> anyhow::Result<()> {
        match &self.sink {
            Some(sink) => sink(result),
            None => Ok(()),
        }
    }
}

impl<T, U, E> Default for Publisher<T, U, E> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<T, U, E> Clone for Publisher<T, U, E> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<T, U, E> fmt::Debug for Publisher<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("noop", &self.is_noop())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Experiment;
    use crate::metrics::NoopMetricsProvider;
    use crate::observation::{Observation, Outcome, CANDIDATE, CONTROL};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn result(candidate: i32) -> ExperimentResult<i32, i32, String> {
        let experiment: Experiment<i32, i32, String> = Experiment::builder()
            .name("publisher-test")
            .metrics(Arc::new(NoopMetricsProvider::new()))
            .build()
            .unwrap();
        ExperimentResult::new(
            &experiment,
            Observation::new(CONTROL, Outcome::Value(1), Duration::ZERO),
            Some(Observation::new(CANDIDATE, Outcome::Value(candidate), Duration::ZERO)),
        )
        .unwrap()
    }

    #[test]
    fn test_noop_default() {
        let publisher: Publisher<i32, i32, String> = Publisher::default();
        assert!(publisher.is_noop());
        assert!(publisher.publish(&result(1)).is_ok());
    }

    #[test]
    fn test_closure_sink_sees_result() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let publisher = Publisher::new(move |r: &ExperimentResult<i32, i32, String>| {
            assert_eq!(r.matched(), Some(true));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        publisher.publish(&result(1)).unwrap();
        publisher.clone().publish(&result(1)).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!publisher.is_noop());
    }

    #[test]
    fn test_failing_sink_propagates() {
        let publisher: Publisher<i32, i32, String> =
            Publisher::new(|_| Err(anyhow::anyhow!("sink offline")));

        let err = publisher.publish(&result(1)).unwrap_err();
        assert_eq!(err.to_string(), "sink offline");
    }

    #[test]
    fn test_tracing_sink_handles_both_verdicts() {
        let publisher: Publisher<i32, i32, String> = Publisher::tracing();
        assert!(publisher.publish(&result(1)).is_ok());
        assert!(publisher.publish(&result(2)).is_ok());
    }
}
