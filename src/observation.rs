//! Observations - the captured outcome of one timed invocation
//!
//! A computation either returns a value, returns an error, or panics. All
//! three are captured into an [`Outcome`] so that a misbehaving candidate
//! never unwinds through the engine. The control leg goes through
//! [`observe_or_raise`] instead, which hands errors and panics straight back
//! once the timer has been closed.

use crate::metrics::{Timer, TimerContext};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Label of the control leg.
pub const CONTROL: &str = "control";

/// Label of the candidate leg.
pub const CANDIDATE: &str = "candidate";

/// How a computation finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<V, E> {
    /// Returned a value
    Value(V),
    /// Returned an error
    Failed(E),
    /// Panicked; holds the rendered payload
    Panicked(String),
}

/// Outcome discriminant, for summaries and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Returned a value
    Value,
    /// Returned an error
    Failed,
    /// Panicked
    Panicked,
}

impl<V, E> Outcome<V, E> {
    /// Discriminant of this outcome.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Value(_) => OutcomeKind::Value,
            Self::Failed(_) => OutcomeKind::Failed,
            Self::Panicked(_) => OutcomeKind::Panicked,
        }
    }

    /// Whether the computation errored or panicked.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    /// The returned value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The returned error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Captured outcome of one invocation, with its wall-clock duration.
///
/// Immutable once built; the experiment hands it to publishers by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<V, E> {
    label: &'static str,
    outcome: Outcome<V, E>,
    duration: Duration,
}

impl<V, E> Observation<V, E> {
    /// Assemble an observation from parts.
    #[must_use]
    pub const fn new(label: &'static str, outcome: Outcome<V, E>, duration: Duration) -> Self {
        Self {
            label,
            outcome,
            duration,
        }
    }

    /// Leg label (`"control"` or `"candidate"` for engine-built observations).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// How the computation finished.
    #[must_use]
    pub const fn outcome(&self) -> &Outcome<V, E> {
        &self.outcome
    }

    /// The returned value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        self.outcome.value()
    }

    /// The returned error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        self.outcome.error()
    }

    /// Whether the computation errored or panicked.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// Wall-clock time spent in the computation, failure path included.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// [`Self::duration`] in nanoseconds, saturating.
    #[must_use]
    pub fn duration_nanos(&self) -> u64 {
        u64::try_from(self.duration.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Consume into the outcome.
    #[must_use]
    pub fn into_outcome(self) -> Outcome<V, E> {
        self.outcome
    }
}

enum Captured<V, E> {
    Value(V),
    Failed(E),
    Panicked(Box<dyn Any + Send>),
}

/// A finished invocation whose failure has not been routed yet.
///
/// Built wherever the computation ran (possibly a pool thread) and turned
/// into an [`Observation`] or a raised failure wherever the result is
/// consumed.
pub(crate) struct Execution<V, E> {
    label: &'static str,
    captured: Captured<V, E>,
    duration: Duration,
}

impl<V, E> Execution<V, E> {
    /// Invoke `computation` exactly once under `timer`.
    pub(crate) fn run<F>(label: &'static str, timer: &Arc<dyn Timer>, computation: F) -> Self
    where
        F: FnOnce() -> Result<V, E>,
    {
        let context = TimerContext::start(timer);
        let captured = match panic::catch_unwind(AssertUnwindSafe(computation)) {
            Ok(Ok(value)) => Captured::Value(value),
            Ok(Err(err)) => Captured::Failed(err),
            Err(payload) => Captured::Panicked(payload),
        };
        let duration = context.stop();
        tracing::trace!(leg = label, nanos = duration.as_nanos(), "observation timed");
        Self {
            label,
            captured,
            duration,
        }
    }

    /// Keep every outcome, panics included, as data.
    pub(crate) fn into_observation(self) -> Observation<V, E> {
        let outcome = match self.captured {
            Captured::Value(value) => Outcome::Value(value),
            Captured::Failed(err) => Outcome::Failed(err),
            Captured::Panicked(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
        };
        Observation::new(self.label, outcome, self.duration)
    }

    /// Return errors to the caller and resume panics on the current thread.
    pub(crate) fn into_raising(self) -> Result<Observation<V, E>, E> {
        match self.captured {
            Captured::Value(value) => Ok(Observation::new(
                self.label,
                Outcome::Value(value),
                self.duration,
            )),
            Captured::Failed(err) => Err(err),
            Captured::Panicked(payload) => panic::resume_unwind(payload),
        }
    }

    /// Like [`Self::into_raising`], also handing back a copy of the value.
    pub(crate) fn into_raising_cloned(self) -> Result<(V, Observation<V, E>), E>
    where
        V: Clone,
    {
        match self.captured {
            Captured::Value(value) => Ok((
                value.clone(),
                Observation::new(self.label, Outcome::Value(value), self.duration),
            )),
            Captured::Failed(err) => Err(err),
            Captured::Panicked(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Time `computation` and capture whatever it does.
///
/// Errors and panics become [`Outcome::Failed`] and [`Outcome::Panicked`];
/// nothing escapes. The timer is closed before this returns.
///
/// Capturing a panic does not silence it: the process panic hook runs before
/// unwinding reaches this function, so the default hook still prints a
/// "thread panicked" report to stderr. Install a quieter hook with
/// [`std::panic::set_hook`] if candidate panics must not show up there.
///
/// ```rust
/// use scientist::observation::{observe, Outcome, CANDIDATE};
/// use scientist::{MetricsProvider, NoopMetricsProvider};
///
/// let timer = NoopMetricsProvider::new().timer(&["scientist", "doc", "candidate"]);
///
/// let default_hook = std::panic::take_hook();
/// std::panic::set_hook(Box::new(|_| {}));
/// let observation = observe::<u8, String, _>(CANDIDATE, &timer, || panic!("quietly"));
/// std::panic::set_hook(default_hook);
///
/// assert_eq!(observation.outcome(), &Outcome::Panicked("quietly".to_string()));
/// ```
pub fn observe<V, E, F>(label: &'static str, timer: &Arc<dyn Timer>, computation: F) -> Observation<V, E>
where
    F: FnOnce() -> Result<V, E>,
{
    Execution::run(label, timer, computation).into_observation()
}

/// Time `computation`; return its error unchanged, or resume its panic.
///
/// The timer is always closed first, so a failing control leg is still
/// measured.
///
/// # Errors
///
/// Returns the computation's own error.
pub fn observe_or_raise<V, E, F>(
    label: &'static str,
    timer: &Arc<dyn Timer>,
    computation: F,
) -> Result<Observation<V, E>, E>
where
    F: FnOnce() -> Result<V, E>,
{
    Execution::run(label, timer, computation).into_raising()
}

/// Render a panic payload the way the default hook would.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{InMemoryMetricsProvider, MetricsProvider};

    fn timer(provider: &InMemoryMetricsProvider) -> Arc<dyn Timer> {
        provider.timer(&["scientist", "obs", "candidate"])
    }

    #[test]
    fn test_observe_value() {
        let provider = InMemoryMetricsProvider::new();
        let observation: Observation<i32, String> = observe(CANDIDATE, &timer(&provider), || Ok(3));

        assert_eq!(observation.label(), "candidate");
        assert_eq!(observation.value(), Some(&3));
        assert!(observation.error().is_none());
        assert!(!observation.is_failure());
        assert_eq!(observation.outcome().kind(), OutcomeKind::Value);
    }

    #[test]
    fn test_observe_error_is_captured() {
        let provider = InMemoryMetricsProvider::new();
        let observation: Observation<i32, String> =
            observe(CANDIDATE, &timer(&provider), || Err("nope".to_string()));

        assert!(observation.is_failure());
        assert_eq!(observation.error(), Some(&"nope".to_string()));
        assert!(observation.value().is_none());
    }

    #[test]
    fn test_observe_panic_is_captured() {
        let provider = InMemoryMetricsProvider::new();
        let observation: Observation<i32, String> =
            observe(CANDIDATE, &timer(&provider), || panic!("candidate blew up"));

        assert_eq!(
            observation.outcome(),
            &Outcome::Panicked("candidate blew up".to_string())
        );
        assert_eq!(observation.outcome().kind(), OutcomeKind::Panicked);
    }

    #[test]
    fn test_observe_records_timer_even_on_failure() {
        let provider = InMemoryMetricsProvider::new();
        let _: Observation<i32, String> = observe(CANDIDATE, &timer(&provider), || {
            std::thread::sleep(Duration::from_millis(2));
            Err("late failure".to_string())
        });

        let snapshot = provider
            .timer_snapshot("scientist.obs.candidate")
            .unwrap();
        assert_eq!(snapshot.count, 1);
        assert!(snapshot.total >= Duration::from_millis(2));
    }

    #[test]
    fn test_duration_includes_failure_path() {
        let provider = InMemoryMetricsProvider::new();
        let observation: Observation<i32, String> = observe(CANDIDATE, &timer(&provider), || {
            std::thread::sleep(Duration::from_millis(2));
            Err("slow".to_string())
        });

        assert!(observation.duration() >= Duration::from_millis(2));
        assert!(observation.duration_nanos() >= 2_000_000);
    }

    #[test]
    fn test_observe_or_raise_returns_error_after_timing() {
        let provider = InMemoryMetricsProvider::new();
        let raised: Result<Observation<i32, String>, String> =
            observe_or_raise(CONTROL, &timer(&provider), || Err("control down".to_string()));

        assert_eq!(raised.unwrap_err(), "control down");
        assert_eq!(
            provider
                .timer_snapshot("scientist.obs.candidate")
                .unwrap()
                .count,
            1
        );
    }

    #[test]
    fn test_observe_or_raise_resumes_original_panic() {
        let provider = InMemoryMetricsProvider::new();
        let timer = timer(&provider);

        let payload = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<Observation<i32, String>, String> =
                observe_or_raise(CONTROL, &timer, || panic!("control panic"));
        }))
        .unwrap_err();

        assert_eq!(panic_message(payload.as_ref()), "control panic");
        assert_eq!(
            provider
                .timer_snapshot("scientist.obs.candidate")
                .unwrap()
                .count,
            1
        );
    }

    #[test]
    fn test_into_raising_cloned_hands_back_value() {
        let provider = InMemoryMetricsProvider::new();
        let execution: Execution<String, String> =
            Execution::run(CONTROL, &timer(&provider), || Ok("ok".to_string()));

        let (value, observation) = execution.into_raising_cloned().unwrap();
        assert_eq!(value, "ok");
        assert_eq!(observation.value(), Some(&"ok".to_string()));
    }

    #[test]
    fn test_absent_value_is_still_a_value() {
        let provider = InMemoryMetricsProvider::new();
        let observation: Observation<Option<i32>, String> =
            observe(CANDIDATE, &timer(&provider), || Ok(None));

        assert_eq!(observation.value(), Some(&None));
        assert!(!observation.is_failure());
    }

    #[test]
    fn test_panic_message_non_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
    }
}
