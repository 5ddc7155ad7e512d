//! Metrics provider that discards everything.

use super::{Counter, MetricsProvider, Timer};
use std::sync::Arc;
use std::time::Duration;

struct NoopTimer;

impl Timer for NoopTimer {
    fn record(&self, _elapsed: Duration) {}
}

struct NoopCounter;

impl Counter for NoopCounter {
    fn increment(&self) {}
}

/// Provider for environments that do not collect metrics.
///
/// Observations are still timed (their duration comes from the timer
/// context, not from the backend); only the recording is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsProvider;

impl NoopMetricsProvider {
    /// Create the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MetricsProvider for NoopMetricsProvider {
    fn timer(&self, _name: &[&str]) -> Arc<dyn Timer> {
        Arc::new(NoopTimer)
    }

    fn counter(&self, _name: &[&str]) -> Arc<dyn Counter> {
        Arc::new(NoopCounter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TimerContext;

    #[test]
    fn test_noop_still_measures() {
        let provider = NoopMetricsProvider::new();
        let timer = provider.timer(&["scientist", "noop", "control"]);

        let context = TimerContext::start(&timer);
        std::thread::sleep(Duration::from_millis(1));
        assert!(context.stop() >= Duration::from_millis(1));

        provider.counter(&["scientist", "noop", "total"]).increment();
    }
}
