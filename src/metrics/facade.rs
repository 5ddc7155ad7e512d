//! Adapter onto the `metrics` crate.
//!
//! Counters become `metrics::counter!`, timers become `metrics::histogram!`
//! recording seconds. Whatever recorder the application installed (Prometheus
//! exporter, statsd, ...) receives them; with no recorder they are no-ops.

use super::{metric_name, Counter, MetricsProvider, Timer};
use std::sync::Arc;
use std::time::Duration;

struct FacadeTimer {
    histogram: ::metrics::Histogram,
}

impl Timer for FacadeTimer {
    fn record(&self, elapsed: Duration) {
        self.histogram.record(elapsed.as_secs_f64());
    }
}

struct FacadeCounter {
    counter: ::metrics::Counter,
}

impl Counter for FacadeCounter {
    fn increment(&self) {
        self.counter.increment(1);
    }
}

/// Provider forwarding to the globally installed `metrics` recorder.
///
/// Handles are resolved once, when the experiment is built, so the recorder
/// must be installed before building experiments.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacadeProvider;

impl MetricsFacadeProvider {
    /// Create the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MetricsProvider for MetricsFacadeProvider {
    fn timer(&self, name: &[&str]) -> Arc<dyn Timer> {
        Arc::new(FacadeTimer {
            histogram: ::metrics::histogram!(metric_name(name)),
        })
    }

    fn counter(&self, name: &[&str]) -> Arc<dyn Counter> {
        Arc::new(FacadeCounter {
            counter: ::metrics::counter!(metric_name(name)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_without_recorder_is_inert() {
        let provider = MetricsFacadeProvider::new();
        provider
            .timer(&["scientist", "facade", "control"])
            .record(Duration::from_millis(3));
        provider.counter(&["scientist", "facade", "total"]).increment();
    }
}
