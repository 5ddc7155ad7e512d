//! Metrics facade
//!
//! The engine never talks to a metrics backend directly. It asks a
//! [`MetricsProvider`] for named [`Timer`] and [`Counter`] handles once, at
//! build time, and drives them from then on.
//!
//! ## Naming
//!
//! Names are dot-joined components under [`NAMESPACE_PREFIX`]:
//!
//! ```text
//! scientist.<experiment>.control               timer
//! scientist.<experiment>.candidate             timer
//! scientist.<experiment>.mismatch              counter
//! scientist.<experiment>.candidate.exception   counter
//! scientist.<experiment>.total                 counter
//! ```
//!
//! ## Backends
//!
//! - [`NoopMetricsProvider`]: measures, records nothing
//! - [`InMemoryMetricsProvider`]: concurrent in-process registry, readable back
//! - `MetricsFacadeProvider`: forwards to the `metrics` crate recorder
//!   (feature `metrics-facade`)

#[cfg(feature = "metrics-facade")]
mod facade;
mod memory;
mod noop;

#[cfg(feature = "metrics-facade")]
pub use facade::MetricsFacadeProvider;
pub use memory::{InMemoryMetricsProvider, TimerSnapshot};
pub use noop::NoopMetricsProvider;

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prefix shared by every metric the engine registers.
pub const NAMESPACE_PREFIX: &str = "scientist";

/// Join name components into a dotted metric name.
#[must_use]
pub fn metric_name(components: &[&str]) -> String {
    components.join(".")
}

/// Sink for elapsed durations.
pub trait Timer: Send + Sync {
    /// Record one measured duration.
    fn record(&self, elapsed: Duration);
}

/// Monotonic event counter.
pub trait Counter: Send + Sync {
    /// Add one.
    fn increment(&self);
}

/// Source of named timers and counters.
///
/// Implementations must hand out thread-safe handles: the engine drives them
/// from the caller's thread and from worker pool threads concurrently.
pub trait MetricsProvider: Send + Sync {
    /// Timer registered under the joined `name` components.
    fn timer(&self, name: &[&str]) -> Arc<dyn Timer>;

    /// Counter registered under the joined `name` components.
    fn counter(&self, name: &[&str]) -> Arc<dyn Counter>;
}

/// Running measurement on a [`Timer`].
///
/// The elapsed time is recorded exactly once: by [`TimerContext::stop`], or
/// on drop if the guard was never stopped (a computation unwinding through
/// it still gets timed).
#[must_use = "a timer context records on stop or drop"]
pub struct TimerContext {
    timer: Arc<dyn Timer>,
    started: Instant,
    stopped: bool,
}

impl TimerContext {
    /// Start measuring against `timer`.
    pub fn start(timer: &Arc<dyn Timer>) -> Self {
        Self {
            timer: Arc::clone(timer),
            started: Instant::now(),
            stopped: false,
        }
    }

    /// Time elapsed so far, without stopping.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop, record, and return the elapsed time.
    pub fn stop(mut self) -> Duration {
        let elapsed = self.started.elapsed();
        self.stopped = true;
        self.timer.record(elapsed);
        elapsed
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        if !self.stopped {
            self.timer.record(self.started.elapsed());
        }
    }
}

/// Run `work` under `timer`, returning its output and the elapsed time.
pub fn measure<R>(timer: &Arc<dyn Timer>, work: impl FnOnce() -> R) -> (R, Duration) {
    let context = TimerContext::start(timer);
    let output = work();
    (output, context.stop())
}

/// The five handles one experiment drives.
#[derive(Clone)]
pub struct ExperimentMetrics {
    pub(crate) control_timer: Arc<dyn Timer>,
    pub(crate) candidate_timer: Arc<dyn Timer>,
    pub(crate) mismatch: Arc<dyn Counter>,
    pub(crate) candidate_exception: Arc<dyn Counter>,
    pub(crate) total: Arc<dyn Counter>,
}

impl ExperimentMetrics {
    /// Register the handles for experiment `name` on `provider`.
    #[must_use]
    pub fn register(provider: &dyn MetricsProvider, name: &str) -> Self {
        Self {
            control_timer: provider.timer(&[NAMESPACE_PREFIX, name, "control"]),
            candidate_timer: provider.timer(&[NAMESPACE_PREFIX, name, "candidate"]),
            mismatch: provider.counter(&[NAMESPACE_PREFIX, name, "mismatch"]),
            candidate_exception: provider.counter(&[NAMESPACE_PREFIX, name, "candidate", "exception"]),
            total: provider.counter(&[NAMESPACE_PREFIX, name, "total"]),
        }
    }
}

impl std::fmt::Debug for ExperimentMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentMetrics").finish_non_exhaustive()
    }
}
