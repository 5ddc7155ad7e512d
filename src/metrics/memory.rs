//! In-memory metrics registry using `DashMap`.
//!
//! This is the default backend: every experiment built without an explicit
//! provider registers on [`InMemoryMetricsProvider::global`]. Values live
//! for the life of the process and can be read back by name.

use super::{metric_name, Counter, MetricsProvider, Timer};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static GLOBAL: Lazy<Arc<InMemoryMetricsProvider>> =
    Lazy::new(|| Arc::new(InMemoryMetricsProvider::new()));

/// Point-in-time view of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Number of recorded durations
    pub count: u64,
    /// Sum of recorded durations
    pub total: Duration,
    /// Longest recorded duration
    pub max: Duration,
}

impl TimerSnapshot {
    /// Mean recorded duration, `None` before the first record.
    #[must_use]
    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let mean = self.total.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX)))
    }
}

#[derive(Debug, Default)]
struct MemoryCounter {
    count: AtomicU64,
}

impl Counter for MemoryCounter {
    fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct MemoryTimer {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Timer for MemoryTimer {
    fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }
}

impl MemoryTimer {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
        self.max_nanos.store(0, Ordering::Relaxed);
    }
}

/// Concurrent in-process metrics registry.
///
/// Handles with the same name share one underlying value, so two experiments
/// registered under the same name aggregate into the same counters.
///
/// # Example
///
/// ```rust
/// use scientist::metrics::{InMemoryMetricsProvider, MetricsProvider};
///
/// let provider = InMemoryMetricsProvider::new();
/// provider.counter(&["scientist", "demo", "total"]).increment();
/// assert_eq!(provider.counter_value("scientist.demo.total"), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetricsProvider {
    counters: DashMap<String, Arc<MemoryCounter>>,
    timers: DashMap<String, Arc<MemoryTimer>>,
}

impl InMemoryMetricsProvider {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used when no provider is configured.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Current value of a counter; zero if it was never registered.
    #[must_use]
    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |counter| counter.count.load(Ordering::Relaxed))
    }

    /// Snapshot of a timer, `None` if it was never registered.
    #[must_use]
    pub fn timer_snapshot(&self, name: &str) -> Option<TimerSnapshot> {
        self.timers.get(name).map(|timer| timer.snapshot())
    }

    /// All counters, ordered by name.
    #[must_use]
    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().count.load(Ordering::Relaxed),
                )
            })
            .collect()
    }

    /// Zero every counter and timer in place.
    ///
    /// Handles already given out stay attached to their entries.
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.count.store(0, Ordering::Relaxed);
        }
        for timer in &self.timers {
            timer.reset();
        }
    }
}

impl MetricsProvider for InMemoryMetricsProvider {
    fn timer(&self, name: &[&str]) -> Arc<dyn Timer> {
        let timer = self
            .timers
            .entry(metric_name(name))
            .or_default()
            .value()
            .clone();
        timer
    }

    fn counter(&self, name: &[&str]) -> Arc<dyn Counter> {
        let counter = self
            .counters
            .entry(metric_name(name))
            .or_default()
            .value()
            .clone();
        counter
    }
}
