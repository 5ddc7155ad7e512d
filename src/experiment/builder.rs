use super::{Experiment, Gate, Inner, RunOrder, WorkerPool, DEFAULT_POOL_SIZE};
use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::experiment::ExperimentSettings;
use crate::metrics::{ExperimentMetrics, InMemoryMetricsProvider, MetricsProvider};
use crate::publisher::Publisher;
use crate::result::Context;
use std::fmt;
use std::sync::Arc;

const DEFAULT_NAME: &str = "Experiment";

/// Fluent configuration for an [`Experiment`].
///
/// Every setting has a default: name `"Experiment"`, no raising, `==`
/// comparison for same-typed experiments, the process-wide in-memory metrics
/// registry, a no-op publisher, both gates open, synchronous mode and random
/// leg order.
pub struct ExperimentBuilder<T, U = T, E = anyhow::Error> {
    name: String,
    context: Context,
    raise_on_mismatch: bool,
    comparator: Comparator<T, U>,
    metrics: Option<Arc<dyn MetricsProvider>>,
    publisher: Publisher<T, U, E>,
    run_if: Option<Gate>,
    enabled: Option<Gate>,
    async_mode: bool,
    pool: Option<WorkerPool>,
    pool_size: usize,
    order: RunOrder,
}

impl<T: PartialEq + 'static, E> ExperimentBuilder<T, T, E> {
    /// Builder comparing with `==`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Comparator::equality())
    }
}

impl<T: PartialEq + 'static, E> Default for ExperimentBuilder<T, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, U, E> ExperimentBuilder<T, U, E> {
    /// Builder with an explicit comparator.
    #[must_use]
    pub fn with_comparator(comparator: Comparator<T, U>) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            context: Context::new(),
            raise_on_mismatch: false,
            comparator,
            metrics: None,
            publisher: Publisher::noop(),
            run_if: None,
            enabled: None,
            async_mode: false,
            pool: None,
            pool_size: DEFAULT_POOL_SIZE,
            order: RunOrder::default(),
        }
    }

    /// Experiment name; also the metrics namespace.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the whole context map.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Add one context entry.
    #[must_use]
    pub fn context_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Raise mismatches to the caller instead of recording them.
    #[must_use]
    pub const fn raise_on_mismatch(mut self, raise: bool) -> Self {
        self.raise_on_mismatch = raise;
        self
    }

    /// Equivalence predicate.
    #[must_use]
    pub fn comparator(mut self, comparator: Comparator<T, U>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Metrics backend. Defaults to [`InMemoryMetricsProvider::global`].
    #[must_use]
    pub fn metrics(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.metrics = Some(provider);
        self
    }

    /// Result sink.
    #[must_use]
    pub fn publisher(mut self, publisher: Publisher<T, U, E>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Per-run predicate; the candidate runs only while it returns `true`.
    #[must_use]
    pub fn run_if<F>(mut self, gate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.run_if = Some(Arc::new(gate));
        self
    }

    /// Global switch, consulted together with [`Self::run_if`].
    #[must_use]
    pub fn enabled<F>(mut self, gate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(gate));
        self
    }

    /// Run legs on a worker pool.
    #[must_use]
    pub const fn async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Use an existing pool instead of creating one.
    ///
    /// Does not switch on asynchronous mode by itself.
    #[must_use]
    pub fn pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Worker count for the pool created at build time.
    #[must_use]
    pub const fn pool_size(mut self, threads: usize) -> Self {
        self.pool_size = threads;
        self
    }

    /// Leg ordering policy.
    #[must_use]
    pub const fn order(mut self, order: RunOrder) -> Self {
        self.order = order;
        self
    }

    /// Apply externally loaded settings.
    ///
    /// Only fields present in the document are applied; everything else keeps
    /// the builder's current value. Context entries are merged into the
    /// existing map. `enabled: false` closes the enabled gate, while
    /// `enabled: true` leaves any gate set with [`Self::enabled`] in place.
    #[must_use]
    pub fn settings(mut self, settings: &ExperimentSettings) -> Self {
        if let Some(name) = &settings.name {
            self.name.clone_from(name);
        }
        if let Some(raise) = settings.raise_on_mismatch {
            self.raise_on_mismatch = raise;
        }
        if let Some(async_mode) = settings.async_mode {
            self.async_mode = async_mode;
        }
        if let Some(threads) = settings.pool_size {
            self.pool_size = threads;
        }
        if let Some(order) = settings.order {
            self.order = order;
        }
        self.context.extend(settings.context.clone());

        if settings.enabled == Some(false) {
            self.enabled = Some(Arc::new(|| false));
        }
        self
    }

    /// Validate and assemble the experiment.
    ///
    /// Asynchronous experiments without an explicit pool get a dedicated
    /// pool of [`Self::pool_size`] workers.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] for a blank name or a zero pool size
    /// - [`Error::PoolBuild`] if the pool threads cannot be spawned
    pub fn build(self) -> Result<Experiment<T, U, E>> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "experiment name must not be empty".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }

        let pool = match (self.async_mode, self.pool) {
            (true, None) => Some(WorkerPool::new(self.pool_size)?),
            (_, pool) => pool,
        };

        let provider = self
            .metrics
            .unwrap_or_else(|| InMemoryMetricsProvider::global() as Arc<dyn MetricsProvider>);
        let metrics = ExperimentMetrics::register(provider.as_ref(), &self.name);

        tracing::debug!(
            experiment = %self.name,
            async_mode = self.async_mode,
            raise_on_mismatch = self.raise_on_mismatch,
            "experiment configured"
        );

        Ok(Experiment {
            inner: Arc::new(Inner {
                name: self.name,
                raise_on_mismatch: self.raise_on_mismatch,
                context: Arc::new(self.context),
                comparator: self.comparator,
                publisher: self.publisher,
                run_if: self.run_if.unwrap_or_else(open_gate),
                enabled: self.enabled.unwrap_or_else(open_gate),
                async_mode: self.async_mode,
                pool,
                order: self.order,
                metrics,
            }),
        })
    }
}

fn open_gate() -> Gate {
    Arc::new(|| true)
}

impl<T, U, E> fmt::Debug for ExperimentBuilder<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentBuilder")
            .field("name", &self.name)
            .field("raise_on_mismatch", &self.raise_on_mismatch)
            .field("async_mode", &self.async_mode)
            .field("pool_size", &self.pool_size)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
