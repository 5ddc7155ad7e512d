//! Experiment engine
//!
//! Runs a trusted control computation and an untrusted candidate side by
//! side, returns the control's outcome to the caller untouched, and reports
//! how the candidate compared.
//!
//! ## Run lifecycle
//!
//! ```text
//! run(control, candidate)
//!   ├─ gate: run_if() && enabled()      false → control only, no comparison
//!   ├─ order: coin flip                 control first | candidate first
//!   ├─ observe both legs                control errors/panics go to the caller
//!   ├─ count candidate failure
//!   ├─ ExperimentResult::new            compare, count total/mismatch,
//!   │                                   raise if raise_on_mismatch
//!   ├─ publish
//!   └─ return control's value
//! ```
//!
//! In asynchronous mode both legs are submitted to the worker pool and the
//! caller only waits for control. Comparison and publication run as a
//! continuation job; the caller joins it only when the experiment raises on
//! mismatch.
//!
//! ## Usage
//!
//! ```rust
//! use scientist::Experiment;
//!
//! let experiment: Experiment<u64> = Experiment::builder()
//!     .name("fibonacci")
//!     .build()?;
//!
//! let value = experiment.run(
//!     || Ok(55),
//!     || Ok((0..10).fold((0_u64, 1_u64), |(a, b), _| (b, a + b)).0),
//! )?;
//! assert_eq!(value, 55);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod order;
mod pool;
mod settings;

pub use builder::ExperimentBuilder;
pub use order::RunOrder;
pub use pool::{WorkerPool, DEFAULT_POOL_SIZE};
pub use settings::ExperimentSettings;

use crate::comparator::Comparator;
use crate::error::{Error, MismatchError, RunError};
use crate::metrics::ExperimentMetrics;
use crate::observation::{observe, observe_or_raise, Execution, Observation, Outcome, CANDIDATE, CONTROL};
use crate::publisher::Publisher;
use crate::result::{Context, ExperimentResult};
use crossbeam::channel;
use std::fmt;
use std::panic;
use std::sync::Arc;
use tracing::{debug, warn};

type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

/// A configured control/candidate experiment.
///
/// `T` is the control's value type, `U` the candidate's (defaults to `T`),
/// `E` the error type both computations return. Cloning is cheap and clones
/// share configuration and metrics handles.
pub struct Experiment<T, U = T, E = anyhow::Error> {
    inner: Arc<Inner<T, U, E>>,
}

struct Inner<T, U, E> {
    name: String,
    raise_on_mismatch: bool,
    context: Arc<Context>,
    comparator: Comparator<T, U>,
    publisher: Publisher<T, U, E>,
    run_if: Gate,
    enabled: Gate,
    async_mode: bool,
    pool: Option<WorkerPool>,
    order: RunOrder,
    metrics: ExperimentMetrics,
}

impl<T: PartialEq + 'static, E> Experiment<T, T, E> {
    /// Builder for a same-typed experiment compared with `==`.
    #[must_use]
    pub fn builder() -> ExperimentBuilder<T, T, E> {
        ExperimentBuilder::new()
    }
}

impl<T, U, E> Experiment<T, U, E> {
    /// Builder for an experiment compared with `comparator`.
    ///
    /// Required when control and candidate return different types.
    #[must_use]
    pub fn builder_with(comparator: Comparator<T, U>) -> ExperimentBuilder<T, U, E> {
        ExperimentBuilder::with_comparator(comparator)
    }

    /// Experiment name, also the metrics namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether mismatches are raised to the caller.
    #[must_use]
    pub fn raise_on_mismatch(&self) -> bool {
        self.inner.raise_on_mismatch
    }

    /// Whether [`Self::run`] executes on the worker pool.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.inner.async_mode
    }

    /// Context attached to every result.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    /// Leg ordering policy.
    #[must_use]
    pub fn order(&self) -> RunOrder {
        self.inner.order
    }

    /// Configured worker pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&WorkerPool> {
        self.inner.pool.as_ref()
    }

    /// Evaluate the run-if and enabled gates for one run.
    #[must_use]
    pub fn candidate_enabled(&self) -> bool {
        let run = (self.inner.run_if)() && (self.inner.enabled)();
        if !run {
            debug!(experiment = %self.inner.name, "candidate gated off");
        }
        run
    }

    pub(crate) fn shared_context(&self) -> Arc<Context> {
        Arc::clone(&self.inner.context)
    }
}

impl<T, U, E> Experiment<T, U, E>
where
    T: fmt::Debug,
    U: fmt::Debug,
    E: fmt::Debug,
{
    /// Compare two observations.
    ///
    /// They match when the candidate produced a value and the comparator
    /// accepts it against the control's value. Every call counts one
    /// comparison; a non-match also counts one mismatch.
    ///
    /// # Errors
    ///
    /// Returns the [`MismatchError`] describing a non-match: the candidate's
    /// error type and debug rendering when it failed, or both values when
    /// they differ.
    pub fn compare(
        &self,
        control: &Observation<T, E>,
        candidate: &Observation<U, E>,
    ) -> Result<(), MismatchError> {
        let matched = match (control.value(), candidate.outcome()) {
            (Some(control), Outcome::Value(candidate)) => {
                self.inner.comparator.matches(control, candidate)
            }
            _ => false,
        };

        self.inner.metrics.total.increment();
        if matched {
            return Ok(());
        }

        self.inner.metrics.mismatch.increment();
        Err(self.describe_mismatch(control, candidate))
    }

    fn describe_mismatch(
        &self,
        control: &Observation<T, E>,
        candidate: &Observation<U, E>,
    ) -> MismatchError {
        let name = &self.inner.name;
        let label = candidate.label();
        match (control.value(), candidate.outcome()) {
            (_, Outcome::Failed(err)) => MismatchError::candidate_failed(
                name,
                label,
                std::any::type_name::<E>(),
                &format!("{err:?}"),
            ),
            (_, Outcome::Panicked(payload)) => {
                MismatchError::candidate_panicked(name, label, payload)
            }
            (Some(control), Outcome::Value(candidate)) => MismatchError::value_mismatch(
                name,
                label,
                &format!("{control:?}"),
                &format!("{candidate:?}"),
            ),
            (None, Outcome::Value(_)) => MismatchError::control_unavailable(name, label),
        }
    }

    /// Run both legs on the calling thread, in randomized order.
    ///
    /// Returns the control's value, or the control's own error. The candidate
    /// can only affect the outcome through a mismatch when the experiment
    /// raises on mismatch, or through a failing publisher.
    ///
    /// A panicking control resumes its panic here; a panicking candidate is
    /// recorded as a failure. The process panic hook still reports a candidate
    /// panic on stderr; see [`observe`](crate::observation::observe).
    ///
    /// # Errors
    ///
    /// - [`RunError::Control`] with the control's error
    /// - [`Error::Mismatch`] if the legs disagree and the experiment raises
    /// - [`Error::Publish`] if the publisher fails
    pub fn run_sync<FC, FD>(&self, control: FC, candidate: FD) -> Result<T, RunError<E>>
    where
        FC: FnOnce() -> Result<T, E>,
        FD: FnOnce() -> Result<U, E>,
    {
        let metrics = &self.inner.metrics;

        if !self.candidate_enabled() {
            let control = observe_or_raise(CONTROL, &metrics.control_timer, control)
                .map_err(RunError::Control)?;
            return control_value(control);
        }

        let (control, candidate) = if self.inner.order.control_first() {
            let control = observe_or_raise(CONTROL, &metrics.control_timer, control)
                .map_err(RunError::Control)?;
            let candidate = observe(CANDIDATE, &metrics.candidate_timer, candidate);
            (control, candidate)
        } else {
            let candidate = observe(CANDIDATE, &metrics.candidate_timer, candidate);
            let control = observe_or_raise(CONTROL, &metrics.control_timer, control)
                .map_err(RunError::Control)?;
            (control, candidate)
        };

        let result = self.conclude(control, candidate)?;
        control_value(result.into_control())
    }

    /// Count, compare and publish one pair of observations.
    fn conclude(
        &self,
        control: Observation<T, E>,
        candidate: Observation<U, E>,
    ) -> crate::Result<ExperimentResult<T, U, E>> {
        if candidate.is_failure() {
            self.inner.metrics.candidate_exception.increment();
        }

        let result = ExperimentResult::new(self, control, Some(candidate))?;
        self.inner
            .publisher
            .publish(&result)
            .map_err(Error::Publish)?;
        Ok(result)
    }
}

impl<T, U, E> Experiment<T, U, E>
where
    T: fmt::Debug + Clone + Send + 'static,
    U: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// Run the experiment in its configured mode.
    ///
    /// The bounds cover both modes: asynchronous runs move the closures onto
    /// pool threads and hand a clone of control's value to the comparison
    /// job. Synchronous-only experiments over a control type that is not
    /// `Clone` or `Send` can call [`Self::run_sync`] directly, which has no
    /// such bounds.
    ///
    /// # Errors
    ///
    /// See [`Self::run_sync`] and [`Self::run_async`].
    pub fn run<FC, FD>(&self, control: FC, candidate: FD) -> Result<T, RunError<E>>
    where
        FC: FnOnce() -> Result<T, E> + Send + 'static,
        FD: FnOnce() -> Result<U, E> + Send + 'static,
    {
        if self.inner.async_mode {
            self.run_async(control, candidate)
        } else {
            self.run_sync(control, candidate)
        }
    }

    /// Run both legs concurrently on the worker pool.
    ///
    /// The caller waits for the control job only. Comparison and publication
    /// happen in a continuation job, which the caller also waits for when the
    /// experiment raises on mismatch; otherwise mismatches and publisher
    /// failures are absorbed in the background.
    ///
    /// Uses the configured pool, or [`WorkerPool::shared`] when none was set.
    /// Must not be called from a thread of that same pool.
    ///
    /// # Errors
    ///
    /// - [`RunError::Control`] with the control's error
    /// - [`Error::Mismatch`] / [`Error::Publish`] when raising on mismatch
    /// - [`Error::WorkerLost`] if a pool job died without reporting
    pub fn run_async<FC, FD>(&self, control: FC, candidate: FD) -> Result<T, RunError<E>>
    where
        FC: FnOnce() -> Result<T, E> + Send + 'static,
        FD: FnOnce() -> Result<U, E> + Send + 'static,
    {
        let pool = match &self.inner.pool {
            Some(pool) => pool.clone(),
            None => WorkerPool::shared()?,
        };
        let metrics = &self.inner.metrics;

        let (control_tx, control_rx) = channel::bounded(1);
        let control_job = {
            let timer = Arc::clone(&metrics.control_timer);
            move || {
                let _ = control_tx.send(Execution::run(CONTROL, &timer, control));
            }
        };

        let candidate_rx = if self.candidate_enabled() {
            let (candidate_tx, candidate_rx) = channel::bounded(1);
            let timer = Arc::clone(&metrics.candidate_timer);
            let candidate_job = move || {
                let _ = candidate_tx.send(observe(CANDIDATE, &timer, candidate));
            };

            if self.inner.order.control_first() {
                pool.spawn(control_job);
                pool.spawn(candidate_job);
            } else {
                pool.spawn(candidate_job);
                pool.spawn(control_job);
            }
            Some(candidate_rx)
        } else {
            pool.spawn(control_job);
            None
        };

        let execution = control_rx
            .recv()
            .map_err(|_| Error::WorkerLost(CONTROL.to_string()))?;
        let (value, control) = execution.into_raising_cloned().map_err(RunError::Control)?;

        let Some(candidate_rx) = candidate_rx else {
            return Ok(value);
        };

        let experiment = self.clone();
        let (done_tx, done_rx) = channel::bounded(1);
        pool.spawn(move || {
            let concluded = candidate_rx
                .recv()
                .map_err(|_| Error::WorkerLost(CANDIDATE.to_string()))
                .and_then(|candidate| experiment.conclude(control, candidate).map(drop));

            if let Err(err) = &concluded {
                if !experiment.raise_on_mismatch() {
                    warn!(
                        experiment = %experiment.name(),
                        error = %err,
                        "background comparison failed"
                    );
                }
            }
            let _ = done_tx.send(concluded);
        });

        if self.inner.raise_on_mismatch {
            let concluded = done_rx
                .recv()
                .map_err(|_| Error::WorkerLost("comparison".to_string()))?;
            concluded?;
        }

        Ok(value)
    }
}

/// Hand back the control's value, error, or panic.
fn control_value<T, E>(control: Observation<T, E>) -> Result<T, RunError<E>> {
    match control.into_outcome() {
        Outcome::Value(value) => Ok(value),
        Outcome::Failed(err) => Err(RunError::Control(err)),
        Outcome::Panicked(payload) => panic::resume_unwind(Box::new(payload)),
    }
}

impl<T, U, E> Clone for Experiment<T, U, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, U, E> fmt::Debug for Experiment<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.inner.name)
            .field("raise_on_mismatch", &self.inner.raise_on_mismatch)
            .field("async_mode", &self.inner.async_mode)
            .field("order", &self.inner.order)
            .field("context", &self.inner.context)
            .finish_non_exhaustive()
    }
}
