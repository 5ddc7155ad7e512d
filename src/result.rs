//! Experiment results
//!
//! An [`ExperimentResult`] bundles both observations with the verdict. It is
//! built once per run, compared eagerly at construction, and never mutated
//! afterwards; publishers only ever see it by shared reference.

use crate::error::{Error, MismatchError, Result};
use crate::experiment::Experiment;
use crate::observation::{Observation, OutcomeKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Free-form context attached to every result of an experiment.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Outcome of one experiment run.
///
/// `matched` is `None` exactly when no candidate observation is present.
pub struct ExperimentResult<T, U = T, E = anyhow::Error> {
    experiment: String,
    control: Observation<T, E>,
    candidate: Option<Observation<U, E>>,
    matched: Option<bool>,
    mismatch: Option<MismatchError>,
    context: Arc<Context>,
    completed_at: DateTime<Utc>,
}

impl<T, U, E> ExperimentResult<T, U, E>
where
    T: fmt::Debug,
    U: fmt::Debug,
    E: fmt::Debug,
{
    /// Build a result, comparing the observations if a candidate is present.
    ///
    /// Comparison goes through [`Experiment::compare`], so counters move
    /// exactly as they do during a run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mismatch`] when the observations disagree and the
    /// experiment raises on mismatch. Otherwise a mismatch is kept on the
    /// result and `matched` is `Some(false)`.
    pub fn new(
        experiment: &Experiment<T, U, E>,
        control: Observation<T, E>,
        candidate: Option<Observation<U, E>>,
    ) -> Result<Self> {
        let mut matched = None;
        let mut mismatch = None;

        if let Some(candidate) = &candidate {
            match experiment.compare(&control, candidate) {
                Ok(()) => matched = Some(true),
                Err(err) if experiment.raise_on_mismatch() => return Err(Error::Mismatch(err)),
                Err(err) => {
                    tracing::debug!(
                        experiment = experiment.name(),
                        kind = err.kind().as_str(),
                        "mismatch recorded"
                    );
                    matched = Some(false);
                    mismatch = Some(err);
                }
            }
        }

        Ok(Self {
            experiment: experiment.name().to_string(),
            control,
            candidate,
            matched,
            mismatch,
            context: experiment.shared_context(),
            completed_at: Utc::now(),
        })
    }
}

impl<T, U, E> ExperimentResult<T, U, E> {
    /// Name of the experiment that produced this result.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Control observation.
    #[must_use]
    pub const fn control(&self) -> &Observation<T, E> {
        &self.control
    }

    /// Candidate observation, absent when the candidate was gated off.
    #[must_use]
    pub const fn candidate(&self) -> Option<&Observation<U, E>> {
        self.candidate.as_ref()
    }

    /// Verdict, absent when the candidate was not run.
    #[must_use]
    pub const fn matched(&self) -> Option<bool> {
        self.matched
    }

    /// The mismatch that was recorded instead of raised.
    #[must_use]
    pub const fn mismatch(&self) -> Option<&MismatchError> {
        self.mismatch.as_ref()
    }

    /// Experiment context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// When the result was built.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Serializable digest for logs and telemetry.
    #[must_use]
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            experiment: self.experiment.clone(),
            matched: self.matched,
            control_nanos: self.control.duration_nanos(),
            candidate_nanos: self.candidate.as_ref().map(Observation::duration_nanos),
            candidate_outcome: self
                .candidate
                .as_ref()
                .map(|candidate| candidate.outcome().kind()),
            mismatch: self.mismatch.as_ref().map(|m| m.message().to_string()),
            context: (*self.context).clone(),
            completed_at: self.completed_at,
        }
    }

    /// Consume into the control observation.
    #[must_use]
    pub fn into_control(self) -> Observation<T, E> {
        self.control
    }
}

impl<T: fmt::Debug, U: fmt::Debug, E: fmt::Debug> fmt::Debug for ExperimentResult<T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentResult")
            .field("experiment", &self.experiment)
            .field("control", &self.control)
            .field("candidate", &self.candidate)
            .field("matched", &self.matched)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Value-free digest of an [`ExperimentResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    /// Experiment name
    pub experiment: String,
    /// Verdict, absent when the candidate was not run
    pub matched: Option<bool>,
    /// Control duration in nanoseconds
    pub control_nanos: u64,
    /// Candidate duration in nanoseconds
    pub candidate_nanos: Option<u64>,
    /// How the candidate finished
    pub candidate_outcome: Option<OutcomeKind>,
    /// Mismatch description
    pub mismatch: Option<String>,
    /// Experiment context
    pub context: Context,
    /// Build timestamp
    pub completed_at: DateTime<Utc>,
}
