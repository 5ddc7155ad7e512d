//! Error types for Scientist
//!
//! Two layers: [`Error`] covers everything the engine itself can raise,
//! while [`RunError`] is what an experiment run hands back to the caller,
//! carrying the control leg's own error through untouched.

use serde::Serialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Scientist error types
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate disagreed with control and the experiment raises on mismatch
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    /// A caller-supplied publisher rejected the result
    #[error("Result publication failed: {0:#}")]
    Publish(anyhow::Error),

    /// A pool task went away without reporting its outcome
    #[error("Worker task lost before reporting: {0}")]
    WorkerLost(String),

    /// Worker pool could not be created
    #[error("Worker pool creation failed: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// Builder or settings were rejected
    #[error("Invalid experiment configuration: {0}")]
    InvalidConfig(String),

    /// Settings document could not be parsed
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Failure of an experiment run as seen by the caller.
///
/// `Control` is the control computation's own error, returned exactly as the
/// computation produced it. Everything else comes from the experiment.
#[derive(Error, Debug)]
pub enum RunError<E> {
    /// The control computation failed
    #[error("Control failed: {0}")]
    Control(E),

    /// The experiment raised (mismatch, publication failure, lost worker)
    #[error(transparent)]
    Experiment(#[from] Error),
}

impl<E> RunError<E> {
    /// Take the control computation's error, if that is what this is.
    #[must_use]
    pub fn into_control(self) -> Option<E> {
        match self {
            Self::Control(err) => Some(err),
            Self::Experiment(_) => None,
        }
    }

    /// The mismatch that was raised, if any.
    #[must_use]
    pub fn mismatch(&self) -> Option<&MismatchError> {
        match self {
            Self::Experiment(Error::Mismatch(mismatch)) => Some(mismatch),
            _ => None,
        }
    }

    /// Whether this is a raised mismatch.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        self.mismatch().is_some()
    }
}

/// Why a candidate did not match its control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Candidate returned an error
    CandidateFailed,
    /// Candidate panicked
    CandidatePanicked,
    /// Both produced values and the comparator rejected the pair
    ValueMismatch,
    /// Control holds no value to compare against
    ControlUnavailable,
}

impl MismatchKind {
    /// Stable name for logs and summaries
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CandidateFailed => "candidate_failed",
            Self::CandidatePanicked => "candidate_panicked",
            Self::ValueMismatch => "value_mismatch",
            Self::ControlUnavailable => "control_unavailable",
        }
    }
}

/// Mismatch condition produced by comparing control and candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Experiment '{experiment}' mismatch: {message}")]
pub struct MismatchError {
    experiment: String,
    kind: MismatchKind,
    message: String,
}

impl MismatchError {
    pub(crate) fn candidate_failed(
        experiment: &str,
        label: &str,
        error_type: &str,
        rendered: &str,
    ) -> Self {
        Self {
            experiment: experiment.to_string(),
            kind: MismatchKind::CandidateFailed,
            message: format!("{label} raised an exception: {error_type} {rendered}"),
        }
    }

    pub(crate) fn candidate_panicked(experiment: &str, label: &str, payload: &str) -> Self {
        Self {
            experiment: experiment.to_string(),
            kind: MismatchKind::CandidatePanicked,
            message: format!("{label} panicked: {payload}"),
        }
    }

    pub(crate) fn value_mismatch(
        experiment: &str,
        label: &str,
        control: &str,
        candidate: &str,
    ) -> Self {
        Self {
            experiment: experiment.to_string(),
            kind: MismatchKind::ValueMismatch,
            message: format!("{label} does not match control value ({control} != {candidate})"),
        }
    }

    pub(crate) fn control_unavailable(experiment: &str, label: &str) -> Self {
        Self {
            experiment: experiment.to_string(),
            kind: MismatchKind::ControlUnavailable,
            message: format!("{label} could not be compared: control produced no value"),
        }
    }

    /// Name of the experiment that raised this mismatch.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Mismatch category.
    #[must_use]
    pub const fn kind(&self) -> MismatchKind {
        self.kind
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
