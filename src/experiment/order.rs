//! Leg ordering

use serde::{Deserialize, Serialize};

/// Which leg runs (or is submitted) first.
///
/// `Random` flips a fair coin on every run so that neither leg
/// systematically benefits from warm caches left behind by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOrder {
    /// Independent 50/50 choice per run
    #[default]
    Random,
    /// Always control, then candidate
    ControlFirst,
    /// Always candidate, then control
    CandidateFirst,
}

impl RunOrder {
    /// Decide for one run whether control goes first.
    #[must_use]
    pub fn control_first(self) -> bool {
        match self {
            Self::Random => rand::random::<bool>(),
            Self::ControlFirst => true,
            Self::CandidateFirst => false,
        }
    }
}
