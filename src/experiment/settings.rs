//! Serializable experiment configuration
//!
//! Lets an experiment be switched off, renamed or made strict from a config
//! file without touching code. Every field is optional: keys missing from the
//! document leave the builder's current value alone.

use super::RunOrder;
use crate::error::Result;
use crate::result::Context;
use serde::{Deserialize, Serialize};

/// Externally loadable settings, applied with
/// [`ExperimentBuilder::settings`](super::ExperimentBuilder::settings).
///
/// ```rust
/// use scientist::ExperimentSettings;
///
/// let settings = ExperimentSettings::from_json(r#"{"name": "pricing", "enabled": false}"#)?;
/// assert_eq!(settings.name.as_deref(), Some("pricing"));
/// assert_eq!(settings.enabled, Some(false));
/// assert_eq!(settings.pool_size, None);
/// # Ok::<(), scientist::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    /// Experiment name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raise mismatches to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raise_on_mismatch: Option<bool>,
    /// Run legs on a worker pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_mode: Option<bool>,
    /// Worker count for the pool created at build time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
    /// Global switch for the candidate; only `false` has an effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Leg ordering policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<RunOrder>,
    /// Context merged into every result
    #[serde(skip_serializing_if = "Context::is_empty")]
    pub context: Context,
}

impl ExperimentSettings {
    /// Parse settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`](crate::Error::Settings) on malformed JSON
    /// or mistyped fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON, omitting unset fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`](crate::Error::Settings) if serialization
    /// fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
