//! # Scientist: Verified Refactoring by Side-by-Side Execution
//!
//! **Version**: 0.1.0
//!
//! Scientist runs a trusted *control* code path and an untrusted *candidate*
//! path for the same request, hands the control's outcome back to the caller,
//! and records whether the candidate agreed. Rewrites can be shipped dark and
//! promoted once production traffic shows they behave identically.
//!
//! ## Guarantees
//!
//! - **Control is authoritative**: the caller always gets the control's value,
//!   error or panic, unchanged
//! - **Candidate is contained**: candidate errors and panics become recorded
//!   observations, never caller-visible failures (unless raising on mismatch)
//! - **Every run is measured**: per-leg timers plus mismatch, failure and
//!   total counters under `scientist.<experiment>.*`
//! - **No ordering bias**: legs run in random order by default
//!
//! ## Example Usage
//!
//! ```rust
//! use scientist::{Experiment, InMemoryMetricsProvider};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(InMemoryMetricsProvider::new());
//! let experiment: Experiment<String> = Experiment::builder()
//!     .name("greeting")
//!     .metrics(metrics.clone())
//!     .build()?;
//!
//! let greeting = experiment.run(
//!     || Ok("hello, world".to_string()),
//!     || Ok(format!("{}, {}", "hello", "world")),
//! )?;
//!
//! assert_eq!(greeting, "hello, world");
//! assert_eq!(metrics.counter_value("scientist.greeting.total"), 1);
//! assert_eq!(metrics.counter_value("scientist.greeting.mismatch"), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod comparator;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod observation;
pub mod publisher;
pub mod result;

pub use comparator::Comparator;
pub use error::{Error, MismatchError, MismatchKind, Result, RunError};
pub use experiment::{
    Experiment, ExperimentBuilder, ExperimentSettings, RunOrder, WorkerPool, DEFAULT_POOL_SIZE,
};
#[cfg(feature = "metrics-facade")]
pub use crate::metrics::MetricsFacadeProvider;
pub use crate::metrics::{
    Counter, InMemoryMetricsProvider, MetricsProvider, NoopMetricsProvider, Timer, TimerContext,
};
pub use observation::{Observation, Outcome, OutcomeKind};
pub use publisher::Publisher;
pub use result::{Context, ExperimentResult, ResultSummary};
