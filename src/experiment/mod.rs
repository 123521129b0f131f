//! Experiment Tracking
//!
//! Records parameters and metrics of cross-validation runs against named
//! experiments, and scopes each run so it is always ended.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< ParamRecord (N)
//!                              ├──< MetricRecord (N) [ordered by step]
//!                              └──< ArtifactRecord (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_rank::experiment::{ExperimentSession, Metrics, Params, StoreTracker};
//!
//! # fn main() -> trueno_rank::Result<()> {
//! let mut tracker = StoreTracker::new();
//!
//! ExperimentSession::run(&mut tracker, "fertilizer", "cv-baseline", |session| {
//!     session.log_training_context("prior", &Params::new())?;
//!     session.log_evaluation(&Metrics::from([("map@3_fold".into(), 0.42)]), Some(1))
//! })?;
//!
//! let store = tracker.into_store();
//! assert_eq!(store.metric_count(), 1);
//! # Ok(())
//! # }
//! ```

mod records;
mod session;
mod store;
mod tracker;

pub use records::{
    ArtifactRecord, ExperimentRecord, MetricRecord, ParamRecord, RunRecord, RunStatus,
};
pub use session::ExperimentSession;
pub use store::ExperimentStore;
pub use tracker::{ExperimentTracker, Metrics, Params, StoreTracker};
