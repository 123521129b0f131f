//! Scoped experiment runs
//!
//! A session owns the tracked run for exactly the duration of a closure:
//! it is opened before the closure runs and ended on every exit path. The
//! guard also ends the run from `Drop`, so a panic inside the scope still
//! leaves the run closed (as `Failed`).

use std::path::Path;

use tracing::{info, warn};

use super::tracker::{ExperimentTracker, Metrics, Params};
use super::RunStatus;
use crate::Result;

/// Exclusive handle on a running experiment run.
///
/// Only obtainable through [`ExperimentSession::run`].
pub struct ExperimentSession<'t, T: ExperimentTracker + ?Sized> {
    tracker: &'t mut T,
    experiment_id: String,
    run_name: String,
    closed: bool,
}

impl<'t, T: ExperimentTracker + ?Sized> ExperimentSession<'t, T> {
    /// Run `body` inside a tracked run of `experiment_name`.
    ///
    /// The run is ended with `Success` when `body` returns `Ok`, `Failed`
    /// otherwise. An error from `body` takes precedence over an error from
    /// ending the run.
    ///
    /// # Errors
    ///
    /// Returns the first error from opening the run, from `body`, or from
    /// ending the run
    ///
    /// # Example
    ///
    /// ```rust
    /// use trueno_rank::experiment::{ExperimentSession, Metrics, StoreTracker};
    ///
    /// # fn main() -> trueno_rank::Result<()> {
    /// let mut tracker = StoreTracker::new();
    /// ExperimentSession::run(&mut tracker, "fertilizer", "baseline", |session| {
    ///     session.log_evaluation(&Metrics::from([("map@3".to_string(), 0.31)]), None)
    /// })?;
    /// assert_eq!(tracker.store().run_count(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run<R, F>(tracker: &'t mut T, experiment_name: &str, run_name: &str, body: F) -> Result<R>
    where
        F: FnOnce(&mut ExperimentSession<'t, T>) -> Result<R>,
    {
        let mut session = Self::open(tracker, experiment_name, run_name)?;
        let outcome = body(&mut session);
        let status = if outcome.is_ok() {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        let closed = session.close(status);

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "failed to end run after scope error");
                Err(err)
            }
        }
    }

    fn open(tracker: &'t mut T, experiment_name: &str, run_name: &str) -> Result<Self> {
        if tracker.has_active_run() {
            warn!(run = run_name, "ending dangling run before opening a new one");
            tracker.end_run(RunStatus::Cancelled)?;
        }

        let experiment_id = tracker.setup_experiment(experiment_name)?;
        tracker.start_run(Some(run_name))?;
        info!(experiment = experiment_name, run = run_name, "experiment run started");

        Ok(Self {
            tracker,
            experiment_id,
            run_name: run_name.to_string(),
            closed: false,
        })
    }

    fn close(mut self, status: RunStatus) -> Result<()> {
        self.closed = true;
        info!(run = %self.run_name, ?status, "experiment run ended");
        self.tracker.end_run(status)
    }

    /// ID of the experiment this run belongs to.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Log the model name and its parameters.
    ///
    /// The model name is logged under the `model` key.
    ///
    /// # Errors
    ///
    /// Propagates tracker errors
    pub fn log_training_context(&mut self, model_name: &str, params: &Params) -> Result<()> {
        let mut context = Params::new();
        context.insert("model".to_string(), serde_json::Value::from(model_name));
        context.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.tracker.log_params(&context)
    }

    /// Log evaluation metrics, optionally at a step.
    ///
    /// # Errors
    ///
    /// Propagates tracker errors
    pub fn log_evaluation(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<()> {
        info!(run = %self.run_name, ?step, ?metrics, "evaluation metrics");
        self.tracker.log_metrics(metrics, step)
    }

    /// Record a file produced by this run.
    ///
    /// # Errors
    ///
    /// Propagates tracker errors
    pub fn log_artifact(&mut self, path: &Path) -> Result<()> {
        self.tracker.log_artifact(path)
    }
}

impl<T: ExperimentTracker + ?Sized> Drop for ExperimentSession<'_, T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.tracker.end_run(RunStatus::Failed) {
            warn!(error = %err, "failed to end run while unwinding");
        }
    }
}
