//! Experiment tracker port and its in-memory implementation

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use super::{
    ArtifactRecord, ExperimentRecord, ExperimentStore, MetricRecord, ParamRecord, RunRecord,
    RunStatus,
};
use crate::{Error, Result};

/// Parameters logged as training context.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Named metric values logged in one call.
pub type Metrics = BTreeMap<String, f64>;

/// Sink for experiment tracking.
///
/// Lifecycle: `setup_experiment → start_run → log_* → end_run`. Implementations
/// decide storage and transport; callers only rely on this ordering.
pub trait ExperimentTracker {
    /// Create or reuse the experiment named `name` and make it current.
    ///
    /// Returns the experiment ID.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot create or select the experiment
    fn setup_experiment(&mut self, name: &str) -> Result<String>;

    /// Start a run under the current experiment.
    ///
    /// # Errors
    ///
    /// Returns error if no experiment is selected or a run is already active
    fn start_run(&mut self, run_name: Option<&str>) -> Result<()>;

    /// Log parameters against the active run.
    ///
    /// # Errors
    ///
    /// Returns error if no run is active
    fn log_params(&mut self, params: &Params) -> Result<()>;

    /// Log metrics against the active run; `step` orders repeated keys.
    ///
    /// # Errors
    ///
    /// Returns error if no run is active
    fn log_metrics(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<()>;

    /// Record a file produced by the active run.
    ///
    /// # Errors
    ///
    /// Returns error if no run is active or the file cannot be inspected
    fn log_artifact(&mut self, path: &Path) -> Result<()>;

    /// End the active run with `status`. No-op when no run is active.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails to persist the final status
    fn end_run(&mut self, status: RunStatus) -> Result<()>;

    /// True while a run is started and not yet ended.
    fn has_active_run(&self) -> bool;
}

/// Tracker that writes into an [`ExperimentStore`].
#[derive(Debug, Default)]
pub struct StoreTracker {
    store: ExperimentStore,
    current_experiment: Option<String>,
    active_run: Option<String>,
    next_experiment: u64,
    next_run: u64,
}

impl StoreTracker {
    /// Create a tracker over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that appends to an existing store.
    ///
    /// Runs the store still marks `Running` were left dangling by an earlier
    /// process; they are ended as `Cancelled`.
    #[must_use]
    pub fn with_store(mut store: ExperimentStore) -> Self {
        for run_id in store.running_run_ids() {
            if let Some(run) = store.get_run_mut(&run_id) {
                warn!(run = %run_id, "cancelling run left running in loaded store");
                run.complete(RunStatus::Cancelled);
            }
        }
        let next_experiment = store.experiment_count() as u64;
        let next_run = store.run_count() as u64;
        Self {
            store,
            next_experiment,
            next_run,
            ..Self::default()
        }
    }

    /// Borrow the underlying store.
    #[must_use]
    pub const fn store(&self) -> &ExperimentStore {
        &self.store
    }

    /// Take the underlying store.
    #[must_use]
    pub fn into_store(self) -> ExperimentStore {
        self.store
    }

    /// ID of the run currently receiving logs.
    #[must_use]
    pub fn active_run_id(&self) -> Option<&str> {
        self.active_run.as_deref()
    }

    fn require_run(&self) -> Result<String> {
        self.active_run
            .clone()
            .ok_or_else(|| Error::Tracking("no active run".to_string()))
    }
}

impl ExperimentTracker for StoreTracker {
    fn setup_experiment(&mut self, name: &str) -> Result<String> {
        let id = if let Some(existing) = self.store.find_experiment_by_name(name) {
            debug!(experiment = name, "reusing existing experiment");
            existing.experiment_id().to_string()
        } else {
            self.next_experiment += 1;
            let id = format!("exp-{:04}", self.next_experiment);
            self.store.add_experiment(ExperimentRecord::new(id.clone(), name));
            debug!(experiment = name, id = %id, "created experiment");
            id
        };
        self.current_experiment = Some(id.clone());
        Ok(id)
    }

    fn start_run(&mut self, run_name: Option<&str>) -> Result<()> {
        let experiment_id = self
            .current_experiment
            .clone()
            .ok_or_else(|| Error::Tracking("start_run called before setup_experiment".into()))?;
        if let Some(active) = &self.active_run {
            return Err(Error::Tracking(format!("run {active} is still active")));
        }

        self.next_run += 1;
        let run_id = format!("run-{:04}", self.next_run);
        let mut run = RunRecord::new(run_id.clone(), experiment_id);
        if let Some(name) = run_name {
            run = run.with_name(name);
        }
        run.start();
        self.store.add_run(run);
        self.active_run = Some(run_id);
        Ok(())
    }

    fn log_params(&mut self, params: &Params) -> Result<()> {
        let run_id = self.require_run()?;
        for (key, value) in params {
            self.store
                .add_param(ParamRecord::new(run_id.clone(), key.clone(), value.clone()));
        }
        Ok(())
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<()> {
        let run_id = self.require_run()?;
        for (key, &value) in metrics {
            self.store.add_metric(MetricRecord::new(
                run_id.clone(),
                key.clone(),
                step.unwrap_or(0),
                value,
            ));
        }
        Ok(())
    }

    fn log_artifact(&mut self, path: &Path) -> Result<()> {
        let run_id = self.require_run()?;
        let size = std::fs::metadata(path)?.len();
        self.store
            .add_artifact(ArtifactRecord::new(run_id, path.display().to_string(), size));
        Ok(())
    }

    fn end_run(&mut self, status: RunStatus) -> Result<()> {
        let Some(run_id) = self.active_run.take() else {
            return Ok(());
        };
        let run = self
            .store
            .get_run_mut(&run_id)
            .ok_or_else(|| Error::Tracking(format!("active run {run_id} missing from store")))?;
        run.complete(status);
        Ok(())
    }

    fn has_active_run(&self) -> bool {
        self.active_run.is_some()
    }
}
