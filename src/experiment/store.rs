//! Experiment Store - in-memory storage for experiment tracking data
//!
//! Snapshots to and from JSON so a finished CV session can be inspected or
//! compared later.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ArtifactRecord, ExperimentRecord, MetricRecord, ParamRecord, RunRecord, RunStatus};
use crate::Result;

/// In-memory store for experiment tracking data.
///
/// ## Design
///
/// Experiments and runs are keyed by ID in ordered maps so snapshots are
/// stable. Params, metrics and artifacts are append-only vectors filtered
/// per run at query time.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExperimentStore {
    experiments: BTreeMap<String, ExperimentRecord>,
    runs: BTreeMap<String, RunRecord>,
    params: Vec<ParamRecord>,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
}

impl ExperimentStore {
    /// Create a new empty experiment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
            && self.runs.is_empty()
            && self.params.is_empty()
            && self.metrics.is_empty()
            && self.artifacts.is_empty()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the number of metrics in the store.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Add an experiment to the store.
    pub fn add_experiment(&mut self, experiment: ExperimentRecord) {
        self.experiments
            .insert(experiment.experiment_id().to_string(), experiment);
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<&ExperimentRecord> {
        self.experiments.get(experiment_id)
    }

    /// Find an experiment by its name.
    #[must_use]
    pub fn find_experiment_by_name(&self, name: &str) -> Option<&ExperimentRecord> {
        self.experiments.values().find(|e| e.name() == name)
    }

    /// Add a run to the store.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Get a run by ID for status updates.
    pub fn get_run_mut(&mut self, run_id: &str) -> Option<&mut RunRecord> {
        self.runs.get_mut(run_id)
    }

    /// IDs of runs still marked `Running`, ordered by run ID.
    #[must_use]
    pub fn running_run_ids(&self) -> Vec<String> {
        self.runs
            .values()
            .filter(|run| run.status() == RunStatus::Running)
            .map(|run| run.run_id().to_string())
            .collect()
    }

    /// Get all runs for an experiment, ordered by run ID.
    #[must_use]
    pub fn get_runs_for_experiment(&self, experiment_id: &str) -> Vec<&RunRecord> {
        self.runs
            .values()
            .filter(|run| run.experiment_id() == experiment_id)
            .collect()
    }

    /// Add a param to the store.
    pub fn add_param(&mut self, param: ParamRecord) {
        self.params.push(param);
    }

    /// Get params logged for a run, in logging order.
    #[must_use]
    pub fn get_params_for_run(&self, run_id: &str) -> Vec<&ParamRecord> {
        self.params.iter().filter(|p| p.run_id() == run_id).collect()
    }

    /// Add a metric to the store.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Get metrics for a specific run and key, ordered by step.
    ///
    /// Metrics logged at the same step keep their logging order.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use trueno_rank::experiment::{ExperimentStore, MetricRecord};
    ///
    /// let mut store = ExperimentStore::new();
    /// for fold in (1..=5).rev() {
    ///     store.add_metric(MetricRecord::new("run-001", "map@3_fold", fold, 0.3));
    /// }
    ///
    /// let folds = store.get_metrics_for_run("run-001", "map@3_fold");
    /// assert_eq!(folds.len(), 5);
    /// assert_eq!(folds[0].step(), 1);
    /// ```
    #[must_use]
    pub fn get_metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();

        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    /// Add an artifact to the store.
    pub fn add_artifact(&mut self, artifact: ArtifactRecord) {
        self.artifacts.push(artifact);
    }

    /// Get artifacts logged for a run.
    #[must_use]
    pub fn get_artifacts_for_run(&self, run_id: &str) -> Vec<&ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|a| a.run_id() == run_id)
            .collect()
    }

    /// Write a JSON snapshot of the whole store.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or serialization fails
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load a JSON snapshot written by [`save_json`](Self::save_json).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid snapshot
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}
