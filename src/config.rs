//! Cross-validation configuration
//!
//! Loaded from JSON; every key is optional and falls back to its default.
//!
//! ```json
//! {
//!   "n_splits": 5,
//!   "seed": 42,
//!   "top_k": 3,
//!   "model": "nearest_centroid",
//!   "expected_features": ["Temparature", "Moisture", "Soil Type"],
//!   "log": { "filter": "trueno_rank=debug,info" }
//! }
//! ```

use std::path::Path;

use arrow::datatypes::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::experiment::Params;
use crate::logging::{LogConfig, LogContext};
use crate::pipeline::ModelKind;
use crate::splitter::StratifiedKFold;
use crate::storage::validate_columns;
use crate::{Error, Result};

/// Settings for one tracked cross-validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    /// Number of folds
    pub n_splits: usize,
    /// Splitter seed
    pub seed: u64,
    /// Shuffle inside each class before dealing rows to folds
    pub shuffle: bool,
    /// Ranking cutoff K
    pub top_k: usize,
    /// Tracked experiment name
    pub experiment_name: String,
    /// Tracked run name
    pub run_name: String,
    /// Label column in datasets
    pub target_column: String,
    /// Id column carried into submissions
    pub id_column: String,
    /// Feature columns every train and test table must carry; empty skips
    /// the check
    pub expected_features: Vec<String>,
    /// Model family
    pub model: ModelKind,
    /// Fit folds on the rayon pool
    pub parallel_folds: bool,
    /// Logging subscriber settings
    pub log: LogConfig,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            seed: 42,
            shuffle: true,
            top_k: 3,
            experiment_name: "topk-cv".to_string(),
            run_name: "cv".to_string(),
            target_column: "label".to_string(),
            id_column: "id".to_string(),
            expected_features: Vec::new(),
            model: ModelKind::default(),
            parallel_folds: false,
            log: LogConfig::default(),
        }
    }
}

impl CvConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Json` on malformed input or `Config` if validation fails
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, otherwise as
    /// [`CvConfig::from_json_str`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first offending key
    pub fn validate(&self) -> Result<()> {
        if self.n_splits < 2 {
            return Err(Error::Config(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".to_string()));
        }
        for (key, value) in [
            ("experiment_name", &self.experiment_name),
            ("run_name", &self.run_name),
            ("target_column", &self.target_column),
            ("id_column", &self.id_column),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{key} must not be empty")));
            }
        }
        if let Some(dup) = self
            .expected_features
            .iter()
            .find(|f| **f == self.target_column || **f == self.id_column)
        {
            return Err(Error::Config(format!(
                "expected_features must not list the target or id column '{dup}'"
            )));
        }
        Ok(())
    }

    /// Check a raw training table (`with_target`) or test table against
    /// `expected_features`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the missing columns
    pub fn check_columns(&self, schema: &Schema, with_target: bool) -> Result<()> {
        let target = with_target.then_some(self.target_column.as_str());
        validate_columns(schema, &self.expected_features, target)
    }

    /// Splitter configured by `n_splits`, `seed` and `shuffle`.
    #[must_use]
    pub const fn stratified_kfold(&self) -> StratifiedKFold {
        let splitter = StratifiedKFold::new(self.n_splits).with_seed(self.seed);
        if self.shuffle {
            splitter
        } else {
            splitter.without_shuffle()
        }
    }

    /// Logging context from the `log` section.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the filter does not parse
    pub fn log_context(&self) -> Result<LogContext> {
        LogContext::new(&self.log)
    }

    /// Training context logged to the tracked run.
    #[must_use]
    pub fn params(&self) -> Params {
        Params::from([
            ("n_splits".to_string(), Value::from(self.n_splits)),
            ("seed".to_string(), Value::from(self.seed)),
            ("shuffle".to_string(), Value::from(self.shuffle)),
            ("top_k".to_string(), Value::from(self.top_k)),
            ("target_column".to_string(), Value::from(self.target_column.as_str())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CvConfig::default();
        assert_eq!(config.n_splits, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.model, ModelKind::Prior);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            CvConfig::from_json_str(r#"{"top_k": 5, "model": "nearest_centroid"}"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.model, ModelKind::NearestCentroid);
        assert_eq!(config.experiment_name, "topk-cv");
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_rejects_zero_k() {
        let err = CvConfig::from_json_str(r#"{"top_k": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_single_split() {
        let err = CvConfig::from_json_str(r#"{"n_splits": 1}"#).unwrap_err();
        assert!(err.to_string().contains("n_splits"));
    }

    #[test]
    fn test_rejects_empty_names() {
        let err = CvConfig::from_json_str(r#"{"run_name": " "}"#).unwrap_err();
        assert!(err.to_string().contains("run_name"));
    }

    #[test]
    fn test_malformed_json() {
        let err = CvConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_params_contents() {
        let params = CvConfig::default().params();
        assert_eq!(params["n_splits"], Value::from(5));
        assert_eq!(params["top_k"], Value::from(3));
        assert_eq!(params["shuffle"], Value::from(true));
    }

    #[test]
    fn test_expected_features_from_json() {
        let config = CvConfig::from_json_str(
            r#"{"target_column": "Fertilizer Name", "expected_features": ["Moisture", "Soil Type"]}"#,
        )
        .unwrap();
        assert_eq!(config.expected_features, vec!["Moisture", "Soil Type"]);
        assert!(CvConfig::default().expected_features.is_empty());
    }

    #[test]
    fn test_rejects_target_listed_as_feature() {
        let err = CvConfig::from_json_str(r#"{"expected_features": ["Moisture", "label"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("'label'"));
    }

    #[test]
    fn test_check_columns_train_and_test() {
        use arrow::datatypes::{DataType, Field};

        let config = CvConfig {
            expected_features: vec!["Moisture".to_string(), "Soil Type".to_string()],
            ..CvConfig::default()
        };
        let test_schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("Moisture", DataType::Float64, false),
        ]);
        let err = config.check_columns(&test_schema, false).unwrap_err();
        assert!(err.to_string().contains("Missing feature columns: Soil Type"));

        let train_schema = Schema::new(vec![
            Field::new("Moisture", DataType::Float64, false),
            Field::new("Soil Type", DataType::Utf8, false),
        ]);
        assert!(config.check_columns(&train_schema, false).is_ok());
        let err = config.check_columns(&train_schema, true).unwrap_err();
        assert!(err.to_string().contains("Target column 'label'"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = CvConfig::from_json_file("/nonexistent/cv.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
