//! Error types for Trueno-Rank
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Rank error types
#[derive(Error, Debug)]
pub enum Error {
    /// Shape, column-count or parameter violation detected before computing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two sequences that must be aligned have different lengths
    #[error("Length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Operation that detected the mismatch
        context: &'static str,
        /// Length of the reference sequence
        expected: usize,
        /// Length of the offending sequence
        actual: usize,
    },

    /// Ensemble blending called without any member predictions
    #[error("Ensemble requires at least one probability matrix")]
    EmptyEnsemble,

    /// Failure raised by a feature transform or predictor, propagated verbatim
    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),

    /// Experiment tracker rejected an operation
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Dataset or submission storage error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration missing or invalid
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
