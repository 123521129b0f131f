//! # Trueno-Rank: Top-K Ranking and Tracked Cross-Validation
//!
//! **Version**: 0.1.0
//!
//! Trueno-Rank turns multi-class probability predictions into ranked Top-K
//! recommendations, scores them with MAP@K, blends ensembles with SIMD, and
//! runs reproducible stratified cross-validation inside tracked experiment
//! runs.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Muda elimination**: Bounded heaps rank only the K best columns
//! - **Poka-Yoke safety**: Shapes, `k` and label alignment are validated before
//!   any computation, and every tracked run is closed on every exit path
//! - **Genchi Genbutsu**: Each fold trains a fresh pipeline on its own rows only
//! - **Jidoka**: Deterministic tie-breaking makes every ranking reproducible
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_rank::labels::ClassLabels;
//! use trueno_rank::matrix::Matrix;
//! use trueno_rank::metric::mean_average_precision_at_k;
//! use trueno_rank::topk::top_k_labels;
//!
//! let labels = ClassLabels::new(["DAP", "Urea", "28-28"])?;
//! let proba = Matrix::from_rows(&[vec![0.2, 0.5, 0.3], vec![0.6, 0.1, 0.3]])?;
//!
//! let ranked = top_k_labels(&proba, &labels, 2)?;
//! assert_eq!(ranked[0].labels(), &["Urea", "28-28"]);
//!
//! let score = mean_average_precision_at_k(&["28-28", "DAP"], &ranked, 2)?;
//! assert!((score - 0.75).abs() < 1e-12);
//! # Ok::<(), trueno_rank::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod cv;
pub mod ensemble;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod labels;
pub mod logging;
pub mod matrix;
pub mod metric;
pub mod pipeline;
pub mod splitter;
pub mod storage;
pub mod topk;

pub use config::CvConfig;
pub use cv::{CrossValidator, CvResult, RunContext};
pub use ensemble::{average, ProbabilityEnsemble};
pub use error::{Error, Result};
pub use labels::{ClassLabels, Recommendation};
pub use matrix::{FeatureMatrix, Matrix, ProbabilityMatrix};
pub use topk::{top_k_labels, TopKResult};
