//! Model families
//!
//! Lightweight probabilistic classifiers usable as baselines and in tests.
//! Each family is its own type behind the [`Predictor`] trait; [`ModelKind`]
//! selects one at runtime from configuration.

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

use super::Predictor;
use crate::labels::ClassLabels;
use crate::matrix::{FeatureMatrix, Matrix, ProbabilityMatrix};
use crate::Error;

/// Selectable model family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Class-frequency prior, ignores features
    #[default]
    Prior,
    /// Softmax over distances to per-class centroids
    NearestCentroid,
}

impl ModelKind {
    /// Family name as logged to the tracker.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prior => "prior",
            Self::NearestCentroid => "nearest_centroid",
        }
    }

    /// Build an unfitted predictor of this family.
    #[must_use]
    pub fn build(self) -> Box<dyn Predictor> {
        match self {
            Self::Prior => Box::new(PriorPredictor::new()),
            Self::NearestCentroid => Box::new(NearestCentroidPredictor::new()),
        }
    }
}

fn check_training_data(features: &FeatureMatrix, labels: &[String]) -> anyhow::Result<()> {
    if features.num_rows() != labels.len() {
        return Err(Error::LengthMismatch {
            context: "predictor fit",
            expected: features.num_rows(),
            actual: labels.len(),
        }
        .into());
    }
    if labels.is_empty() {
        bail!("cannot fit on zero samples");
    }
    Ok(())
}

/// Predicts the training class frequencies for every sample.
#[derive(Debug, Clone, Default)]
pub struct PriorPredictor {
    classes: Option<ClassLabels>,
    prior: Vec<f32>,
}

impl PriorPredictor {
    /// Create an unfitted prior predictor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Predictor for PriorPredictor {
    fn name(&self) -> &str {
        ModelKind::Prior.name()
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, features: &FeatureMatrix, labels: &[String]) -> anyhow::Result<()> {
        check_training_data(features, labels)?;

        let classes = ClassLabels::from_observed(labels);
        let mut counts = vec![0usize; classes.len()];
        for label in labels {
            if let Some(idx) = classes.position(label) {
                counts[idx] += 1;
            }
        }
        let total = labels.len() as f32;
        self.prior = counts.iter().map(|&c| c as f32 / total).collect();
        self.classes = Some(classes);
        Ok(())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<ProbabilityMatrix> {
        if self.classes.is_none() {
            bail!("PriorPredictor used before fit");
        }
        let mut data = Vec::with_capacity(features.num_rows() * self.prior.len());
        for _ in 0..features.num_rows() {
            data.extend_from_slice(&self.prior);
        }
        Ok(Matrix::new(features.num_rows(), self.prior.len(), data)?)
    }

    fn classes(&self) -> Option<&ClassLabels> {
        self.classes.as_ref()
    }
}

/// Softmax over negative squared distances to class centroids.
#[derive(Debug, Clone, Default)]
pub struct NearestCentroidPredictor {
    classes: Option<ClassLabels>,
    centroids: Option<Matrix>,
}

impl NearestCentroidPredictor {
    /// Create an unfitted nearest-centroid predictor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Predictor for NearestCentroidPredictor {
    fn name(&self) -> &str {
        ModelKind::NearestCentroid.name()
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, features: &FeatureMatrix, labels: &[String]) -> anyhow::Result<()> {
        check_training_data(features, labels)?;

        let classes = ClassLabels::from_observed(labels);
        let width = features.num_cols();
        let mut sums = vec![0.0f64; classes.len() * width];
        let mut counts = vec![0usize; classes.len()];

        for (row, label) in features.rows().zip(labels) {
            let Some(c) = classes.position(label) else {
                continue;
            };
            counts[c] += 1;
            for (j, &v) in row.iter().enumerate() {
                sums[c * width + j] += f64::from(v);
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let data = sums
            .iter()
            .enumerate()
            .map(|(i, &s)| (s / counts[i / width.max(1)] as f64) as f32)
            .collect();

        self.centroids = Some(Matrix::new(classes.len(), width, data)?);
        self.classes = Some(classes);
        Ok(())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<ProbabilityMatrix> {
        let centroids = self
            .centroids
            .as_ref()
            .ok_or_else(|| anyhow!("NearestCentroidPredictor used before fit"))?;
        if features.num_cols() != centroids.num_cols() {
            bail!(
                "feature width {} differs from training width {}",
                features.num_cols(),
                centroids.num_cols()
            );
        }

        let n_classes = centroids.num_rows();
        let mut data = Vec::with_capacity(features.num_rows() * n_classes);
        for row in features.rows() {
            let logits: Vec<f32> = centroids
                .rows()
                .map(|centroid| {
                    -row.iter()
                        .zip(centroid)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f32>()
                })
                .collect();
            data.extend(softmax(&logits));
        }

        Ok(Matrix::new(features.num_rows(), n_classes, data)?)
    }

    fn classes(&self) -> Option<&ClassLabels> {
        self.classes.as_ref()
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
