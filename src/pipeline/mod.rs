//! Trainable pipelines: feature transform + predictor
//!
//! A pipeline turns raw tabular rows (an Arrow `RecordBatch`) into class
//! probabilities. Cross-validation builds a fresh pipeline for every fold
//! through a factory, so fitted state never crosses folds.
//!
//! Failures inside transforms and predictors are opaque (`anyhow::Error`);
//! callers propagate them untouched.

mod model;
mod transform;

pub use model::{ModelKind, NearestCentroidPredictor, PriorPredictor};
pub use transform::ColumnTransformer;

use crate::labels::ClassLabels;
use crate::matrix::{FeatureMatrix, ProbabilityMatrix};
use arrow::record_batch::RecordBatch;

/// Learns a numeric encoding of raw rows.
pub trait FeatureTransform: Send {
    /// Learn encoding parameters from training rows only.
    ///
    /// # Errors
    ///
    /// Returns error if required columns are missing or unsupported
    fn fit(&mut self, features: &RecordBatch) -> anyhow::Result<()>;

    /// Encode rows with the learned parameters.
    ///
    /// # Errors
    ///
    /// Returns error if called before `fit` or columns are missing
    fn transform(&self, features: &RecordBatch) -> anyhow::Result<FeatureMatrix>;

    /// `fit` then `transform` on the same rows.
    ///
    /// # Errors
    ///
    /// Returns the first error of `fit` or `transform`
    fn fit_transform(&mut self, features: &RecordBatch) -> anyhow::Result<FeatureMatrix> {
        self.fit(features)?;
        self.transform(features)
    }
}

/// Multi-class probabilistic classifier.
pub trait Predictor: Send {
    /// Model family name, logged as training context.
    fn name(&self) -> &str;

    /// Train on encoded features and their labels.
    ///
    /// # Errors
    ///
    /// Returns error on empty or misaligned training data
    fn fit(&mut self, features: &FeatureMatrix, labels: &[String]) -> anyhow::Result<()>;

    /// One row per sample, one column per class in `classes()` order.
    ///
    /// # Errors
    ///
    /// Returns error if called before `fit` or the feature width changed
    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<ProbabilityMatrix>;

    /// Class ordering of `predict_proba` columns, known after `fit`.
    fn classes(&self) -> Option<&ClassLabels>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[String]) -> anyhow::Result<()> {
        (**self).fit(features, labels)
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<ProbabilityMatrix> {
        (**self).predict_proba(features)
    }

    fn classes(&self) -> Option<&ClassLabels> {
        (**self).classes()
    }
}

/// Raw rows in, class probabilities out.
pub trait Pipeline: Send {
    /// Name logged as the model of a tracked run.
    fn name(&self) -> String;

    /// Fit on raw training rows.
    ///
    /// # Errors
    ///
    /// Propagates transform and predictor failures
    fn fit(&mut self, features: &RecordBatch, labels: &[String]) -> anyhow::Result<()>;

    /// Probabilities for raw rows, columns in `classes()` order.
    ///
    /// # Errors
    ///
    /// Propagates transform and predictor failures
    fn predict_proba(&self, features: &RecordBatch) -> anyhow::Result<ProbabilityMatrix>;

    /// Class ordering of `predict_proba` columns, known after `fit`.
    fn classes(&self) -> Option<&ClassLabels>;
}

/// A feature transform feeding a predictor.
pub struct ModelPipeline<T, P> {
    transform: T,
    predictor: P,
}

/// Pipeline over a runtime-selected model family.
pub type BoxedPipeline = ModelPipeline<ColumnTransformer, Box<dyn Predictor>>;

impl<T: FeatureTransform, P: Predictor> ModelPipeline<T, P> {
    /// Compose `transform` and `predictor`.
    #[must_use]
    pub const fn new(transform: T, predictor: P) -> Self {
        Self {
            transform,
            predictor,
        }
    }

    /// Borrow the predictor.
    #[must_use]
    pub const fn predictor(&self) -> &P {
        &self.predictor
    }
}

impl BoxedPipeline {
    /// Auto-detecting column transformer feeding a `kind` predictor.
    #[must_use]
    pub fn for_model(kind: ModelKind) -> Self {
        Self::new(ColumnTransformer::auto(), kind.build())
    }
}

impl<T: FeatureTransform, P: Predictor> Pipeline for ModelPipeline<T, P> {
    fn name(&self) -> String {
        self.predictor.name().to_string()
    }

    fn fit(&mut self, features: &RecordBatch, labels: &[String]) -> anyhow::Result<()> {
        let encoded = self.transform.fit_transform(features)?;
        self.predictor.fit(&encoded, labels)
    }

    fn predict_proba(&self, features: &RecordBatch) -> anyhow::Result<ProbabilityMatrix> {
        let encoded = self.transform.transform(features)?;
        self.predictor.predict_proba(&encoded)
    }

    fn classes(&self) -> Option<&ClassLabels> {
        self.predictor.classes()
    }
}
