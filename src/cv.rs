//! Cross-validation orchestrator
//!
//! Drives one tracked run over all folds of a splitter:
//!
//! ```text
//! open session → log training context
//!   → per fold: take rows → fresh pipeline → fit → predict_proba
//!               → Top-K → MAP@K → log "map@k_fold" at step = fold
//!   → log "map@k_mean" / "map@k_std" → close session
//! ```
//!
//! Every fold gets a pipeline straight from the factory, so no fitted state
//! is shared between folds or between runs. The session is closed on every
//! exit path; a fold failure is returned unchanged and partial scores are
//! dropped.

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::experiment::{ExperimentSession, ExperimentTracker, Metrics, Params};
use crate::logging::LogContext;
use crate::metric::{map_metric_key, mean_average_precision_at_k};
use crate::pipeline::Pipeline;
use crate::splitter::{Fold, FoldSplitter};
use crate::storage::take_rows;
use crate::topk::top_k_labels;
use crate::{Error, Result};

/// Names and parameters of the tracked run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Experiment the run is filed under
    pub experiment_name: String,
    /// Run name
    pub run_name: String,
    /// Model name logged as training context
    pub model_name: String,
    /// Parameters logged as training context
    pub params: Params,
}

impl RunContext {
    /// Context with no extra parameters.
    #[must_use]
    pub fn new(
        experiment_name: impl Into<String>,
        run_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            run_name: run_name.into(),
            model_name: model_name.into(),
            params: Params::new(),
        }
    }

    /// Attach training parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Per-fold scores in fold order and their mean.
///
/// The mean is always derived from the scores; a decoded `mean_score` is
/// ignored and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCvResult")]
pub struct CvResult {
    fold_scores: Vec<f64>,
    mean_score: f64,
}

#[derive(Deserialize)]
struct RawCvResult {
    fold_scores: Vec<f64>,
}

impl From<RawCvResult> for CvResult {
    fn from(raw: RawCvResult) -> Self {
        Self::new(raw.fold_scores)
    }
}

impl CvResult {
    /// Aggregate fold scores; zero folds give a mean of 0.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(fold_scores: Vec<f64>) -> Self {
        let mean_score = if fold_scores.is_empty() {
            0.0
        } else {
            fold_scores.iter().sum::<f64>() / fold_scores.len() as f64
        };
        Self {
            fold_scores,
            mean_score,
        }
    }

    /// Scores in fold order.
    #[must_use]
    pub fn fold_scores(&self) -> &[f64] {
        &self.fold_scores
    }

    /// Arithmetic mean of the fold scores.
    #[must_use]
    pub const fn mean_score(&self) -> f64 {
        self.mean_score
    }

    /// Number of folds.
    #[must_use]
    pub fn num_folds(&self) -> usize {
        self.fold_scores.len()
    }

    /// Population standard deviation of the fold scores.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn std_dev(&self) -> f64 {
        if self.fold_scores.is_empty() {
            return 0.0;
        }
        let var = self
            .fold_scores
            .iter()
            .map(|s| (s - self.mean_score).powi(2))
            .sum::<f64>()
            / self.fold_scores.len() as f64;
        var.sqrt()
    }
}

/// Tracked K-fold cross-validation.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_rank::cv::{CrossValidator, RunContext};
/// use trueno_rank::experiment::StoreTracker;
/// use trueno_rank::pipeline::{BoxedPipeline, ModelKind};
/// use trueno_rank::splitter::StratifiedKFold;
/// use trueno_rank::storage::Dataset;
///
/// # fn main() -> trueno_rank::Result<()> {
/// let data = Dataset::load_csv("train.csv", "Fertilizer Name")?;
/// let cv = CrossValidator::new(StratifiedKFold::new(5), || {
///     BoxedPipeline::for_model(ModelKind::NearestCentroid)
/// })
/// .top_k(3);
///
/// let mut tracker = StoreTracker::new();
/// let ctx = RunContext::new("fertilizer", "cv-baseline", "nearest_centroid");
/// let result = cv.run(&mut tracker, data.features(), data.labels(), &ctx)?;
/// println!("MAP@3 = {:.4}", result.mean_score());
/// # Ok(())
/// # }
/// ```
pub struct CrossValidator<S, F> {
    splitter: S,
    factory: F,
    k: usize,
    parallel: bool,
    log: Option<LogContext>,
}

impl<S: FoldSplitter, F> CrossValidator<S, F> {
    /// Validate pipelines from `factory` on the folds of `splitter`, K = 3.
    pub const fn new(splitter: S, factory: F) -> Self {
        Self {
            splitter,
            factory,
            k: 3,
            parallel: false,
            log: None,
        }
    }

    /// Ranking cutoff.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Fit folds on the rayon pool. Without the `rayon` feature folds run
    /// sequentially regardless.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Scope every run to `ctx` instead of the ambient dispatcher.
    #[must_use]
    pub fn with_log_context(mut self, ctx: LogContext) -> Self {
        self.log = Some(ctx);
        self
    }

    /// Run all folds inside one tracked run.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `k == 0`, `LengthMismatch` if `labels` and
    ///   `features` are misaligned, or the splitter's error; all raised before
    ///   the run is opened
    /// - the first pipeline, ranking or tracker failure, after the run is
    ///   ended as failed
    pub fn run<T, P>(
        &self,
        tracker: &mut T,
        features: &RecordBatch,
        labels: &[String],
        ctx: &RunContext,
    ) -> Result<CvResult>
    where
        T: ExperimentTracker + ?Sized,
        F: Fn() -> P + Sync,
        P: Pipeline,
    {
        match &self.log {
            Some(log) => log.in_scope(|| self.run_scoped(tracker, features, labels, ctx)),
            None => self.run_scoped(tracker, features, labels, ctx),
        }
    }

    fn run_scoped<T, P>(
        &self,
        tracker: &mut T,
        features: &RecordBatch,
        labels: &[String],
        ctx: &RunContext,
    ) -> Result<CvResult>
    where
        T: ExperimentTracker + ?Sized,
        F: Fn() -> P + Sync,
        P: Pipeline,
    {
        if self.k == 0 {
            return Err(Error::InvalidInput("k must be greater than 0".to_string()));
        }
        if features.num_rows() != labels.len() {
            return Err(Error::LengthMismatch {
                context: "cross-validation",
                expected: features.num_rows(),
                actual: labels.len(),
            });
        }
        let folds = self.splitter.split(features, labels)?;

        let _span = info_span!("cv", experiment = %ctx.experiment_name, run = %ctx.run_name)
            .entered();
        info!(folds = folds.len(), k = self.k, "cross-validation started");

        let key = map_metric_key(self.k);
        let result = ExperimentSession::run(
            tracker,
            &ctx.experiment_name,
            &ctx.run_name,
            |session| {
                session.log_training_context(&ctx.model_name, &ctx.params)?;

                let mut scores = Vec::with_capacity(folds.len());
                if self.parallel {
                    // Scores first, logging after: the run has a single writer.
                    let fold_scores = self.score_parallel(&folds, features, labels)?;
                    for (fold_no, score) in (1u64..).zip(fold_scores) {
                        session.log_evaluation(
                            &Metrics::from([(format!("{key}_fold"), score)]),
                            Some(fold_no),
                        )?;
                        scores.push(score);
                    }
                } else {
                    for (fold_no, fold) in (1u64..).zip(&folds) {
                        let score =
                            score_fold(&self.factory, self.k, fold_no, fold, features, labels)?;
                        session.log_evaluation(
                            &Metrics::from([(format!("{key}_fold"), score)]),
                            Some(fold_no),
                        )?;
                        scores.push(score);
                    }
                }

                let result = CvResult::new(scores);
                session.log_evaluation(
                    &Metrics::from([
                        (format!("{key}_mean"), result.mean_score()),
                        (format!("{key}_std"), result.std_dev()),
                    ]),
                    None,
                )?;
                Ok(result)
            },
        )?;

        info!(
            mean = result.mean_score(),
            std = result.std_dev(),
            "cross-validation finished"
        );
        Ok(result)
    }

    #[cfg(feature = "rayon")]
    fn score_parallel<P>(
        &self,
        folds: &[Fold],
        features: &RecordBatch,
        labels: &[String],
    ) -> Result<Vec<f64>>
    where
        F: Fn() -> P + Sync,
        P: Pipeline,
    {
        use rayon::prelude::*;

        let (factory, k) = (&self.factory, self.k);
        let dispatch = tracing::dispatcher::get_default(Clone::clone);
        let outcomes: Vec<Result<f64>> = folds
            .par_iter()
            .enumerate()
            .map(|(i, fold)| {
                tracing::dispatcher::with_default(&dispatch, || {
                    score_fold(factory, k, i as u64 + 1, fold, features, labels)
                })
            })
            .collect();

        // Lowest failing fold wins.
        outcomes.into_iter().collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn score_parallel<P>(
        &self,
        folds: &[Fold],
        features: &RecordBatch,
        labels: &[String],
    ) -> Result<Vec<f64>>
    where
        F: Fn() -> P,
        P: Pipeline,
    {
        tracing::warn!("rayon feature disabled, scoring folds sequentially");
        (1u64..)
            .zip(folds)
            .map(|(fold_no, fold)| {
                score_fold(&self.factory, self.k, fold_no, fold, features, labels)
            })
            .collect()
    }
}

/// Fit a fresh pipeline on the fold's training rows and score its
/// validation rows.
fn score_fold<F, P>(
    factory: &F,
    k: usize,
    fold_no: u64,
    fold: &Fold,
    features: &RecordBatch,
    labels: &[String],
) -> Result<f64>
where
    F: Fn() -> P,
    P: Pipeline,
{
    let train_x = take_rows(features, &fold.train)?;
    let train_y = select(labels, &fold.train);
    let valid_x = take_rows(features, &fold.validation)?;
    let valid_y = select(labels, &fold.validation);

    let mut pipeline = factory();
    pipeline.fit(&train_x, &train_y)?;
    let probabilities = pipeline.predict_proba(&valid_x)?;
    let classes = pipeline.classes().ok_or_else(|| {
        Error::InvalidInput(format!(
            "pipeline '{}' exposes no class ordering after fit",
            pipeline.name()
        ))
    })?;

    let ranked = top_k_labels(&probabilities, classes, k)?;
    let score = mean_average_precision_at_k(&valid_y, &ranked, k)?;

    debug!(
        fold = fold_no,
        train = fold.train.len(),
        validation = fold.validation.len(),
        score,
        "fold scored"
    );
    Ok(score)
}

fn select(labels: &[String], indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&i| labels[i].clone()).collect()
}
