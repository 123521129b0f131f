//! Use cases around a fitted pipeline: holdout scoring, final training and
//! Top-K recommendation

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::labels::Recommendation;
use crate::metric::{map_metric_key, mean_average_precision_at_k};
use crate::pipeline::Pipeline;
use crate::topk::top_k_labels;
use crate::{Error, Result};

/// Fit `pipeline` on the full training set.
///
/// # Errors
///
/// - `LengthMismatch` if `labels` and `features` are misaligned
/// - the pipeline's fit failure
pub fn train_final<P: Pipeline + ?Sized>(
    pipeline: &mut P,
    features: &RecordBatch,
    labels: &[String],
) -> Result<()> {
    if features.num_rows() != labels.len() {
        return Err(Error::LengthMismatch {
            context: "train_final",
            expected: features.num_rows(),
            actual: labels.len(),
        });
    }
    pipeline.fit(features, labels)?;
    info!(model = %pipeline.name(), rows = labels.len(), "final model trained");
    Ok(())
}

/// Top-K labels for every row, best first.
///
/// Works for anything implementing [`Pipeline`], including
/// [`ProbabilityEnsemble`](crate::ensemble::ProbabilityEnsemble).
///
/// # Errors
///
/// - `InvalidInput` if `k == 0` or the pipeline is not fitted
/// - the pipeline's prediction failure
pub fn recommend<P: Pipeline + ?Sized>(
    pipeline: &P,
    features: &RecordBatch,
    k: usize,
) -> Result<Vec<Recommendation>> {
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }
    let classes = pipeline.classes().ok_or_else(|| {
        Error::InvalidInput(format!("pipeline '{}' is not fitted", pipeline.name()))
    })?;
    let probabilities = pipeline.predict_proba(features)?;
    top_k_labels(&probabilities, classes, k)
}

/// Score a fitted pipeline on held-out rows.
///
/// Returns a single entry keyed `map@{k}`.
///
/// # Errors
///
/// - `LengthMismatch` if `labels` and `features` are misaligned
/// - any error of [`recommend`]
pub fn evaluate<P: Pipeline + ?Sized>(
    pipeline: &P,
    features: &RecordBatch,
    labels: &[String],
    k: usize,
) -> Result<BTreeMap<String, f64>> {
    if features.num_rows() != labels.len() {
        return Err(Error::LengthMismatch {
            context: "evaluate",
            expected: features.num_rows(),
            actual: labels.len(),
        });
    }
    let ranked = recommend(pipeline, features, k)?;
    let score = mean_average_precision_at_k(labels, &ranked, k)?;
    Ok(BTreeMap::from([(map_metric_key(k), score)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BoxedPipeline, ModelKind};
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("moisture", DataType::Float64, false),
            Field::new("soil", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![10.0, 12.0, 50.0, 52.0])),
                Arc::new(StringArray::from(vec!["sandy", "sandy", "clay", "clay"])),
            ],
        )
        .unwrap()
    }

    fn labels() -> Vec<String> {
        ["Urea", "Urea", "DAP", "DAP"].map(String::from).to_vec()
    }

    #[test]
    fn test_train_then_evaluate() {
        let mut pipeline = BoxedPipeline::for_model(ModelKind::NearestCentroid);
        train_final(&mut pipeline, &batch(), &labels()).unwrap();

        let metrics = evaluate(&pipeline, &batch(), &labels(), 3).unwrap();

        assert_eq!(metrics.len(), 1);
        assert!((metrics["map@3"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_recommend_caps_at_class_count() {
        let mut pipeline = BoxedPipeline::for_model(ModelKind::Prior);
        train_final(&mut pipeline, &batch(), &labels()).unwrap();

        let recs = recommend(&pipeline, &batch(), 3).unwrap();

        assert_eq!(recs.len(), 4);
        // Equal priors: tie broken by column order (DAP < Urea)
        assert_eq!(recs[0].labels(), &["DAP", "Urea"]);
    }

    #[test]
    fn test_recommend_unfitted_fails() {
        let pipeline = BoxedPipeline::for_model(ModelKind::Prior);
        let err = recommend(&pipeline, &batch(), 3).unwrap_err();
        assert!(err.to_string().contains("not fitted"));
    }

    #[test]
    fn test_train_final_length_mismatch() {
        let mut pipeline = BoxedPipeline::for_model(ModelKind::Prior);
        let err = train_final(&mut pipeline, &batch(), &labels()[..2]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { context: "train_final", .. }));
    }
}
