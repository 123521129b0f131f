//! Cross-Validation: Tracked Stratified K-Fold with MAP@3
//!
//! Builds a synthetic fertilizer dataset, cross-validates two model families
//! inside tracked runs, trains an ensemble on the full data and writes a
//! Top-3 submission.
//!
//! Run with: cargo run --example cross_validation [config.json]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use trueno_rank::evaluate::{recommend, train_final};
use trueno_rank::experiment::{ExperimentSession, StoreTracker};
use trueno_rank::pipeline::{BoxedPipeline, ModelKind};
use trueno_rank::storage::{Dataset, Submission};
use trueno_rank::{CrossValidator, CvConfig, ProbabilityEnsemble, RunContext};

const FERTILIZERS: [&str; 4] = ["Urea", "DAP", "28-28", "14-35-14"];

/// Rows whose moisture and soil loosely determine the fertilizer
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn synthetic_table(rows: usize, first_id: i64) -> anyhow::Result<RecordBatch> {
    let soils = ["Clayey", "Sandy", "Loamy", "Black"];
    let mut moisture = Vec::with_capacity(rows);
    let mut soil = Vec::with_capacity(rows);
    let mut label = Vec::with_capacity(rows);
    for i in 0..rows {
        let class = (i * 7 + i / 5) % FERTILIZERS.len();
        let noise = ((i * 37) % 11) as f64;
        moisture.push(20.0 * class as f64 + noise);
        soil.push(soils[(class + usize::from(i % 6 == 0)) % soils.len()]);
        label.push(FERTILIZERS[class]);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("Moisture", DataType::Float64, false),
        Field::new("Soil Type", DataType::Utf8, false),
        Field::new("Fertilizer Name", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from_iter_values(first_id..first_id + rows as i64)),
            Arc::new(Float64Array::from(moisture)),
            Arc::new(StringArray::from(soil)),
            Arc::new(StringArray::from(label)),
        ],
    )?;
    Ok(batch)
}

/// Check the raw table, split off labels and drop the id column so it never
/// reaches the model.
fn prepare(config: &CvConfig, batch: RecordBatch) -> anyhow::Result<(Dataset, ArrayRef)> {
    config.check_columns(&batch.schema(), true)?;
    let mut data = Dataset::from_batch(batch, &config.target_column)?;
    let ids = data.remove_feature(&config.id_column)?;
    data.validate_features(&config.expected_features)?;
    Ok((data, ids))
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => CvConfig::from_json_file(path)?,
        None => CvConfig {
            target_column: "Fertilizer Name".to_string(),
            expected_features: vec!["Moisture".to_string(), "Soil Type".to_string()],
            ..CvConfig::default()
        },
    };
    config.log_context()?.install_global()?;

    println!("=== Trueno-Rank Cross-Validation ===\n");
    let (data, _) = prepare(&config, synthetic_table(500, 0)?)?;
    println!("Dataset: {} rows, {} classes\n", data.num_rows(), FERTILIZERS.len());

    let mut tracker = StoreTracker::new();
    for kind in [ModelKind::Prior, ModelKind::NearestCentroid] {
        let cv = CrossValidator::new(config.stratified_kfold(), move || {
            BoxedPipeline::for_model(kind)
        })
        .top_k(config.top_k)
        .parallel(config.parallel_folds);

        let ctx = RunContext::new(
            config.experiment_name.as_str(),
            format!("{}-{}", config.run_name, kind.name()),
            kind.name(),
        )
        .with_params(config.params());
        let result = cv.run(&mut tracker, data.features(), data.labels(), &ctx)?;

        println!("{}:", kind.name());
        for (fold, score) in result.fold_scores().iter().enumerate() {
            println!("  fold {}: MAP@{} = {score:.4}", fold + 1, config.top_k);
        }
        println!(
            "  mean:   {:.4} (± {:.4})\n",
            result.mean_score(),
            result.std_dev()
        );
    }

    println!("=== Final Ensemble ===");
    let mut ensemble = ProbabilityEnsemble::new(vec![
        BoxedPipeline::for_model(ModelKind::Prior),
        BoxedPipeline::for_model(ModelKind::NearestCentroid),
    ])?;
    let path = std::env::temp_dir().join("trueno_rank_submission.csv");
    ExperimentSession::run(
        &mut tracker,
        &config.experiment_name,
        "final-ensemble",
        |session| {
            train_final(&mut ensemble, data.features(), data.labels())?;
            let (test, ids) = prepare(&config, synthetic_table(5, 750_000)?)?;
            let recs = recommend(&ensemble, test.features(), config.top_k)?;
            let submission =
                Submission::build(&ids, &config.id_column, &config.target_column, &recs)?;
            submission.write_csv(&path)?;
            session.log_artifact(&path)?;
            for rec in &recs {
                println!("  {}", rec.to_submission_string());
            }
            Ok(())
        },
    )?;
    println!("\nSubmission written to {}", path.display());
    println!(
        "Tracked {} runs, {} metrics",
        tracker.store().run_count(),
        tracker.store().metric_count()
    );
    Ok(())
}
