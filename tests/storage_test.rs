//! Dataset loading and submission writing against real files

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use trueno_rank::evaluate::{recommend, train_final};
use trueno_rank::pipeline::{BoxedPipeline, ModelKind};
use trueno_rank::storage::{Dataset, Submission};
use trueno_rank::{CvConfig, Error};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("trueno_rank_{}_{name}", std::process::id()))
}

fn training_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("Moisture", DataType::Float64, false),
        Field::new("Soil Type", DataType::Utf8, false),
        Field::new("Fertilizer Name", DataType::Utf8, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![0, 1, 2, 3])),
            Arc::new(Float64Array::from(vec![61.0, 64.0, 12.0, 15.0])),
            Arc::new(StringArray::from(vec!["Clayey", "Clayey", "Sandy", "Sandy"])),
            Arc::new(StringArray::from(vec!["Urea", "Urea", "DAP", "DAP"])),
        ],
    )
    .unwrap()
}

#[test]
fn test_load_parquet_dataset() {
    let path = temp_path("train.parquet");
    let batch = training_batch();
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let dataset = Dataset::load_parquet(&path, "Fertilizer Name").unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(dataset.num_rows(), 4);
    assert_eq!(dataset.labels(), &["Urea", "Urea", "DAP", "DAP"]);
    assert_eq!(dataset.features().num_columns(), 3);
}

#[test]
fn test_load_csv_dataset_infers_schema() {
    let path = temp_path("train.csv");
    std::fs::write(
        &path,
        "id,Moisture,Soil Type,Fertilizer Name\n\
         0,61.5,Clayey,Urea\n\
         1,12.0,Sandy,DAP\n\
         2,40.25,Loamy,14-35-14\n",
    )
    .unwrap();

    let dataset = Dataset::load_csv(&path, "Fertilizer Name").unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(dataset.labels(), &["Urea", "DAP", "14-35-14"]);
    let schema = dataset.features().schema();
    assert_eq!(schema.field_with_name("id").unwrap().data_type(), &DataType::Int64);
    assert_eq!(
        schema.field_with_name("Moisture").unwrap().data_type(),
        &DataType::Float64
    );
    assert_eq!(
        schema.field_with_name("Soil Type").unwrap().data_type(),
        &DataType::Utf8
    );
}

#[test]
fn test_missing_file_is_storage_error() {
    let err = Dataset::load_csv(temp_path("absent.csv"), "label").unwrap_err();
    assert!(err.to_string().contains("Storage error"));
}

#[test]
fn test_train_recommend_and_write_submission() {
    let train = Dataset::from_batch(training_batch(), "Fertilizer Name").unwrap();
    let mut pipeline = BoxedPipeline::for_model(ModelKind::NearestCentroid);
    train_final(&mut pipeline, train.features(), train.labels()).unwrap();

    let test = train.take(&[0, 2]).unwrap();
    let recs = recommend(&pipeline, test.features(), 2).unwrap();
    let ids: ArrayRef = Arc::new(Int64Array::from(vec![750_000, 750_001]));
    let submission = Submission::build(&ids, "id", "Fertilizer Name", &recs).unwrap();

    let path = temp_path("submission.csv");
    submission.write_csv(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "id,Fertilizer Name");
    assert_eq!(lines[1], "750000,Urea DAP");
    assert_eq!(lines[2], "750001,DAP Urea");
}

#[test]
fn test_test_csv_missing_feature_fails_before_training() {
    let config = CvConfig {
        target_column: "Fertilizer Name".to_string(),
        expected_features: vec!["Moisture".to_string(), "Soil Type".to_string()],
        ..CvConfig::default()
    };
    let path = temp_path("test_missing.csv");
    std::fs::write(&path, "id,Moisture\n750000,61.5\n750001,12.0\n").unwrap();
    let raw = trueno_rank::storage::read_csv(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let err = config.check_columns(&raw.schema(), false).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(err.to_string().contains("Missing feature columns: Soil Type"));
}

#[test]
fn test_train_table_missing_target_fails_validation() {
    let config = CvConfig {
        target_column: "Fertilizer".to_string(),
        expected_features: vec!["Moisture".to_string()],
        ..CvConfig::default()
    };
    let err = config.check_columns(&training_batch().schema(), true).unwrap_err();
    assert!(err.to_string().contains("Target column 'Fertilizer' not found"));
}

#[test]
fn test_id_column_is_kept_out_of_model_features() {
    let config = CvConfig {
        target_column: "Fertilizer Name".to_string(),
        expected_features: vec!["Moisture".to_string(), "Soil Type".to_string()],
        ..CvConfig::default()
    };
    let raw = training_batch();
    config.check_columns(&raw.schema(), true).unwrap();
    let mut train = Dataset::from_batch(raw, &config.target_column).unwrap();
    let ids = train.remove_feature(&config.id_column).unwrap();
    train.validate_features(&config.expected_features).unwrap();

    assert_eq!(ids.len(), 4);
    assert!(train.features().column_by_name("id").is_none());
    assert_eq!(train.features().num_columns(), 2);

    let mut pipeline = BoxedPipeline::for_model(ModelKind::NearestCentroid);
    train_final(&mut pipeline, train.features(), train.labels()).unwrap();
    let recs = recommend(&pipeline, train.features(), 1).unwrap();
    let top: Vec<&str> = recs.iter().map(|r| r.labels()[0].as_str()).collect();
    assert_eq!(top, vec!["Urea", "Urea", "DAP", "DAP"]);
}
