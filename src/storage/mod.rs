//! Dataset storage (Arrow/Parquet/CSV)
//!
//! Datasets are loaded whole into a single `RecordBatch` of feature columns
//! plus the label vector taken from the target column. Folds are materialized
//! with Arrow's `take` kernel, so training and validation slices are
//! independent copies.

mod submission;

pub use submission::Submission;

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, StringArray, UInt32Array};
use arrow::compute::{cast, concat_batches, take_record_batch};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Rows read for CSV schema inference
const CSV_INFER_RECORDS: usize = 1000;

/// Feature rows with their class labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: RecordBatch,
    labels: Vec<String>,
}

impl Dataset {
    /// Pair features with labels.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the label count differs from the row count
    pub fn new(features: RecordBatch, labels: Vec<String>) -> Result<Self> {
        if features.num_rows() != labels.len() {
            return Err(Error::LengthMismatch {
                context: "dataset",
                expected: features.num_rows(),
                actual: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    /// Split `target` out of `batch` as the label column.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the target column is missing or has nulls
    pub fn from_batch(mut batch: RecordBatch, target: &str) -> Result<Self> {
        let index = batch.schema().index_of(target).map_err(|_| {
            Error::InvalidInput(format!("Target column '{target}' not found in dataset"))
        })?;
        let column = batch.remove_column(index);

        let as_text = cast(&column, &DataType::Utf8)?;
        let strings = as_text
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                Error::Other("Failed to downcast target column to StringArray".to_string())
            })?;

        if strings.null_count() > 0 {
            return Err(Error::InvalidInput(format!(
                "Target column '{target}' has {} null labels",
                strings.null_count()
            )));
        }

        let labels = (0..strings.len())
            .map(|i| strings.value(i).to_string())
            .collect();

        Self::new(batch, labels)
    }

    /// Load a labelled dataset from a Parquet file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or the target column is unusable
    pub fn load_parquet<P: AsRef<Path>>(path: P, target: &str) -> Result<Self> {
        let batch = read_parquet(path.as_ref())?;
        info!(path = %path.as_ref().display(), rows = batch.num_rows(), "loaded parquet dataset");
        Self::from_batch(batch, target)
    }

    /// Load a labelled dataset from a CSV file with a header row.
    ///
    /// # Errors
    /// Returns error if file cannot be read or the target column is unusable
    pub fn load_csv<P: AsRef<Path>>(path: P, target: &str) -> Result<Self> {
        let batch = read_csv(path.as_ref())?;
        info!(path = %path.as_ref().display(), rows = batch.num_rows(), "loaded csv dataset");
        Self::from_batch(batch, target)
    }

    /// Check that every expected feature column is present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the missing columns
    pub fn validate_features<S: AsRef<str>>(&self, expected: &[S]) -> Result<()> {
        validate_columns(&self.features.schema(), expected, None)
    }

    /// Remove a feature column and return it, e.g. a row id that must not
    /// reach the model.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the column does not exist
    pub fn remove_feature(&mut self, name: &str) -> Result<ArrayRef> {
        let index = self.features.schema().index_of(name).map_err(|_| {
            Error::InvalidInput(format!("Feature column '{name}' not found in dataset"))
        })?;
        Ok(self.features.remove_column(index))
    }

    /// Feature columns.
    #[must_use]
    pub const fn features(&self) -> &RecordBatch {
        &self.features
    }

    /// Labels, one per row.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.labels.len()
    }

    /// True if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Copy the given rows into a new dataset.
    ///
    /// # Errors
    ///
    /// Returns error if any index is out of bounds
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let features = take_rows(&self.features, indices)?;
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        Ok(Self { features, labels })
    }
}

/// Check a raw table against the expected feature columns and, for
/// training data, the target column.
///
/// Missing features are reported together, sorted by name, before the
/// target is looked at.
///
/// # Errors
///
/// Returns `InvalidInput` if a feature or the target column is absent
pub fn validate_columns<S: AsRef<str>>(
    schema: &Schema,
    expected: &[S],
    target: Option<&str>,
) -> Result<()> {
    let mut missing: Vec<&str> = expected
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| schema.index_of(name).is_err())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        return Err(Error::InvalidInput(format!(
            "Missing feature columns: {}",
            missing.join(", ")
        )));
    }
    if let Some(target) = target {
        if schema.index_of(target).is_err() {
            return Err(Error::InvalidInput(format!(
                "Target column '{target}' not found in dataset"
            )));
        }
    }
    Ok(())
}

/// Copy rows of `batch` selected by `indices`, in order.
///
/// # Errors
///
/// Returns `InvalidInput` if any index is out of bounds
pub fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let mut positions = Vec::with_capacity(indices.len());
    for &idx in indices {
        if idx >= batch.num_rows() {
            return Err(Error::InvalidInput(format!(
                "Row index {idx} out of bounds (batch has {} rows)",
                batch.num_rows()
            )));
        }
        let position = u32::try_from(idx)
            .map_err(|_| Error::InvalidInput(format!("Row index {idx} exceeds u32 range")))?;
        positions.push(position);
    }
    Ok(take_record_batch(batch, &UInt32Array::from(positions))?)
}

/// Read a whole Parquet file into one batch.
///
/// # Errors
/// Returns error if file cannot be read or parsed
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path)
        .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;
    let schema = Arc::clone(builder.schema());

    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
        batches.push(batch);
    }

    Ok(concat_batches(&schema, &batches)?)
}

/// Read a whole CSV file (header row, inferred schema) into one batch.
///
/// # Errors
/// Returns error if file cannot be read or parsed
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    use arrow::csv::reader::Format;
    use arrow::csv::ReaderBuilder;

    let mut file = File::open(path)
        .map_err(|e| Error::StorageError(format!("Failed to open CSV file: {e}")))?;

    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(CSV_INFER_RECORDS))
        .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(file)
        .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::StorageError(format!("Failed to read CSV batch: {e}")))?;
        batches.push(batch);
    }

    Ok(concat_batches(&schema, &batches)?)
}
