//! Submission files: one ranked recommendation per id

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::labels::Recommendation;
use crate::{Error, Result};

/// Two-column table `(id, target)` whose target cells hold space-joined
/// Top-K labels, e.g. `"DAP Urea 28-28"`.
#[derive(Debug, Clone)]
pub struct Submission {
    batch: RecordBatch,
}

impl Submission {
    /// Pair each id with its recommendation.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if there is not exactly one recommendation per id
    pub fn build(
        ids: &ArrayRef,
        id_column: &str,
        target_column: &str,
        recommendations: &[Recommendation],
    ) -> Result<Self> {
        if ids.len() != recommendations.len() {
            return Err(Error::LengthMismatch {
                context: "submission",
                expected: ids.len(),
                actual: recommendations.len(),
            });
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new(id_column, ids.data_type().clone(), ids.is_nullable()),
            Field::new(target_column, arrow::datatypes::DataType::Utf8, false),
        ]));
        let cells: StringArray = recommendations
            .iter()
            .map(|r| Some(r.to_submission_string()))
            .collect();

        let batch = RecordBatch::try_new(schema, vec![Arc::clone(ids), Arc::new(cells)])?;
        Ok(Self { batch })
    }

    /// The submission as an Arrow batch.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Write as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::StorageError(format!("Failed to create submission file: {e}")))?;
        let mut writer = arrow::csv::Writer::new(file);
        writer.write(&self.batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array};

    #[test]
    fn test_build_joins_labels() {
        let ids: ArrayRef = Arc::new(Int64Array::from(vec![750_000, 750_001]));
        let recs = vec![
            Recommendation::new(vec!["DAP".into(), "Urea".into(), "28-28".into()]),
            Recommendation::new(vec!["14-35-14".into()]),
        ];

        let submission = Submission::build(&ids, "id", "Fertilizer Name", &recs).unwrap();

        let cells = submission
            .batch()
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(cells.value(0), "DAP Urea 28-28");
        assert_eq!(cells.value(1), "14-35-14");
        assert_eq!(submission.batch().schema().field(1).name(), "Fertilizer Name");
    }

    #[test]
    fn test_build_length_mismatch() {
        let ids: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let err = Submission::build(&ids, "id", "label", &[]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { context: "submission", .. }));
    }
}
