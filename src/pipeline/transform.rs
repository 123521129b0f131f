//! Column transformer: standard scaling + one-hot encoding

use std::collections::BTreeSet;

use anyhow::{anyhow, Context};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use super::FeatureTransform;
use crate::matrix::FeatureMatrix;

/// Scales numeric columns to zero mean / unit variance and one-hot encodes
/// string columns.
///
/// Everything is learned in `fit`; categories unseen at fit time encode as
/// all zeros and null numerics encode as the training mean (0 after scaling).
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    selection: Selection,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
enum Selection {
    Auto,
    Explicit {
        numeric: Vec<String>,
        categorical: Vec<String>,
    },
}

#[derive(Debug, Clone)]
struct Fitted {
    numeric: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
    categorical: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl ColumnTransformer {
    /// Encode exactly the named columns.
    #[must_use]
    pub fn new<N, C>(numeric: N, categorical: C) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            selection: Selection::Explicit {
                numeric: numeric.into_iter().map(Into::into).collect(),
                categorical: categorical.into_iter().map(Into::into).collect(),
            },
            fitted: None,
        }
    }

    /// Pick columns from the training schema at fit time: integer and float
    /// columns are numeric, string columns categorical, others ignored.
    #[must_use]
    pub const fn auto() -> Self {
        Self {
            selection: Selection::Auto,
            fitted: None,
        }
    }

    /// Width of the encoded matrix, known after `fit`.
    #[must_use]
    pub fn output_width(&self) -> Option<usize> {
        self.fitted
            .as_ref()
            .map(|f| f.numeric.len() + f.categories.iter().map(Vec::len).sum::<usize>())
    }

    fn select(&self, features: &RecordBatch) -> (Vec<String>, Vec<String>) {
        match &self.selection {
            Selection::Explicit {
                numeric,
                categorical,
            } => (numeric.clone(), categorical.clone()),
            Selection::Auto => {
                let mut numeric = Vec::new();
                let mut categorical = Vec::new();
                for field in features.schema().fields() {
                    let dt = field.data_type();
                    if dt.is_numeric() {
                        numeric.push(field.name().clone());
                    } else if matches!(dt, DataType::Utf8 | DataType::LargeUtf8) {
                        categorical.push(field.name().clone());
                    }
                }
                (numeric, categorical)
            }
        }
    }
}

impl FeatureTransform for ColumnTransformer {
    fn fit(&mut self, features: &RecordBatch) -> anyhow::Result<()> {
        let (numeric, categorical) = self.select(features);

        let mut means = Vec::with_capacity(numeric.len());
        let mut stds = Vec::with_capacity(numeric.len());
        for name in &numeric {
            let values = numeric_column(features, name)?;
            let (mean, std) = mean_std(&values);
            means.push(mean);
            stds.push(std);
        }

        let mut categories = Vec::with_capacity(categorical.len());
        for name in &categorical {
            let values = string_column(features, name)?;
            let unique: BTreeSet<String> = values.into_iter().flatten().collect();
            categories.push(unique.into_iter().collect());
        }

        self.fitted = Some(Fitted {
            numeric,
            means,
            stds,
            categorical,
            categories,
        });
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn transform(&self, features: &RecordBatch) -> anyhow::Result<FeatureMatrix> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| anyhow!("ColumnTransformer used before fit"))?;
        let width = self.output_width().unwrap_or(0);
        let rows = features.num_rows();
        let mut data = vec![0.0f32; rows * width];

        let mut offset = 0;
        for (j, name) in fitted.numeric.iter().enumerate() {
            let values = numeric_column(features, name)?;
            for (i, value) in values.iter().enumerate() {
                let scaled = value.map_or(0.0, |v| (v - fitted.means[j]) / fitted.stds[j]);
                data[i * width + offset] = scaled as f32;
            }
            offset += 1;
        }

        for (name, cats) in fitted.categorical.iter().zip(&fitted.categories) {
            let values = string_column(features, name)?;
            for (i, value) in values.iter().enumerate() {
                let Some(value) = value else { continue };
                if let Ok(pos) = cats.binary_search(value) {
                    data[i * width + offset + pos] = 1.0;
                }
            }
            offset += cats.len();
        }

        Ok(FeatureMatrix::new(rows, width, data)?)
    }
}

fn column<'a>(features: &'a RecordBatch, name: &str) -> anyhow::Result<&'a ArrayRef> {
    features
        .column_by_name(name)
        .ok_or_else(|| anyhow!("column '{name}' not found in feature batch"))
}

fn numeric_column(features: &RecordBatch, name: &str) -> anyhow::Result<Vec<Option<f64>>> {
    let casted = cast(column(features, name)?, &DataType::Float64)
        .with_context(|| format!("column '{name}' is not numeric"))?;
    let array = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow!("failed to downcast column '{name}' to Float64Array"))?;
    Ok(array.iter().collect())
}

fn string_column(features: &RecordBatch, name: &str) -> anyhow::Result<Vec<Option<String>>> {
    let casted = cast(column(features, name)?, &DataType::Utf8)
        .with_context(|| format!("column '{name}' cannot be read as text"))?;
    let array = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("failed to downcast column '{name}' to StringArray"))?;
    Ok(array.iter().map(|v| v.map(str::to_string)).collect())
}

#[allow(clippy::cast_precision_loss)]
fn mean_std(values: &[Option<f64>]) -> (f64, f64) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return (0.0, 1.0);
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    (mean, if std > 0.0 { std } else { 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch(temps: Vec<i32>, soils: Vec<Option<&str>>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("temperature", DataType::Int32, false),
            Field::new("soil", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(temps)),
                Arc::new(StringArray::from(soils)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_auto_scales_and_encodes() {
        let train = batch(vec![20, 30], vec![Some("sandy"), Some("clay")]);
        let mut transformer = ColumnTransformer::auto();

        let encoded = transformer.fit_transform(&train).unwrap();

        // temperature, clay, sandy
        assert_eq!(encoded.shape(), (2, 3));
        assert_eq!(encoded.row(0), &[-1.0, 0.0, 1.0]);
        assert_eq!(encoded.row(1), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_and_null_encode_as_zeros() {
        let train = batch(vec![20, 30], vec![Some("sandy"), Some("clay")]);
        let test = batch(vec![25, 25], vec![Some("loamy"), None]);
        let mut transformer = ColumnTransformer::auto();
        transformer.fit(&train).unwrap();

        let encoded = transformer.transform(&test).unwrap();

        assert_eq!(encoded.row(0), &[0.0, 0.0, 0.0]);
        assert_eq!(encoded.row(1), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_explicit_columns_only() {
        let train = batch(vec![20, 30], vec![Some("sandy"), Some("clay")]);
        let mut transformer = ColumnTransformer::new(["temperature"], Vec::<String>::new());

        let encoded = transformer.fit_transform(&train).unwrap();

        assert_eq!(transformer.output_width(), Some(1));
        assert_eq!(encoded.shape(), (2, 1));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let transformer = ColumnTransformer::auto();
        let err = transformer.transform(&batch(vec![1], vec![None])).unwrap_err();
        assert!(err.to_string().contains("before fit"));
    }

    #[test]
    fn test_missing_column_fails() {
        let mut transformer = ColumnTransformer::new(["humidity"], Vec::<String>::new());
        let err = transformer
            .fit(&batch(vec![1], vec![Some("clay")]))
            .unwrap_err();
        assert!(err.to_string().contains("humidity"));
    }
}
