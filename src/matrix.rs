//! Dense row-major matrices for features and class probabilities
//!
//! Rows are samples, columns are features or classes. Probability rows are
//! taken as-is: nothing here checks that a row sums to one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major `f32` matrix.
///
/// Deserialization goes through [`Matrix::new`], so a decoded matrix always
/// has `rows * cols` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Self::new(raw.rows, raw.cols, raw.data)
    }
}

/// One row per sample, one column per class.
pub type ProbabilityMatrix = Matrix;

/// Numeric model input produced by a feature transform.
pub type FeatureMatrix = Matrix;

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `data.len() != rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidInput(format!(
                "Matrix data has {} values, expected {rows}x{cols} = {}",
                data.len(),
                rows * cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from a list of rows.
    ///
    /// An empty list yields a `0x0` matrix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the rows are ragged
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::InvalidInput(format!(
                    "Ragged matrix: row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of rows (samples).
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (features or classes).
    #[must_use]
    pub const fn num_cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows()`
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Row-major backing slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy the given rows, in the given order, into a new matrix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any index is out of bounds
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            if idx >= self.rows {
                return Err(Error::InvalidInput(format!(
                    "Row index {idx} out of bounds (matrix has {} rows)",
                    self.rows
                )));
            }
            data.extend_from_slice(self.row(idx));
        }
        Ok(Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_length() {
        let err = Matrix::new(2, 2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(err.to_string().contains("expected 2x2"));
    }

    #[test]
    fn test_from_rows_shape() {
        let m = Matrix::from_rows(&[vec![0.1, 0.9], vec![0.7, 0.3], vec![0.5, 0.5]]).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.row(1), &[0.7, 0.3]);
        assert_eq!(m.rows().count(), 3);
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = Matrix::from_rows(&[vec![0.1, 0.9], vec![1.0]]);
        assert!(result.unwrap_err().to_string().contains("Ragged"));
    }

    #[test]
    fn test_from_rows_empty() {
        let rows: Vec<Vec<f32>> = Vec::new();
        let m = Matrix::from_rows(&rows).unwrap();
        assert_eq!(m.shape(), (0, 0));
    }

    #[test]
    fn test_deserialize_rejects_short_data() {
        let result = serde_json::from_str::<Matrix>(r#"{"rows":2,"cols":3,"data":[0.1]}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected 2x3"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_shape() {
        let m = Matrix::from_rows(&[vec![0.25, 0.75], vec![1.0, 0.0]]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(serde_json::from_str::<Matrix>(&json).unwrap(), m);
    }

    #[test]
    fn test_select_rows() {
        let m = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let picked = m.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.as_slice(), &[3.0, 1.0]);
        assert!(m.select_rows(&[3]).is_err());
    }
}
