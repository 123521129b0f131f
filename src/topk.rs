//! Top-K label ranking
//!
//! **Problem**: turning a probability row into a ranked recommendation by
//! fully sorting every row is O(C log C) per sample.
//!
//! **Solution**: bounded heap selection, O(C log K) per sample, with a total
//! order on `(probability desc, column index asc)` so that exact ties always
//! resolve to the lower column index.
//!
//! Toyota Way Principles:
//! - **Kaizen**: Algorithmic improvement (O(C log C) → O(C log K))
//! - **Poka-Yoke**: Deterministic tie-break, identical input ⇒ identical ranking
//!
//! ## Example
//!
//! ```rust
//! use trueno_rank::labels::ClassLabels;
//! use trueno_rank::matrix::Matrix;
//! use trueno_rank::topk::TopKSelection;
//!
//! # fn main() -> trueno_rank::Result<()> {
//! let proba = Matrix::from_rows(&[vec![0.2, 0.5, 0.3]])?;
//! let labels = ClassLabels::new(["Urea", "DAP", "14-35-14"])?;
//!
//! let top2 = proba.top_k(&labels, 2)?;
//! assert_eq!(top2[0].labels(), &["DAP", "14-35-14"]);
//! # Ok(())
//! # }
//! ```

use crate::labels::{ClassLabels, Recommendation};
use crate::matrix::ProbabilityMatrix;
use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ranked labels for every sample, in sample order.
pub type TopKResult = Vec<Recommendation>;

/// Trait for Top-K label ranking on probability matrices
pub trait TopKSelection {
    /// Rank the `k` most probable labels of every row
    ///
    /// # Arguments
    /// * `labels` - Class ordering; label `i` names column `i`
    /// * `k` - Number of labels per row (rows get `min(k, classes)`)
    ///
    /// # Errors
    /// Returns error if:
    /// - K is zero
    /// - Column count differs from the number of labels
    fn top_k(&self, labels: &ClassLabels, k: usize) -> Result<TopKResult>;
}

impl TopKSelection for ProbabilityMatrix {
    fn top_k(&self, labels: &ClassLabels, k: usize) -> Result<TopKResult> {
        top_k_labels(self, labels, k)
    }
}

/// Rank the `k` most probable labels of every row of `probabilities`.
///
/// # Errors
///
/// Returns `InvalidInput` if `k == 0` or the column count does not match
/// `labels.len()`. Both are checked before any row is ranked.
pub fn top_k_labels(
    probabilities: &ProbabilityMatrix,
    labels: &ClassLabels,
    k: usize,
) -> Result<TopKResult> {
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }

    if probabilities.num_cols() != labels.len() {
        return Err(Error::InvalidInput(format!(
            "Probability matrix has {} columns but class ordering has {} labels",
            probabilities.num_cols(),
            labels.len()
        )));
    }

    let take = k.min(labels.len());
    let names = labels.as_slice();

    Ok(probabilities
        .rows()
        .map(|row| {
            let ranked = select_top_k_indices(row, take)
                .into_iter()
                .map(|index| names[index].clone())
                .collect();
            Recommendation::new(ranked)
        })
        .collect())
}

/// Select the column indices of the `k` largest values, best first.
///
/// Equal values rank by ascending column index. Values are compared with
/// `f32::total_cmp`, so NaN rows still rank deterministically.
///
/// Time complexity: O(C log K) where C = number of columns
/// Space complexity: O(K) for the heap
#[must_use]
pub fn select_top_k_indices(row: &[f32], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    // Max-heap on "worse": the top is the weakest kept candidate
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k);

    for (index, &value) in row.iter().enumerate() {
        let item = Candidate { value, index };
        if heap.len() < k {
            heap.push(item);
        } else if let Some(worst) = heap.peek() {
            if item < *worst {
                heap.pop();
                heap.push(item);
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|item| item.index)
        .collect()
}

// Ordered so that `a < b` means `a` ranks ahead of `b`
#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
