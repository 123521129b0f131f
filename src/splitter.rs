//! Fold splitting
//!
//! A [`FoldSplitter`] partitions row indices into `(train, validation)`
//! pairs. [`StratifiedKFold`] keeps every class's share roughly equal across
//! folds and is reproducible for a fixed seed.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Row indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Rows used to fit the pipeline, ascending
    pub train: Vec<usize>,
    /// Rows scored after fitting, ascending
    pub validation: Vec<usize>,
}

/// Partitions a dataset into folds.
pub trait FoldSplitter {
    /// Folds in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns error if the data cannot be split with this configuration
    fn split(&self, features: &RecordBatch, labels: &[String]) -> Result<Vec<Fold>>;
}

/// Stratified K-fold splitter
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a shuffling splitter with seed 42
    #[must_use]
    pub const fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed: 42,
        }
    }

    /// Set random seed for shuffling
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Disable shuffling
    #[must_use]
    pub const fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Number of folds produced.
    #[must_use]
    pub const fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Assign each row a fold id.
    fn assign(&self, labels: &[String]) -> Vec<usize> {
        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            by_class.entry(label.as_str()).or_default().push(i);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_of = vec![0; labels.len()];
        // Dealing continues across classes so fold sizes differ by at most one.
        let mut next = 0;
        for (label, mut members) in by_class {
            if members.len() < self.n_splits {
                warn!(
                    class = label,
                    members = members.len(),
                    n_splits = self.n_splits,
                    "class has fewer members than folds"
                );
            }
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for idx in members {
                fold_of[idx] = next % self.n_splits;
                next += 1;
            }
        }
        fold_of
    }
}

impl FoldSplitter for StratifiedKFold {
    fn split(&self, features: &RecordBatch, labels: &[String]) -> Result<Vec<Fold>> {
        if features.num_rows() != labels.len() {
            return Err(Error::LengthMismatch {
                context: "fold split",
                expected: features.num_rows(),
                actual: labels.len(),
            });
        }
        if self.n_splits < 2 {
            return Err(Error::InvalidInput(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > labels.len() {
            return Err(Error::InvalidInput(format!(
                "n_splits={} exceeds number of samples {}",
                self.n_splits,
                labels.len()
            )));
        }

        let fold_of = self.assign(labels);
        let folds: Vec<Fold> = (0..self.n_splits)
            .map(|fold| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_of[i] == fold);
                Fold { train, validation }
            })
            .collect();

        debug!(
            n_splits = self.n_splits,
            seed = self.seed,
            shuffle = self.shuffle,
            "stratified folds built"
        );
        Ok(folds)
    }
}
