//! Class label orderings and ranked recommendations

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Ordered sequence of unique class labels.
///
/// Column `i` of a probability matrix corresponds to label `i`. Decoding
/// rejects duplicates the same way [`ClassLabels::new`] does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClassLabels")]
pub struct ClassLabels {
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct RawClassLabels {
    labels: Vec<String>,
}

impl TryFrom<RawClassLabels> for ClassLabels {
    type Error = Error;

    fn try_from(raw: RawClassLabels) -> Result<Self> {
        Self::new(raw.labels)
    }
}

impl ClassLabels {
    /// Create an ordering from labels in column order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a label appears twice
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate class label in ordering: {label}"
                )));
            }
        }
        Ok(Self { labels })
    }

    /// Sorted unique labels observed in training targets.
    ///
    /// This is the ordering a fitted classifier exposes.
    #[must_use]
    pub fn from_observed<S: AsRef<str>>(targets: &[S]) -> Self {
        let unique: BTreeSet<&str> = targets.iter().map(AsRef::as_ref).collect();
        Self {
            labels: unique.into_iter().map(str::to_string).collect(),
        }
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if there are no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of column `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Column index of `label`.
    #[must_use]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Labels in column order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Iterate labels in column order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.labels.iter().map(String::as_str)
    }
}

/// Ranked labels for one sample, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    labels: Vec<String>,
}

impl Recommendation {
    /// Wrap an already ranked label list.
    #[must_use]
    pub const fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Ranked labels, best first.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of ranked labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if nothing was ranked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Space-joined labels, the submission cell format (`"A B C"`).
    #[must_use]
    pub fn to_submission_string(&self) -> String {
        self.labels.join(" ")
    }
}

impl AsRef<[String]> for Recommendation {
    fn as_ref(&self) -> &[String] {
        &self.labels
    }
}
