//! Probability ensembling
//!
//! Blends the probability matrices of several independently trained
//! predictors into one. Member matrices must share shape and class ordering;
//! aligning orderings is the caller's job.
//!
//! Blending runs on `trueno` SIMD vectors over the row-major buffers.
//! [`ProbabilityEnsemble`] wraps several pipelines and checks their class
//! orderings before blending their outputs.

use crate::labels::ClassLabels;
use crate::matrix::ProbabilityMatrix;
use crate::pipeline::Pipeline;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use trueno::Vector;

/// How member probabilities are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlendStrategy {
    /// Unweighted element-wise arithmetic mean
    #[default]
    Mean,
}

/// Element-wise mean of `matrices`.
///
/// A single matrix is returned unchanged.
///
/// # Errors
///
/// - `EmptyEnsemble` if `matrices` is empty
/// - `InvalidInput` if shapes differ
pub fn average(matrices: &[ProbabilityMatrix]) -> Result<ProbabilityMatrix> {
    blend(matrices, BlendStrategy::Mean)
}

/// Combine `matrices` with the given strategy.
///
/// # Errors
///
/// - `EmptyEnsemble` if `matrices` is empty
/// - `InvalidInput` if shapes differ
pub fn blend(matrices: &[ProbabilityMatrix], strategy: BlendStrategy) -> Result<ProbabilityMatrix> {
    let (first, rest) = matrices.split_first().ok_or(Error::EmptyEnsemble)?;

    for (i, m) in rest.iter().enumerate() {
        if m.shape() != first.shape() {
            return Err(Error::InvalidInput(format!(
                "Ensemble member {} has shape {:?}, expected {:?}",
                i + 1,
                m.shape(),
                first.shape()
            )));
        }
    }

    if rest.is_empty() {
        return Ok(first.clone());
    }

    match strategy {
        BlendStrategy::Mean => mean_of(first, rest, matrices.len()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_of(
    first: &ProbabilityMatrix,
    rest: &[ProbabilityMatrix],
    count: usize,
) -> Result<ProbabilityMatrix> {
    let (rows, cols) = first.shape();
    if first.as_slice().is_empty() {
        return Ok(first.clone());
    }

    let mut acc = Vector::from_slice(first.as_slice());
    for m in rest {
        acc = acc
            .add(&Vector::from_slice(m.as_slice()))
            .map_err(|e| Error::Other(format!("SIMD add failed: {e:?}")))?;
    }

    let mean = acc
        .scale(1.0 / count as f32)
        .map_err(|e| Error::Other(format!("SIMD scale failed: {e:?}")))?;

    ProbabilityMatrix::new(rows, cols, mean.as_slice().to_vec())
}

/// Several pipelines predicting as one.
///
/// Members must expose the same class ordering once fitted; this is checked
/// at construction (for already fitted members), after `fit`, and before
/// every prediction.
pub struct ProbabilityEnsemble<P> {
    members: Vec<P>,
    strategy: BlendStrategy,
}

impl<P: Pipeline> ProbabilityEnsemble<P> {
    /// Wrap `members` with mean blending.
    ///
    /// # Errors
    ///
    /// - `EmptyEnsemble` if `members` is empty
    /// - `InvalidInput` if fitted members disagree on class ordering
    pub fn new(members: Vec<P>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::EmptyEnsemble);
        }
        let ensemble = Self {
            members,
            strategy: BlendStrategy::default(),
        };
        ensemble.check_class_orderings(false)?;
        Ok(ensemble)
    }

    /// Use a different blend strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: BlendStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Member pipelines in blend order.
    #[must_use]
    pub fn members(&self) -> &[P] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; construction rejects empty ensembles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn check_class_orderings(&self, require_fitted: bool) -> Result<()> {
        let mut reference: Option<&ClassLabels> = None;
        for (i, member) in self.members.iter().enumerate() {
            match (member.classes(), reference) {
                (None, _) if require_fitted => {
                    return Err(Error::InvalidInput(format!(
                        "Ensemble member {i} ({}) is not fitted",
                        member.name()
                    )));
                }
                (None, _) => {}
                (Some(classes), None) => reference = Some(classes),
                (Some(classes), Some(expected)) if classes != expected => {
                    return Err(Error::InvalidInput(format!(
                        "Ensemble member {i} ({}) has class ordering {:?}, expected {:?}",
                        member.name(),
                        classes.as_slice(),
                        expected.as_slice()
                    )));
                }
                (Some(_), Some(_)) => {}
            }
        }
        Ok(())
    }
}

impl<P: Pipeline> Pipeline for ProbabilityEnsemble<P> {
    fn name(&self) -> String {
        let names: Vec<String> = self.members.iter().map(Pipeline::name).collect();
        format!("ensemble({})", names.join("+"))
    }

    fn fit(&mut self, features: &RecordBatch, labels: &[String]) -> anyhow::Result<()> {
        for member in &mut self.members {
            member.fit(features, labels)?;
        }
        self.check_class_orderings(true)?;
        Ok(())
    }

    fn predict_proba(&self, features: &RecordBatch) -> anyhow::Result<ProbabilityMatrix> {
        self.check_class_orderings(true)?;
        let outputs = self
            .members
            .iter()
            .map(|m| m.predict_proba(features))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(blend(&outputs, self.strategy)?)
    }

    fn classes(&self) -> Option<&ClassLabels> {
        self.members.first().and_then(Pipeline::classes)
    }
}
