//! MAP@K scoring
//!
//! A sample scores `1/i` when its true label first appears at 1-based rank
//! `i` within the top `k` predictions, `0.0` otherwise. Labels repeated in a
//! prediction row are skipped after their first occurrence, so a duplicate can
//! never match at a worse rank.

use crate::{Error, Result};
use std::collections::HashSet;

/// Metric key used for MAP@K values, e.g. `map@3`.
#[must_use]
pub fn map_metric_key(k: usize) -> String {
    format!("map@{k}")
}

/// Average precision at `k` for a single sample.
///
/// # Example
///
/// ```rust
/// use trueno_rank::metric::average_precision_at_k;
///
/// assert!((average_precision_at_k("A", &["B", "A", "C"], 3) - 0.5).abs() < f64::EPSILON);
/// assert!((average_precision_at_k("A", &["A", "A", "B"], 3) - 1.0).abs() < f64::EPSILON);
/// assert_eq!(average_precision_at_k("A", &["B", "C", "D"], 3), 0.0);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_precision_at_k<S: AsRef<str>>(true_label: &str, predicted: &[S], k: usize) -> f64 {
    let mut seen: HashSet<&str> = HashSet::with_capacity(k.min(predicted.len()));

    for (rank, pred) in predicted.iter().take(k).enumerate() {
        let pred = pred.as_ref();
        if !seen.insert(pred) {
            continue;
        }
        if pred == true_label {
            return 1.0 / (rank + 1) as f64;
        }
    }

    0.0
}

/// Mean of per-sample average precision at `k`.
///
/// Empty input scores `0.0`.
///
/// # Errors
///
/// Returns `LengthMismatch` if `true_labels` and `predicted` differ in length
#[allow(clippy::cast_precision_loss)]
pub fn mean_average_precision_at_k<T, P, S>(
    true_labels: &[T],
    predicted: &[P],
    k: usize,
) -> Result<f64>
where
    T: AsRef<str>,
    P: AsRef<[S]>,
    S: AsRef<str>,
{
    if true_labels.len() != predicted.len() {
        return Err(Error::LengthMismatch {
            context: "mean_average_precision_at_k",
            expected: true_labels.len(),
            actual: predicted.len(),
        });
    }

    if true_labels.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = true_labels
        .iter()
        .zip(predicted)
        .map(|(truth, pred)| average_precision_at_k(truth.as_ref(), pred.as_ref(), k))
        .sum();

    Ok(total / true_labels.len() as f64)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::labels::Recommendation;

    #[test]
    fn test_ap_second_rank() {
        assert_eq!(average_precision_at_k("A", &["B", "A", "C"], 3), 0.5);
    }

    #[test]
    fn test_ap_first_rank_with_duplicate() {
        assert_eq!(average_precision_at_k("A", &["A", "A", "B"], 3), 1.0);
    }

    #[test]
    fn test_ap_no_match() {
        assert_eq!(average_precision_at_k("A", &["B", "C", "D"], 3), 0.0);
    }

    #[test]
    fn test_ap_match_beyond_cutoff_ignored() {
        assert_eq!(average_precision_at_k("D", &["A", "B", "C", "D"], 3), 0.0);
    }

    #[test]
    fn test_ap_duplicate_keeps_rank_positions() {
        // The repeated B still occupies rank 2; A matches at rank 3
        assert!((average_precision_at_k("A", &["B", "B", "A"], 3) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ap_short_prediction_and_zero_k() {
        assert_eq!(average_precision_at_k("A", &["A"], 3), 1.0);
        assert_eq!(average_precision_at_k("A", &["A"], 0), 0.0);
        let empty: [&str; 0] = [];
        assert_eq!(average_precision_at_k("A", &empty, 3), 0.0);
    }

    #[test]
    fn test_map_mean_of_samples() {
        let truth = ["A", "B", "C"];
        let preds = [vec!["A", "B", "C"], vec!["A", "B", "C"], vec!["X", "Y", "Z"]];
        let score = mean_average_precision_at_k(&truth, &preds, 3).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_map_accepts_recommendations() {
        let truth = vec!["DAP".to_string()];
        let preds = vec![Recommendation::new(vec!["Urea".into(), "DAP".into()])];
        let score = mean_average_precision_at_k(&truth, &preds, 3).unwrap();
        assert_eq!(score, 0.5);
    }

    #[test]
    fn test_map_empty_is_zero() {
        let truth: [&str; 0] = [];
        let preds: [Vec<&str>; 0] = [];
        assert_eq!(mean_average_precision_at_k(&truth, &preds, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_map_length_mismatch() {
        let truth = ["A", "B"];
        let preds = [vec!["A"]];
        let err = mean_average_precision_at_k(&truth, &preds, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_map_metric_key() {
        assert_eq!(map_metric_key(3), "map@3");
    }
}
