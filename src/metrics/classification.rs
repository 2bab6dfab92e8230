//! Precision, recall, accuracy and F1 from match counts
//!
//! Every ratio with a zero denominator is 0, so none of these functions
//! produce NaN. `accuracy` here is `tp / (tp + fp + fn)`: the share of the
//! matched/unmatched universe that was matched. There are no true negatives
//! in event matching, so it is not classification accuracy over a fixed
//! sample; [`accuracy_score`] is the latter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::error::{Error, Result};

/// True positive / false positive / false negative counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl Counts {
    pub fn new(tp: usize, fp: usize, fn_: usize) -> Self {
        Counts { tp, fp, fn_ }
    }

    /// Number of ground-truth items: `tp + fn`
    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }

    /// Number of predicted items: `tp + fp`
    pub fn predicted(&self) -> usize {
        self.tp + self.fp
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        Counts::new(self.tp + other.tp, self.fp + other.fp, self.fn_ + other.fn_)
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Counts) {
        *self = *self + other;
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), |acc, c| acc + c)
    }
}

/// `num / den`, or 0 when the denominator is 0
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Which score to read from a metric row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Accuracy,
        MetricKind::Precision,
        MetricKind::Recall,
        MetricKind::F1,
    ];

    /// Parse a metric name (`f1`, `f1-score`, `precision`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accuracy" | "acc" => Some(MetricKind::Accuracy),
            "precision" | "p" => Some(MetricKind::Precision),
            "recall" | "r" => Some(MetricKind::Recall),
            "f1" | "f1-score" | "f1_score" | "f" => Some(MetricKind::F1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Accuracy => "accuracy",
            MetricKind::Precision => "precision",
            MetricKind::Recall => "recall",
            MetricKind::F1 => "f1",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four scores of a row or an average
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub f1: f64,
}

impl MetricScores {
    /// Scores of a single `(tp, fp, fn)` triple
    pub fn from_counts(counts: Counts) -> Self {
        let tp = counts.tp as f64;
        let fp = counts.fp as f64;
        let fn_ = counts.fn_ as f64;

        let precision = safe_ratio(tp, tp + fp);
        let recall = safe_ratio(tp, tp + fn_);
        let accuracy = safe_ratio(tp, tp + fp + fn_);
        let f1 = safe_ratio(2.0 * precision * recall, precision + recall);

        MetricScores {
            precision,
            recall,
            accuracy,
            f1,
        }
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Accuracy => self.accuracy,
            MetricKind::Precision => self.precision,
            MetricKind::Recall => self.recall,
            MetricKind::F1 => self.f1,
        }
    }
}

/// Counts and derived scores for one group (event, class or overall)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub support: usize,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub f1: f64,
}

impl MetricRow {
    pub fn from_counts(counts: Counts) -> Self {
        let scores = MetricScores::from_counts(counts);
        MetricRow {
            tp: counts.tp,
            fp: counts.fp,
            fn_: counts.fn_,
            support: counts.support(),
            precision: scores.precision,
            recall: scores.recall,
            accuracy: scores.accuracy,
            f1: scores.f1,
        }
    }

    pub fn counts(&self) -> Counts {
        Counts::new(self.tp, self.fp, self.fn_)
    }

    pub fn scores(&self) -> MetricScores {
        MetricScores {
            precision: self.precision,
            recall: self.recall,
            accuracy: self.accuracy,
            f1: self.f1,
        }
    }
}

impl From<Counts> for MetricRow {
    fn from(counts: Counts) -> Self {
        MetricRow::from_counts(counts)
    }
}

/// Unweighted mean of per-group scores over groups with support > 0
pub fn macro_average(rows: &[MetricRow]) -> MetricScores {
    let valid: Vec<&MetricRow> = rows.iter().filter(|r| r.support > 0).collect();
    let n = valid.len() as f64;
    let mean = |f: fn(&MetricRow) -> f64| safe_ratio(valid.iter().map(|r| f(r)).sum(), n);

    MetricScores {
        precision: mean(|r| r.precision),
        recall: mean(|r| r.recall),
        accuracy: mean(|r| r.accuracy),
        f1: mean(|r| r.f1),
    }
}

/// Scores of the counts pooled across all groups
pub fn micro_average(rows: &[MetricRow]) -> MetricScores {
    MetricScores::from_counts(rows.iter().map(MetricRow::counts).sum())
}

/// Support-weighted mean of per-group scores over groups with support > 0
pub fn weighted_average(rows: &[MetricRow]) -> MetricScores {
    let valid: Vec<&MetricRow> = rows.iter().filter(|r| r.support > 0).collect();
    let total = valid.iter().map(|r| r.support).sum::<usize>() as f64;
    let weighted = |f: fn(&MetricRow) -> f64| {
        safe_ratio(valid.iter().map(|r| f(r) * r.support as f64).sum(), total)
    };

    MetricScores {
        precision: weighted(|r| r.precision),
        recall: weighted(|r| r.recall),
        accuracy: weighted(|r| r.accuracy),
        f1: weighted(|r| r.f1),
    }
}

/// Macro, micro and weighted averages of a set of group rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    #[serde(rename = "macro")]
    pub macro_avg: MetricScores,
    pub micro: MetricScores,
    pub weighted: MetricScores,
}

impl AveragedMetrics {
    /// All three averages from the group rows alone
    pub fn from_rows(rows: &[MetricRow]) -> Self {
        AveragedMetrics {
            macro_avg: macro_average(rows),
            micro: micro_average(rows),
            weighted: weighted_average(rows),
        }
    }

    /// Averages where the micro scores come from externally pooled counts
    ///
    /// Used for timelines, whose pooled counts are summed per match key
    /// rather than per event.
    pub fn with_pooled(rows: &[MetricRow], pooled: Counts) -> Self {
        AveragedMetrics {
            macro_avg: macro_average(rows),
            micro: MetricScores::from_counts(pooled),
            weighted: weighted_average(rows),
        }
    }
}

/// Share of positions where the predicted label equals the true label
///
/// # Arguments
/// * `y_true` - true labels
/// * `y_pred` - predicted labels
pub fn accuracy_score<T: PartialEq>(y_true: &[T], y_pred: &[T]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(Error::InvalidInput(format!(
            "true and predicted label lengths differ: {} vs {}",
            y_true.len(),
            y_pred.len()
        )));
    }

    if y_true.is_empty() {
        return Err(Error::EmptyData("no labels to score".to_string()));
    }

    let correct_count = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();

    Ok(correct_count as f64 / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tp: usize, fp: usize, fn_: usize) -> MetricRow {
        MetricRow::from_counts(Counts::new(tp, fp, fn_))
    }

    #[test]
    fn test_row_scores() {
        let r = row(2, 1, 1);
        assert!((r.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((r.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((r.accuracy - 0.5).abs() < 1e-12);
        assert!((r.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.support, 3);
    }

    #[test]
    fn test_zero_denominators() {
        let r = row(0, 0, 0);
        assert_eq!(r.scores(), MetricScores::default());
        let only_fp = row(0, 3, 0);
        assert_eq!(only_fp.precision, 0.0);
        assert_eq!(only_fp.recall, 0.0);
        assert_eq!(only_fp.f1, 0.0);
        assert!(!only_fp.f1.is_nan());
    }

    #[test]
    fn test_macro_skips_zero_support() {
        let rows = [row(1, 0, 0), row(0, 5, 0)];
        let m = macro_average(&rows);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.f1, 1.0);
    }

    #[test]
    fn test_micro_pools_zero_support_groups() {
        let rows = [row(1, 0, 0), row(0, 1, 0)];
        let m = micro_average(&rows);
        assert!((m.precision - 0.5).abs() < 1e-12);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn test_weighted_by_support() {
        let rows = [row(3, 0, 1), row(0, 0, 1)];
        let w = weighted_average(&rows);
        // recall 0.75 with support 4, recall 0 with support 1
        assert!((w.recall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rows() {
        let avg = AveragedMetrics::from_rows(&[]);
        assert_eq!(avg, AveragedMetrics::default());
    }

    #[test]
    fn test_accuracy_score() {
        let true_labels = vec!["CR", "PR", "SD", "SD"];
        let pred_labels = vec!["CR", "SD", "SD", "PD"];
        assert!((accuracy_score(&true_labels, &pred_labels).unwrap() - 0.5).abs() < 1e-12);

        let empty: Vec<&str> = vec![];
        assert!(accuracy_score(&empty, &empty).is_err());
        assert!(accuracy_score(&true_labels, &pred_labels[..2]).is_err());
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!(MetricKind::parse("F1-Score"), Some(MetricKind::F1));
        assert_eq!(MetricKind::parse("precision"), Some(MetricKind::Precision));
        assert_eq!(MetricKind::parse("auc"), None);
    }
}
