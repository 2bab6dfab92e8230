//! RECIST confusion matrix and per-class metrics

use serde::{Deserialize, Serialize};

use super::classification::{accuracy_score, AveragedMetrics, Counts, MetricRow};
use crate::record::RecistLabel;

/// A matched imaging event's ground-truth and predicted RECIST labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecistPair {
    pub ground_truth: String,
    pub predicted: String,
}

impl RecistPair {
    pub fn new(ground_truth: impl Into<String>, predicted: impl Into<String>) -> Self {
        RecistPair {
            ground_truth: ground_truth.into(),
            predicted: predicted.into(),
        }
    }

    /// Both labels restricted to the RECIST set
    pub fn labels(&self) -> (RecistLabel, RecistLabel) {
        (
            RecistLabel::coerce(&self.ground_truth),
            RecistLabel::coerce(&self.predicted),
        )
    }
}

const N: usize = RecistLabel::ALL.len();

/// `counts[ground_truth][predicted]` over the five RECIST labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[usize; N]; N],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from comparison pairs, coercing unknown labels to `NE`
    pub fn from_pairs(pairs: &[RecistPair]) -> Self {
        let mut matrix = Self::new();
        for pair in pairs {
            let (gt, pred) = pair.labels();
            matrix.record(gt, pred);
        }
        matrix
    }

    pub fn record(&mut self, ground_truth: RecistLabel, predicted: RecistLabel) {
        self.counts[ground_truth.index()][predicted.index()] += 1;
    }

    pub fn get(&self, ground_truth: RecistLabel, predicted: RecistLabel) -> usize {
        self.counts[ground_truth.index()][predicted.index()]
    }

    /// Pairs whose ground truth is `label`
    pub fn row_total(&self, label: RecistLabel) -> usize {
        self.counts[label.index()].iter().sum()
    }

    /// Pairs predicted as `label`
    pub fn column_total(&self, label: RecistLabel) -> usize {
        self.counts.iter().map(|row| row[label.index()]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Pairs on the diagonal
    pub fn trace(&self) -> usize {
        (0..N).map(|i| self.counts[i][i]).sum()
    }

    /// Cell divided by its row total (0 for an empty row)
    pub fn normalized(&self, ground_truth: RecistLabel, predicted: RecistLabel) -> f64 {
        let row_total = self.row_total(ground_truth);
        if row_total == 0 {
            return 0.0;
        }
        self.get(ground_truth, predicted) as f64 / row_total as f64
    }

    /// One-vs-rest counts for a class
    pub fn class_counts(&self, label: RecistLabel) -> Counts {
        let tp = self.get(label, label);
        Counts::new(
            tp,
            self.column_total(label) - tp,
            self.row_total(label) - tp,
        )
    }

    /// Raw rows in [`RecistLabel::ALL`] order
    pub fn rows(&self) -> &[[usize; N]; N] {
        &self.counts
    }
}

/// Metrics of one RECIST class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetricRow {
    pub label: RecistLabel,
    #[serde(flatten)]
    pub metrics: MetricRow,
}

/// Confusion matrix, per-class rows and averages for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecistSummary {
    /// Number of comparison pairs
    pub pairs: usize,
    pub confusion: ConfusionMatrix,
    /// One row per label, zero-support classes included
    pub per_class: Vec<ClassMetricRow>,
    pub averages: AveragedMetrics,
    /// Share of pairs whose labels agree
    pub agreement: f64,
}

impl RecistSummary {
    pub fn from_pairs(pairs: &[RecistPair]) -> Self {
        let confusion = ConfusionMatrix::from_pairs(pairs);

        let (truth, predicted): (Vec<RecistLabel>, Vec<RecistLabel>) =
            pairs.iter().map(RecistPair::labels).unzip();
        let agreement = accuracy_score(&truth, &predicted).unwrap_or(0.0);

        Self::from_matrix(confusion, agreement)
    }

    fn from_matrix(confusion: ConfusionMatrix, agreement: f64) -> Self {
        let per_class: Vec<ClassMetricRow> = RecistLabel::ALL
            .iter()
            .map(|&label| ClassMetricRow {
                label,
                metrics: MetricRow::from_counts(confusion.class_counts(label)),
            })
            .collect();

        let rows: Vec<MetricRow> = per_class.iter().map(|c| c.metrics).collect();

        RecistSummary {
            pairs: confusion.total(),
            averages: AveragedMetrics::from_rows(&rows),
            per_class,
            confusion,
            agreement,
        }
    }

    pub fn class(&self, label: RecistLabel) -> &ClassMetricRow {
        &self.per_class[label.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_labels_coerced() {
        let m = ConfusionMatrix::from_pairs(&[
            RecistPair::new("CR", "progression"),
            RecistPair::new("??", "PD"),
        ]);
        assert_eq!(m.get(RecistLabel::CR, RecistLabel::NE), 1);
        assert_eq!(m.get(RecistLabel::NE, RecistLabel::PD), 1);
        assert_eq!(m.total(), 2);
    }

    #[test]
    fn test_normalized_rows() {
        let m = ConfusionMatrix::from_pairs(&[
            RecistPair::new("SD", "SD"),
            RecistPair::new("SD", "PD"),
            RecistPair::new("SD", "SD"),
            RecistPair::new("SD", "PD"),
        ]);
        assert_eq!(m.normalized(RecistLabel::SD, RecistLabel::PD), 0.5);
        assert_eq!(m.normalized(RecistLabel::CR, RecistLabel::CR), 0.0);
    }

    #[test]
    fn test_agreement() {
        let s = RecistSummary::from_pairs(&[
            RecistPair::new("CR", "CR"),
            RecistPair::new("PR", "SD"),
        ]);
        assert_eq!(s.agreement, 0.5);
        assert_eq!(s.pairs, 2);
        assert_eq!(s.per_class.len(), 5);
    }

    #[test]
    fn test_empty_pairs() {
        let s = RecistSummary::from_pairs(&[]);
        assert_eq!(s.pairs, 0);
        assert_eq!(s.agreement, 0.0);
        assert_eq!(s.averages, AveragedMetrics::default());
    }
}
