//! Trial eligibility classification metrics
//!
//! Binary confusion counts over `eligible` / `not_eligible` decisions and
//! the screening scores built on them. `unknown` on either side keeps a
//! pair out of the counts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::classification::{safe_ratio, Counts};

/// Eligibility decision for one patient and trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    NotEligible,
    Unknown,
    Eligible,
}

impl Eligibility {
    /// Parse `eligible`, `not_eligible` (or `not eligible`, `not-eligible`)
    /// and `unknown`, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "eligible" => Some(Eligibility::Eligible),
            "not_eligible" | "ineligible" => Some(Eligibility::NotEligible),
            "unknown" => Some(Eligibility::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::NotEligible => "not_eligible",
            Eligibility::Unknown => "unknown",
        }
    }

    /// Ranking priority: eligible before unknown before not eligible
    pub fn priority(&self) -> u8 {
        match self {
            Eligibility::Eligible => 2,
            Eligibility::Unknown => 1,
            Eligibility::NotEligible => 0,
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TP / FP / TN / FN with `eligible` as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl BinaryCounts {
    /// Count `(ground_truth, predicted)` pairs
    pub fn from_pairs(pairs: &[(Eligibility, Eligibility)]) -> Self {
        let mut counts = BinaryCounts::default();
        for &(gt, pred) in pairs {
            counts.record(gt, pred);
        }
        counts
    }

    pub fn record(&mut self, ground_truth: Eligibility, predicted: Eligibility) {
        use Eligibility::*;
        match (ground_truth, predicted) {
            (Eligible, Eligible) => self.tp += 1,
            (NotEligible, Eligible) => self.fp += 1,
            (NotEligible, NotEligible) => self.tn += 1,
            (Eligible, NotEligible) => self.fn_ += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// The positive-class triple, dropping true negatives
    pub fn positive_counts(&self) -> Counts {
        Counts::new(self.tp, self.fp, self.fn_)
    }
}

/// Screening scores of a [`BinaryCounts`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityScores {
    #[serde(flatten)]
    pub counts: BinaryCounts,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub f1: f64,
}

impl EligibilityScores {
    pub fn from_counts(counts: BinaryCounts) -> Self {
        let tp = counts.tp as f64;
        let fp = counts.fp as f64;
        let tn = counts.tn as f64;
        let fn_ = counts.fn_ as f64;

        let sensitivity = safe_ratio(tp, tp + fn_);
        let specificity = safe_ratio(tn, tn + fp);
        let precision = safe_ratio(tp, tp + fp);
        let f1 = safe_ratio(2.0 * precision * sensitivity, precision + sensitivity);

        EligibilityScores {
            counts,
            sensitivity,
            specificity,
            precision,
            f1,
        }
    }

    pub fn from_pairs(pairs: &[(Eligibility, Eligibility)]) -> Self {
        Self::from_counts(BinaryCounts::from_pairs(pairs))
    }
}
