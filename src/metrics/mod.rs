//! Evaluation metrics
//!
//! `classification` turns TP/FP/FN counts into scores and averages them;
//! `recist` builds the RECIST confusion matrix on top of it. `eligibility`
//! and `ranking` score trial-matching output.

pub mod classification;
pub mod eligibility;
pub mod ranking;
pub mod recist;

pub use classification::{
    accuracy_score, macro_average, micro_average, safe_ratio, weighted_average, AveragedMetrics,
    Counts, MetricKind, MetricRow, MetricScores,
};
pub use eligibility::{BinaryCounts, Eligibility, EligibilityScores};
pub use ranking::{
    confidence_separation, false_positive_rate, rank_trials, top_k_hit, triage_distribution,
    TrialPrediction,
};
pub use recist::{ClassMetricRow, ConfusionMatrix, RecistPair, RecistSummary};
