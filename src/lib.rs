//! Evaluation metrics for clinical timeline extraction
//!
//! Predicted timeline events are matched against ground truth per patient
//! and event label with a month tolerance, scored with precision, recall,
//! accuracy and F1 (macro, micro and weighted), and the RECIST responses of
//! matched imaging events are compared in a 5×5 confusion matrix.
//! Clinical-trial eligibility predictions are scored separately in
//! [`trials`].
//!
//! ```no_run
//! use clineval::{EvaluationConfig, EvaluationRun};
//!
//! let run = EvaluationRun::new(EvaluationConfig::default())?;
//! let report = run.evaluate_files("predictions.csv", "ground_truth.csv")?;
//! println!("micro F1: {:.4}", report.timeline_averages.micro.f1);
//! # Ok::<(), clineval::Error>(())
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_lifetimes)]

pub mod compare;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod matching;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod report;
pub mod temporal;
pub mod trials;

// Re-export commonly used types
pub use compare::{evaluate_models, ComparisonMatrix, ComparisonTable};
pub use config::{EvaluationConfig, EvaluationConfigBuilder};
pub use error::{Error, Result};
pub use evaluation::{EvaluationReport, EvaluationRun, EventMetricRow};
pub use matching::{match_events, EventMatcher, MatchOutcome, MatchPolicy};
pub use metrics::{
    AveragedMetrics, BinaryCounts, ConfusionMatrix, Counts, Eligibility, EligibilityScores,
    MetricKind, MetricRow, MetricScores, RecistPair, RecistSummary, TrialPrediction,
};
pub use normalize::{NormalizedSheet, RowNormalizer};
pub use record::{MatchKey, NormalizedRecord, RecistLabel};
pub use report::ExportedEvaluation;
pub use temporal::{DateNormalizer, MonthIndex};
pub use trials::{evaluate_trials, PatientTrials, TrialEvaluationReport, TrialLabel};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
