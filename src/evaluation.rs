//! Evaluation runs
//!
//! An [`EvaluationRun`] owns the configuration of one scoring pass and turns
//! prediction and ground-truth records into an [`EvaluationReport`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::EvaluationConfig;
use crate::error::{Error, Result};
use crate::io;
use crate::matching::{EventMatcher, MatchOutcome};
use crate::metrics::{AveragedMetrics, MetricRow, RecistSummary};
use crate::normalize::RowNormalizer;
use crate::record::NormalizedRecord;

/// Metrics of one event label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetricRow {
    pub event: String,
    #[serde(flatten)]
    pub metrics: MetricRow,
}

/// Result of scoring one prediction set against ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_name: Option<String>,
    pub tolerance_months: u32,
    /// Sums over all `(id, event)` keys
    pub overall: MetricRow,
    /// One row per event label, in collation order
    pub per_event: Vec<EventMetricRow>,
    pub timeline_averages: AveragedMetrics,
    /// `None` when no matched imaging event carried a comparable label
    pub recist: Option<RecistSummary>,
    pub dropped_predictions: usize,
    pub dropped_ground_truth: usize,
    pub unparsed_predictions: usize,
    pub unparsed_ground_truth: usize,
}

impl EvaluationReport {
    /// Build a report from a matcher outcome
    pub fn from_outcome(
        outcome: &MatchOutcome,
        model_name: Option<String>,
        tolerance_months: u32,
    ) -> Self {
        let per_event: Vec<EventMetricRow> = outcome
            .per_event
            .iter()
            .map(|e| EventMetricRow {
                event: e.event.clone(),
                metrics: MetricRow::from_counts(e.counts),
            })
            .collect();

        let rows: Vec<MetricRow> = per_event.iter().map(|e| e.metrics).collect();
        let timeline_averages = AveragedMetrics::with_pooled(&rows, outcome.overall);

        let recist = if outcome.recist_pairs.is_empty() {
            None
        } else {
            Some(RecistSummary::from_pairs(&outcome.recist_pairs))
        };

        EvaluationReport {
            model_name,
            tolerance_months,
            overall: MetricRow::from_counts(outcome.overall),
            per_event,
            timeline_averages,
            recist,
            dropped_predictions: outcome.dropped_predictions,
            dropped_ground_truth: outcome.dropped_ground_truth,
            unparsed_predictions: outcome.unparsed_predictions,
            unparsed_ground_truth: outcome.unparsed_ground_truth,
        }
    }

    /// Name used for display and export
    pub fn display_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or("Model")
    }

    pub fn event(&self, event: &str) -> Option<&EventMetricRow> {
        self.per_event.iter().find(|e| e.event == event)
    }
}

/// Caller-owned context of one evaluation
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    config: EvaluationConfig,
    model_name: Option<String>,
    matcher: EventMatcher,
    normalizer: RowNormalizer,
}

impl EvaluationRun {
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        let matcher = EventMatcher::from_config(&config)?;
        let normalizer = RowNormalizer::new(&config);
        Ok(EvaluationRun {
            config,
            model_name: None,
            matcher,
            normalizer,
        })
    }

    /// Name the model whose predictions are scored
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    /// Score normalized records
    ///
    /// # Errors
    /// * `EmptyData` when either side has no usable record
    /// * `NoOverlap` when the two sides share no identifier
    pub fn evaluate_records(
        &self,
        predictions: &[NormalizedRecord],
        ground_truth: &[NormalizedRecord],
    ) -> Result<EvaluationReport> {
        let pred_ids = usable_ids(predictions);
        if pred_ids.is_empty() {
            return Err(Error::EmptyData("predictions".to_string()));
        }
        let gt_ids = usable_ids(ground_truth);
        if gt_ids.is_empty() {
            return Err(Error::EmptyData("ground truth".to_string()));
        }
        if pred_ids.is_disjoint(&gt_ids) {
            return Err(Error::NoOverlap);
        }

        let outcome = self.matcher.match_events(predictions, ground_truth);

        if outcome.dropped_predictions > 0 || outcome.dropped_ground_truth > 0 {
            log::info!(
                "Ignored {} prediction and {} ground-truth events with unshared identifiers",
                outcome.dropped_predictions,
                outcome.dropped_ground_truth
            );
        }
        if outcome.unparsed_predictions > 0 || outcome.unparsed_ground_truth > 0 {
            log::warn!(
                "Skipped {} prediction and {} ground-truth events without a usable month",
                outcome.unparsed_predictions,
                outcome.unparsed_ground_truth
            );
        }

        let report = EvaluationReport::from_outcome(
            &outcome,
            self.model_name.clone(),
            self.config.tolerance_months,
        );
        log::info!(
            "Evaluated {}: precision={:.4} recall={:.4} f1={:.4}",
            report.display_name(),
            report.overall.precision,
            report.overall.recall,
            report.overall.f1
        );
        Ok(report)
    }

    /// Normalize two sheet grids and score them
    ///
    /// A model name found above the prediction header is used when the run
    /// has none.
    pub fn evaluate_sheets(
        &self,
        predictions: &[Vec<String>],
        ground_truth: &[Vec<String>],
    ) -> Result<EvaluationReport> {
        let pred_sheet = self.normalizer.normalize_sheet(predictions);
        let gt_sheet = self.normalizer.normalize_sheet(ground_truth);

        let mut report = self.evaluate_records(&pred_sheet.records, &gt_sheet.records)?;
        if report.model_name.is_none() {
            report.model_name = pred_sheet.model_name;
        }
        Ok(report)
    }

    /// Read two sheet files (CSV, or XLSX with the `excel` feature) and score them
    pub fn evaluate_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        predictions: P,
        ground_truth: Q,
    ) -> Result<EvaluationReport> {
        let pred_grid = io::read_grid(predictions.as_ref())?;
        let gt_grid = io::read_grid(ground_truth.as_ref())?;
        log::debug!(
            "Read {} prediction rows from {} and {} ground-truth rows from {}",
            pred_grid.len(),
            predictions.as_ref().display(),
            gt_grid.len(),
            ground_truth.as_ref().display()
        );
        self.evaluate_sheets(&pred_grid, &gt_grid)
    }
}

fn usable_ids(records: &[NormalizedRecord]) -> BTreeSet<&str> {
    records
        .iter()
        .filter(|r| r.is_usable())
        .map(|r| r.id.as_str())
        .collect()
}
