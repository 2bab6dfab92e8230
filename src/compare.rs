//! Multi-model comparison
//!
//! Builds a model × event score table from several evaluations, either read
//! back from exported sheets or computed in parallel against one ground
//! truth. The last column holds each model's weighted RECIST score.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::evaluation::{EvaluationReport, EvaluationRun};
use crate::io::Cell;
use crate::metrics::MetricKind;
use crate::record::{compare_labels, NormalizedRecord};
use crate::report::{round_to, ExportedEvaluation};

/// Header of the trailing RECIST column
pub const RECIST_COLUMN_LABEL: &str = "Risposta RECIST";

/// Fewest models a comparison accepts
pub const MIN_MODELS: usize = 2;

/// Display label for a timeline event, used in table headers
pub fn pretty_event_label(event: &str) -> String {
    let s = event.to_lowercase();
    let rules: [(bool, &str); 8] = [
        (s.contains("evidenze di discontinuit"), "Discontinuità"),
        (s.contains("avvio del trattamento di iii linea"), "Avvio III linea"),
        (s.contains("inizio del trattamento di i linea"), "Inizio I linea"),
        (s.contains("inizio del trattamento di ii linea"), "Inizio II linea"),
        (s.contains("inizio del trattamento di iii linea"), "Inizio III linea"),
        (s.contains("biopsia"), "Biopsia/Agobiopsia"),
        (s.contains("diagnosi"), "Diagnosi"),
        (s.contains("tc") && s.contains("torace"), "TC torace/total body"),
    ];
    rules
        .iter()
        .find(|(hit, _)| *hit)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| event.to_string())
}

/// Compact label for a timeline event, used for chart axes
pub fn short_event_label(event: &str) -> String {
    let s = event.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| s.contains(n));

    let label = if any(&["biopsia"]) {
        "Biopsia"
    } else if any(&["diagnosi"]) {
        "Diagnosi"
    } else if any(&["discontinuit"]) {
        "Discontinuità"
    } else if any(&[" i linea", " i°", " 1°"]) {
        "I linea"
    } else if any(&[" ii linea", " ii°", " 2°"]) {
        "II linea"
    } else if any(&[" iii linea", " iii°", " 3°"]) {
        "III linea"
    } else if any(&["tc", "tac"]) {
        "TC"
    } else {
        return event.to_string();
    };
    label.to_string()
}

/// Header for a comparison column: the RECIST column is kept as is, event
/// columns get the short or the pretty label
pub fn column_label(column: &str, short: bool) -> String {
    if column == RECIST_COLUMN_LABEL {
        column.to_string()
    } else if short {
        short_event_label(column)
    } else {
        pretty_event_label(column)
    }
}

/// One model's row of a rendered comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    pub values: Vec<f64>,
}

/// Comparison table rendered for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    pub metric: MetricKind,
    /// Event labels followed by [`RECIST_COLUMN_LABEL`]
    pub columns: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

/// Scores of several models over the union of their events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    models: Vec<ExportedEvaluation>,
    events: Vec<String>,
}

impl ComparisonTable {
    /// Build a table from 2..=`max_models` evaluations
    ///
    /// Models beyond the cap are ignored with a warning.
    pub fn new(mut models: Vec<ExportedEvaluation>, max_models: usize) -> Result<Self> {
        if models.len() > max_models {
            log::warn!(
                "Comparing the first {} of {} models; the rest are ignored",
                max_models,
                models.len()
            );
            models.truncate(max_models);
        }
        if models.len() < MIN_MODELS {
            return Err(Error::InvalidInput(format!(
                "at least {} models are needed for a comparison, got {}",
                MIN_MODELS,
                models.len()
            )));
        }

        let unique: BTreeSet<&str> = models
            .iter()
            .flat_map(|m| m.events.iter().map(|e| e.event.as_str()))
            .collect();
        let mut events: Vec<String> = unique.into_iter().map(str::to_string).collect();
        events.sort_by(|a, b| compare_labels(a, b));

        Ok(ComparisonTable { models, events })
    }

    /// Build a table from fresh evaluation reports
    pub fn from_reports(reports: &[EvaluationReport], max_models: usize) -> Result<Self> {
        Self::new(reports.iter().map(ExportedEvaluation::from).collect(), max_models)
    }

    /// Read exported evaluation sheets and build a table
    ///
    /// Files that fail to parse are skipped with a warning; the remaining
    /// ones must still number at least two.
    pub fn from_files<P: AsRef<Path>>(paths: &[P], max_models: usize) -> Result<Self> {
        if paths.len() < MIN_MODELS {
            return Err(Error::InvalidInput(format!(
                "at least {} evaluation files are needed, got {}",
                MIN_MODELS,
                paths.len()
            )));
        }
        if paths.len() > max_models {
            log::warn!("Only the first {} evaluation files are compared", max_models);
        }

        let mut models = Vec::new();
        for path in paths.iter().take(max_models) {
            match ExportedEvaluation::from_file(path) {
                Ok(model) => models.push(model),
                Err(e) => log::warn!("Skipping {}: {}", path.as_ref().display(), e),
            }
        }
        Self::new(models, max_models)
    }

    pub fn models(&self) -> &[ExportedEvaluation] {
        &self.models
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.model_name.as_str()).collect()
    }

    /// Event columns, without the RECIST column
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// All column labels, the RECIST column last
    pub fn columns(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(RECIST_COLUMN_LABEL))
            .collect()
    }

    /// Score of one model for a column; 0 when the model lacks the event
    pub fn value(&self, model: usize, column: &str, metric: MetricKind) -> f64 {
        let model = match self.models.get(model) {
            Some(m) => m,
            None => return 0.0,
        };
        let value = if column == RECIST_COLUMN_LABEL {
            model.recist_weighted.get(metric)
        } else {
            model
                .event(column)
                .map(|e| e.metrics.scores().get(metric))
                .unwrap_or(0.0)
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Render the table for one metric
    pub fn matrix(&self, metric: MetricKind) -> ComparisonMatrix {
        let columns = self.columns();
        let rows = self
            .models
            .iter()
            .enumerate()
            .map(|(i, m)| ComparisonRow {
                model: m.model_name.clone(),
                values: columns.iter().map(|c| self.value(i, c, metric)).collect(),
            })
            .collect();

        ComparisonMatrix {
            metric,
            columns: columns.into_iter().map(str::to_string).collect(),
            rows,
        }
    }

    /// Rows for a sheet: a header with display labels, then one row per model
    pub fn to_export_rows(&self, metric: MetricKind, decimals: u32) -> Vec<Vec<Cell>> {
        let matrix = self.matrix(metric);

        let mut header = vec![Cell::text("Model \\ Event")];
        header.extend(matrix.columns.iter().map(|c| Cell::text(pretty_event_label(c))));

        let mut rows = vec![header];
        for row in &matrix.rows {
            let mut cells = vec![Cell::text(row.model.as_str())];
            cells.extend(row.values.iter().map(|&v| Cell::from(round_to(v, decimals))));
            rows.push(cells);
        }
        rows
    }
}

/// Score several prediction sets against one ground truth in parallel
///
/// Each entry is `(model name, prediction records)`. Any failing run fails
/// the whole batch.
pub fn evaluate_models(
    run: &EvaluationRun,
    models: &[(String, Vec<NormalizedRecord>)],
    ground_truth: &[NormalizedRecord],
) -> Result<Vec<EvaluationReport>> {
    log::info!("Evaluating {} models", models.len());
    models
        .par_iter()
        .map(|(name, predictions)| {
            run.clone()
                .with_model_name(name.as_str())
                .evaluate_records(predictions, ground_truth)
        })
        .collect()
}
