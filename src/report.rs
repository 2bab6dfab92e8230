//! Evaluation export
//!
//! An [`EvaluationReport`] is exported as labelled blocks of rows: the
//! model name, the timeline averages, the per-event table and, when RECIST
//! pairs exist, the RECIST averages and per-class table. The same layout is
//! read back by [`parse_exported_grid`] so that previously exported runs can
//! be compared.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::evaluation::{EvaluationReport, EventMetricRow};
use crate::io::{self, Cell, Grid};
use crate::metrics::{AveragedMetrics, MetricRow, MetricScores};

/// Sheet name of XLSX exports
pub const EXPORT_SHEET_NAME: &str = "evaluation";

pub const TIMELINE_AVERAGES_TITLE: &str = "TIMELINE OVERALL AVERAGES";
pub const TIMELINE_PER_EVENT_TITLE: &str = "TIMELINE PER-EVENT METRICS";
pub const RECIST_AVERAGES_TITLE: &str = "RECIST OVERALL AVERAGES";
pub const RECIST_PER_CLASS_TITLE: &str = "RECIST PER-CLASS METRICS";

const SECTION_TITLES: [&str; 4] = [
    TIMELINE_AVERAGES_TITLE,
    TIMELINE_PER_EVENT_TITLE,
    RECIST_AVERAGES_TITLE,
    RECIST_PER_CLASS_TITLE,
];

lazy_static! {
    static ref MODEL_LINE: Regex = Regex::new(r"(?i)^model\s*(?::|\s-)\s*(.+)$").unwrap();
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn blank_row() -> Vec<Cell> {
    vec![Cell::Empty]
}

fn score_cells(label: &str, scores: &MetricScores, decimals: u32) -> Vec<Cell> {
    vec![
        Cell::text(label),
        round_to(scores.accuracy, decimals).into(),
        round_to(scores.precision, decimals).into(),
        round_to(scores.recall, decimals).into(),
        round_to(scores.f1, decimals).into(),
    ]
}

fn average_rows(averages: &AveragedMetrics, suffix: &str, decimals: u32) -> Vec<Vec<Cell>> {
    vec![
        score_cells(&format!("Macro avg{}", suffix), &averages.macro_avg, decimals),
        score_cells(&format!("Micro avg{}", suffix), &averages.micro, decimals),
        score_cells(&format!("Weighted avg{}", suffix), &averages.weighted, decimals),
    ]
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|&n| Cell::text(n)).collect()
}

impl EvaluationReport {
    /// Export rows with scores rounded to `decimals` places
    pub fn to_export_rows(&self, decimals: u32) -> Vec<Vec<Cell>> {
        let mut rows = Vec::new();

        rows.push(vec![match &self.model_name {
            Some(name) => Cell::text(name.as_str()),
            None => Cell::Empty,
        }]);

        rows.push(vec![Cell::text(TIMELINE_AVERAGES_TITLE)]);
        rows.push(header(&["Metric", "Accuracy", "Precision", "Recall", "F1-Score"]));
        rows.extend(average_rows(&self.timeline_averages, " overall", decimals));
        rows.push(blank_row());

        rows.push(vec![Cell::text(TIMELINE_PER_EVENT_TITLE)]);
        rows.push(header(&[
            "Event",
            "TP",
            "FP",
            "FN",
            "Support",
            "Accuracy",
            "Precision",
            "Recall",
            "F1-Score",
        ]));
        for e in &self.per_event {
            let m = &e.metrics;
            rows.push(vec![
                Cell::text(e.event.as_str()),
                m.tp.into(),
                m.fp.into(),
                m.fn_.into(),
                m.support.into(),
                round_to(m.accuracy, decimals).into(),
                round_to(m.precision, decimals).into(),
                round_to(m.recall, decimals).into(),
                round_to(m.f1, decimals).into(),
            ]);
        }
        rows.push(blank_row());

        if let Some(recist) = &self.recist {
            rows.push(vec![Cell::text(RECIST_AVERAGES_TITLE)]);
            rows.push(header(&["Metric", "Accuracy", "Precision", "Recall", "F1-Score"]));
            rows.extend(average_rows(&recist.averages, "", decimals));
            rows.push(blank_row());

            rows.push(vec![Cell::text(RECIST_PER_CLASS_TITLE)]);
            rows.push(header(&[
                "Label",
                "Accuracy",
                "Precision",
                "Recall",
                "F1-Score",
                "Support",
            ]));
            for class in &recist.per_class {
                let m = &class.metrics;
                rows.push(vec![
                    Cell::text(class.label.as_str()),
                    round_to(m.accuracy, decimals).into(),
                    round_to(m.precision, decimals).into(),
                    round_to(m.recall, decimals).into(),
                    round_to(m.f1, decimals).into(),
                    m.support.into(),
                ]);
            }
            rows.push(blank_row());
        }

        rows
    }

    /// Write the export rows to a CSV or XLSX file
    pub fn write_export<P: AsRef<Path>>(&self, path: P, decimals: u32) -> Result<()> {
        let path = path.as_ref();
        io::write_rows(path, &self.to_export_rows(decimals), EXPORT_SHEET_NAME)?;
        log::info!("Exported evaluation of {} to {}", self.display_name(), path.display());
        Ok(())
    }
}

/// Scores read back from an exported evaluation sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEvaluation {
    pub model_name: String,
    pub events: Vec<EventMetricRow>,
    /// Weighted RECIST averages, zero when the sheet has no RECIST block
    pub recist_weighted: MetricScores,
}

impl ExportedEvaluation {
    /// Read an exported sheet; the file stem names the model when the sheet does not
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let grid = io::read_grid(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");
        Ok(parse_exported_grid(&grid, stem))
    }

    pub fn event(&self, event: &str) -> Option<&EventMetricRow> {
        self.events.iter().find(|e| e.event == event)
    }
}

impl From<&EvaluationReport> for ExportedEvaluation {
    fn from(report: &EvaluationReport) -> Self {
        ExportedEvaluation {
            model_name: report.display_name().to_string(),
            events: report.per_event.clone(),
            recist_weighted: report
                .recist
                .as_ref()
                .map(|r| r.averages.weighted)
                .unwrap_or_default(),
        }
    }
}

/// Parse a number cell, accepting a decimal comma; anything else is 0
pub fn parse_number(cell: &str) -> f64 {
    cell.trim()
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn joined_lower(row: &[String]) -> String {
    row.iter()
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_section_title(cell: &str) -> bool {
    SECTION_TITLES
        .iter()
        .any(|title| cell.trim().eq_ignore_ascii_case(title))
}

/// Model name from the first three rows of an exported sheet
fn exported_model_name(grid: &[Vec<String>]) -> Option<String> {
    for row in grid.iter().take(3) {
        let line: Vec<&str> = row.iter().map(|c| c.trim()).collect();
        if let Some(caps) = MODEL_LINE.captures(&line.join(" ")) {
            let name = caps[1].trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        match line.first() {
            Some(first) if is_section_title(first) => break,
            Some(first) if !first.is_empty() => return Some(first.to_string()),
            _ => {}
        }
    }
    None
}

fn parse_per_event(grid: &[Vec<String>]) -> Vec<EventMetricRow> {
    let start = match grid
        .iter()
        .position(|row| joined_lower(row).contains("per-event metrics"))
    {
        Some(i) => i + 1,
        None => return Vec::new(),
    };
    let header: Vec<String> = match grid.get(start) {
        Some(row) => row.iter().map(|c| c.trim().to_lowercase()).collect(),
        None => return Vec::new(),
    };
    let column = |name: &str| header.iter().position(|h| h == name);
    let event_col = column("event");
    let cols = [
        "tp",
        "fp",
        "fn",
        "support",
        "accuracy",
        "precision",
        "recall",
        "f1-score",
    ]
    .map(column);

    let mut events = Vec::new();
    for row in grid.iter().skip(start + 1) {
        // CSV readers drop blank lines, so the next title also ends the block
        if is_blank(row) || row.first().map_or(false, |c| is_section_title(c)) {
            break;
        }
        let name = event_col
            .and_then(|i| row.get(i))
            .map(|c| c.trim())
            .unwrap_or("");
        if name.is_empty() {
            continue;
        }
        let pick = |i: usize| {
            cols[i]
                .and_then(|c| row.get(c))
                .map(|v| parse_number(v))
                .unwrap_or(0.0)
        };
        let count = |i: usize| pick(i).max(0.0).round() as usize;

        let metrics = MetricRow {
            tp: count(0),
            fp: count(1),
            fn_: count(2),
            support: count(3),
            accuracy: pick(4),
            precision: pick(5),
            recall: pick(6),
            f1: pick(7),
        };
        events.push(EventMetricRow {
            event: name.to_string(),
            metrics,
        });
    }
    events
}

fn parse_recist_weighted(grid: &[Vec<String>]) -> MetricScores {
    let start = match grid
        .iter()
        .position(|row| joined_lower(row).contains("recist overall averages"))
    {
        Some(i) => i + 1,
        None => return MetricScores::default(),
    };

    grid.iter()
        .skip(start)
        .take(4)
        .find(|row| {
            row.first()
                .map(|c| c.trim().to_lowercase().starts_with("weighted"))
                .unwrap_or(false)
        })
        .map(|row| {
            let value = |i: usize| row.get(i).map(|c| parse_number(c)).unwrap_or(0.0);
            MetricScores {
                accuracy: value(1),
                precision: value(2),
                recall: value(3),
                f1: value(4),
            }
        })
        .unwrap_or_default()
}

/// Read an exported evaluation grid
///
/// Per-event rows are read under the `per-event metrics` header up to the
/// first blank row or section title; missing columns read as 0.
pub fn parse_exported_grid(grid: &[Vec<String>], fallback_name: &str) -> ExportedEvaluation {
    let model_name = exported_model_name(grid).unwrap_or_else(|| fallback_name.to_string());
    ExportedEvaluation {
        model_name,
        events: parse_per_event(grid),
        recist_weighted: parse_recist_weighted(grid),
    }
}

/// Render export rows as a string grid, as a reader would see them
pub fn rows_to_grid(rows: &[Vec<Cell>]) -> Grid {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}
