//! Row normalizer
//!
//! Turns a sheet grid (rows of string cells, as produced by [`crate::io`])
//! into [`NormalizedRecord`]s. Sheets exported by the extraction front-end
//! may carry metadata above the header (typically a single cell naming the
//! model), so the header line is searched for rather than assumed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::EvaluationConfig;
use crate::record::NormalizedRecord;
use crate::temporal::DateNormalizer;

/// Column names accepted for the identifier
pub const ID_ALIASES: &[&str] = &["id", "patient", "#"];

/// Column names accepted for free report text
pub const TEXT_ALIASES: &[&str] = &["report", "text"];

/// Date column
pub const DATE_COLUMN: &str = "data";

/// Event label column
pub const EVENT_COLUMN: &str = "testo";

/// RECIST response column
pub const RECIST_COLUMN: &str = "risposta_recist";

/// A sheet row keyed by lower-cased, trimmed column name
pub type RawRow = HashMap<String, String>;

/// Lower-case and trim a column name
pub fn column_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// First non-empty value among the given column aliases
pub fn lookup<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Model name held in the first cell of the first row, if any
///
/// A first cell mentioning `id`, or equal to any identifier alias, is taken
/// to be a header, not a name.
pub fn detect_model_name(grid: &[Vec<String>]) -> Option<String> {
    let first = grid.first()?.first()?.trim();
    let key = column_key(first);
    if first.is_empty() || key.contains("id") || ID_ALIASES.contains(&key.as_str()) {
        return None;
    }
    Some(first.to_string())
}

/// Index of the header row within the first `scan_rows` rows
pub fn find_header_row(grid: &[Vec<String>], scan_rows: usize) -> Option<usize> {
    grid.iter().take(scan_rows).position(|row| {
        let cells: Vec<String> = row.iter().map(|c| column_key(c)).collect();
        let has = |name: &str| cells.iter().any(|c| c == name);
        ID_ALIASES.iter().any(|alias| has(alias)) && has(DATE_COLUMN) && has(EVENT_COLUMN)
    })
}

/// Key every row below `header_index` by the header's column names
pub fn rows_from_grid(grid: &[Vec<String>], header_index: usize) -> Vec<RawRow> {
    let header: Vec<String> = match grid.get(header_index) {
        Some(row) => row.iter().map(|c| column_key(c)).collect(),
        None => return Vec::new(),
    };

    grid.iter()
        .skip(header_index + 1)
        .map(|row| {
            header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Outcome of normalizing one sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedSheet {
    /// Model name found above the header
    pub model_name: Option<String>,
    /// Grid row holding the header, `None` when no header was found
    pub header_row: Option<usize>,
    /// Usable records in sheet order
    pub records: Vec<NormalizedRecord>,
    /// Body rows dropped for a missing id or event label
    pub dropped_rows: usize,
}

impl NormalizedSheet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Converts raw rows into normalized records
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    dates: DateNormalizer,
    header_scan_rows: usize,
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

impl RowNormalizer {
    pub fn new(config: &EvaluationConfig) -> Self {
        RowNormalizer {
            dates: DateNormalizer::new(config.day_first),
            header_scan_rows: config.header_scan_rows,
        }
    }

    /// Date normalizer used for the `data` column
    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    /// Normalize one raw row; `None` when the id or event label is missing
    pub fn normalize_row(&self, row: &RawRow) -> Option<NormalizedRecord> {
        let id = lookup(row, ID_ALIASES)?;
        let event = lookup(row, &[EVENT_COLUMN])?;
        let date = row
            .get(DATE_COLUMN)
            .map(|d| self.dates.normalize(d))
            .unwrap_or_default();
        let recist = row.get(RECIST_COLUMN).map(String::as_str).unwrap_or("");

        Some(NormalizedRecord::new(id, date, event).with_recist(recist))
    }

    /// Normalize rows, silently dropping those without id or event label
    pub fn normalize_rows(&self, rows: &[RawRow]) -> Vec<NormalizedRecord> {
        rows.iter().filter_map(|row| self.normalize_row(row)).collect()
    }

    /// Normalize a whole sheet grid
    ///
    /// A grid without a recognisable header yields an empty sheet rather than
    /// an error; the caller decides whether that is fatal.
    pub fn normalize_sheet(&self, grid: &[Vec<String>]) -> NormalizedSheet {
        let model_name = detect_model_name(grid);

        let header_row = match find_header_row(grid, self.header_scan_rows) {
            Some(index) => index,
            None => {
                log::warn!(
                    "No header row with id/data/testo in the first {} rows",
                    self.header_scan_rows
                );
                return NormalizedSheet {
                    model_name,
                    ..NormalizedSheet::default()
                };
            }
        };

        // A header on the first row leaves no room for a model-name row
        let model_name = if header_row == 0 { None } else { model_name };

        let rows = rows_from_grid(grid, header_row);
        let records = self.normalize_rows(&rows);
        let dropped_rows = rows.len() - records.len();
        log::debug!(
            "Normalized {} records (header at row {}, {} rows dropped)",
            records.len(),
            header_row,
            dropped_rows
        );

        NormalizedSheet {
            model_name,
            header_row: Some(header_row),
            records,
            dropped_rows,
        }
    }
}

/// A document row destined for feature or timeline extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub report: String,
}

/// Extract `{id, report}` rows from a document sheet
///
/// A leading row with a single non-empty cell is a model name and is
/// skipped. Rows without an identifier get `Row N` (1-based body position);
/// rows with blank report text are dropped.
pub fn report_rows(grid: &[Vec<String>]) -> Vec<ReportRow> {
    let single_cell = |row: &Vec<String>| row.iter().filter(|c| !c.trim().is_empty()).count() == 1;
    let header_index = match grid.first() {
        Some(first) if single_cell(first) && grid.len() > 1 => 1,
        Some(_) => 0,
        None => return Vec::new(),
    };

    rows_from_grid(grid, header_index)
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let report = lookup(row, TEXT_ALIASES)?;
            let id = lookup(row, ID_ALIASES)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Row {}", i + 1));
            Some(ReportRow {
                id,
                report: report.to_string(),
            })
        })
        .collect()
}
