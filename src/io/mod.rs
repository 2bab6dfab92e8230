//! Sheet input and output
//!
//! Sheets are handled as plain grids of trimmed string cells so that the
//! normalizer can search for the header line itself. CSV is always
//! available; XLSX needs the `excel` feature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;

pub use self::csv::{read_csv_grid, write_csv_rows};
#[cfg(feature = "excel")]
pub use self::excel::{read_excel_grid, write_excel_rows};

/// Rows of string cells, as read from a sheet
pub type Grid = Vec<Vec<String>>;

/// One cell of an exported sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Number(v as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => Ok(()),
        }
    }
}

/// Sheet file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    /// Format from the file extension (`csv`/`tsv`/`txt`, `xlsx`/`xls`/`xlsm`/`ods`)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "tsv" | "txt" => Ok(SheetFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(SheetFormat::Xlsx),
            other => Err(Error::UnsupportedFormat(format!(
                "sheet file extension '{}' ({})",
                other,
                path.display()
            ))),
        }
    }

    /// Format for a file about to be written: only `csv` and `xlsx`
    ///
    /// The writers produce comma-separated text or an XLSX workbook, so any
    /// other extension would mislabel the bytes.
    pub fn for_output(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "xlsx" => Ok(SheetFormat::Xlsx),
            other => Err(Error::UnsupportedFormat(format!(
                "output extension '{}' ({}); write .csv or .xlsx",
                other,
                path.display()
            ))),
        }
    }
}

/// Read the first sheet of a file as a grid
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    match SheetFormat::from_path(path)? {
        SheetFormat::Csv => read_csv_grid(path),
        SheetFormat::Xlsx => read_workbook(path),
    }
}

/// Write exported rows, choosing the format from the file extension
pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[Vec<Cell>], sheet_name: &str) -> Result<()> {
    let path = path.as_ref();
    match SheetFormat::for_output(path)? {
        SheetFormat::Csv => write_csv_rows(path, rows),
        SheetFormat::Xlsx => write_workbook(path, rows, sheet_name),
    }
}

#[cfg(feature = "excel")]
fn read_workbook(path: &Path) -> Result<Grid> {
    read_excel_grid(path)
}

#[cfg(not(feature = "excel"))]
fn read_workbook(path: &Path) -> Result<Grid> {
    Err(excel_disabled(path))
}

#[cfg(feature = "excel")]
fn write_workbook(path: &Path, rows: &[Vec<Cell>], sheet_name: &str) -> Result<()> {
    write_excel_rows(path, rows, sheet_name)
}

#[cfg(not(feature = "excel"))]
fn write_workbook(path: &Path, _rows: &[Vec<Cell>], _sheet_name: &str) -> Result<()> {
    Err(excel_disabled(path))
}

#[cfg(not(feature = "excel"))]
fn excel_disabled(path: &Path) -> Error {
    Error::UnsupportedFormat(format!(
        "{}: spreadsheet support requires the `excel` feature",
        path.display()
    ))
}
