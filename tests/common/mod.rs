//! Shared helpers for the integration tests
//!
//! Sheets are written into a per-test temporary directory that is removed
//! when the [`SheetDir`] is dropped.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clineval::NormalizedRecord;

/// Temporary directory holding the sheets of one test
pub struct SheetDir {
    dir: tempfile::TempDir,
}

impl SheetDir {
    pub fn new() -> Self {
        SheetDir {
            dir: tempfile::Builder::new()
                .prefix("clineval_test_")
                .tempdir()
                .expect("Failed to create test directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file that does not exist yet
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `rows` as comma-separated lines
    pub fn write_csv(&self, name: &str, rows: &[&[&str]]) -> PathBuf {
        let path = self.file(name);
        let content: Vec<String> = rows.iter().map(|r| r.join(",")).collect();
        fs::write(&path, content.join("\n") + "\n").expect("Failed to write test CSV");
        path
    }
}

/// Record without a RECIST label
pub fn rec(id: &str, date: &str, event: &str) -> NormalizedRecord {
    NormalizedRecord::new(id, date, event)
}

/// Record carrying a RECIST label
pub fn rec_recist(id: &str, date: &str, event: &str, recist: &str) -> NormalizedRecord {
    NormalizedRecord::new(id, date, event).with_recist(recist)
}

/// Owned grid from string slices
pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

/// Float comparison with a fixed tolerance
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
