use serde::{Deserialize, Serialize};
use std::fmt;

/// Linear month index: `year * 12 + month - 1`
///
/// Two dates fall in the same calendar month exactly when their indices are
/// equal, and consecutive months differ by one across year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthIndex(i32);

impl MonthIndex {
    /// Build from a year and a 1-based month number
    pub fn from_year_month(year: i32, month: u32) -> Self {
        MonthIndex(year * 12 + month as i32 - 1)
    }

    /// Raw linear value
    pub fn value(&self) -> i32 {
        self.0
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.0.div_euclid(12)
    }

    /// 1-based month number
    pub fn month(&self) -> u32 {
        (self.0.rem_euclid(12) + 1) as u32
    }

    /// Index shifted by `months` (negative moves backwards)
    pub fn offset(&self, months: i32) -> Self {
        MonthIndex(self.0 + months)
    }
}

impl fmt::Display for MonthIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
