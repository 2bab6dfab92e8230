//! Date handling for uploaded evaluation sheets
//!
//! Sheets arrive with dates in whatever shape the spreadsheet or the
//! extraction model produced: ISO strings, spreadsheet serials, date-times
//! or free text. [`DateNormalizer`] resolves them to `YYYY-MM-DD` where it
//! can and leaves the raw string untouched where it cannot. The matcher only
//! needs month granularity, exposed through [`MonthIndex`].

mod month;
pub mod serial;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

pub use self::month::MonthIndex;
pub use self::serial::serial_to_iso;

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{2})-\d{2}$").unwrap();
    static ref YEAR_MONTH_FRAGMENT: Regex = Regex::new(r"(\d{4})[-/.](\d{1,2})").unwrap();
    static ref MONTH_ONLY: Regex = Regex::new(r"^(\d{4}[-/]\d{1,2}|[A-Za-z]+ \d{4})$").unwrap();
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const UNAMBIGUOUS_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%a %b %d %Y",
];

const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];

const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Whether `s` is already a `YYYY-MM-DD` string
pub fn is_iso_date(s: &str) -> bool {
    ISO_DATE.is_match(s)
}

/// Resolves raw date cells to `YYYY-MM-DD` and month indices
#[derive(Debug, Clone, Copy, Default)]
pub struct DateNormalizer {
    day_first: bool,
}

impl DateNormalizer {
    /// Create a normalizer; `day_first` selects `d/m/Y` for slash dates
    pub fn new(day_first: bool) -> Self {
        DateNormalizer { day_first }
    }

    /// Normalize a raw date cell
    ///
    /// Order: ISO passthrough, spreadsheet serial, generic parse. Anything
    /// else comes back trimmed but otherwise unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        let s = raw.trim();
        if is_iso_date(s) {
            return s.to_string();
        }

        if let Ok(number) = s.parse::<f64>() {
            if let Some(iso) = serial_to_iso(number) {
                return iso;
            }
        }

        match self.parse(s) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => s.to_string(),
        }
    }

    /// Generic parse of a free-form date string
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.date_naive());
        }
        for fmt in DATE_TIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }

        let slash_formats = if self.day_first {
            DAY_FIRST_FORMATS
        } else {
            MONTH_FIRST_FORMATS
        };
        for fmt in UNAMBIGUOUS_DATE_FORMATS.iter().chain(slash_formats) {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        // Month-only values resolve to the first of the month
        if !MONTH_ONLY.is_match(s) {
            return None;
        }
        let first_of_month = format!("{}-01", s);
        for fmt in ["%Y-%m-%d", "%Y/%m-%d", "%B %Y-%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(&first_of_month, fmt) {
                return Some(date);
            }
        }

        None
    }

    /// Month index of a (normalized or raw) date value
    ///
    /// Falls back to the first `YYYY-M` / `YYYY/M` / `YYYY.M` fragment found
    /// in the string, so partially parseable values still land in a month.
    pub fn month_index(&self, value: &str) -> Option<MonthIndex> {
        let s = value.trim();

        if let Some(caps) = ISO_DATE.captures(s) {
            let year = caps[1].parse::<i32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            return Some(MonthIndex::from_year_month(year, month));
        }

        if let Some(date) = self.parse(s) {
            return Some(MonthIndex::from_year_month(date.year(), date.month()));
        }

        if let Some(iso) = s.parse::<f64>().ok().and_then(serial_to_iso) {
            return self.month_index(&iso);
        }

        let caps = YEAR_MONTH_FRAGMENT.captures(s)?;
        let year = caps[1].parse::<i32>().ok()?;
        let month = caps[2].parse::<u32>().ok()?;
        Some(MonthIndex::from_year_month(year, month))
    }
}
