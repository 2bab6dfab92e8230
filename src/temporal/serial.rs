//! Spreadsheet date serials (1900 date system)

use chrono::{Duration, NaiveDate};

/// Smallest serial (exclusive) treated as a date rather than a plain number
pub const MIN_DATE_SERIAL: f64 = 59.0;

/// Largest serial (exclusive) treated as a date rather than a plain number
pub const MAX_DATE_SERIAL: f64 = 60000.0;

/// Whether a number falls inside the range accepted as a date serial
pub fn is_plausible_serial(value: f64) -> bool {
    value.is_finite() && value > MIN_DATE_SERIAL && value < MAX_DATE_SERIAL
}

/// Decode a serial into `YYYY-MM-DD`
///
/// The fractional part is the time of day and is dropped. Serial 60 is the
/// 1900-02-29 that spreadsheet programs inherited from Lotus 1-2-3; it has
/// no `NaiveDate` so it is rendered directly.
pub fn serial_to_iso(value: f64) -> Option<String> {
    if !is_plausible_serial(value) {
        return None;
    }

    let days = value.floor() as i64;
    if days == 60 {
        return Some("1900-02-29".to_string());
    }

    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    epoch
        .checked_add_signed(Duration::days(days))
        .map(|d| d.format("%Y-%m-%d").to_string())
}
