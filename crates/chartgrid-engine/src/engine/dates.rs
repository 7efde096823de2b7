//! Spreadsheet date serials.
//!
//! Spreadsheet files store dates as a day count where serial 1 is
//! 1900-01-01. The count inherits a historical defect: 1900 is treated as a
//! leap year, so serial 60 is the non-existent 1900-02-29 and every serial
//! above it is one day ahead of a naive count from 1899-12-31. Conversion
//! here compensates uniformly for serials >= 60, which maps 60 onto
//! 1900-02-28 (the nearest real date) and 61 onto 1900-03-01.

use chrono::{Days, NaiveDate};

use super::cell::DateValue;

/// First serial affected by the 1900 leap-year defect.
pub const LEAP_BUG_SERIAL: i64 = 60;

/// Default exclusive lower bound for treating an imported number as a date.
pub const DEFAULT_SERIAL_MIN: f64 = 29_000.0;
/// Default exclusive upper bound for treating an imported number as a date.
pub const DEFAULT_SERIAL_MAX: f64 = 50_000.0;

/// Window of numeric values that import treats as date serials.
///
/// The defaults (1979-05-25 .. 2036-11-21) keep small business numbers out
/// of the window; both bounds are exclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DateSerialPolicy {
    pub min: f64,
    pub max: f64,
}

impl Default for DateSerialPolicy {
    fn default() -> Self {
        Self {
            min: DEFAULT_SERIAL_MIN,
            max: DEFAULT_SERIAL_MAX,
        }
    }
}

impl DateSerialPolicy {
    pub fn is_probable_serial(&self, value: f64) -> bool {
        value.is_finite() && self.min < value && value < self.max
    }

    /// Recover a date cell from a raw imported number, if it falls inside the window.
    pub fn recover(&self, value: f64) -> Option<DateValue> {
        if !self.is_probable_serial(value) {
            return None;
        }
        let date = serial_to_date(value)?;
        Some(DateValue {
            display: format_iso(date),
            serial: Some(value),
        })
    }
}

fn naive_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch")
}

fn compensated_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

/// Convert a serial day count into a calendar date. Fractions (time of day)
/// are truncated. Negative or unrepresentable serials yield None.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = if days >= LEAP_BUG_SERIAL {
        compensated_epoch()
    } else {
        naive_epoch()
    };
    epoch.checked_add_days(Days::new(u64::try_from(days).ok()?))
}

/// Inverse of [`serial_to_date`] for real calendar dates.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    let first_shifted = NaiveDate::from_ymd_opt(1900, 3, 1).expect("valid date");
    let epoch = if date >= first_shifted {
        compensated_epoch()
    } else {
        naive_epoch()
    };
    (date - epoch).num_days() as f64
}

/// Parse user-typed date text in the formats a date cell accepts on re-edit.
pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    let trimmed = input.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
