//! Cell values for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellValue`] - What a cell holds (empty, text, number, date, chart, or an error marker)
//! - [`DateValue`] - A date recovered from a serial or typed by the user
//! - [`FormulaError`] - Error markers produced by formula evaluation

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dates::{date_to_serial, parse_date_input};
use super::format::format_number;
use crate::chart::{Chart, OCCUPIED_SENTINEL};

/// Error markers a formula cell can evaluate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum FormulaError {
    #[error("#ERROR!")]
    Parse,
    #[error("#NAME?")]
    Name,
    #[error("#VALUE!")]
    Value,
    #[error("#REF!")]
    Ref,
    #[error("#DIV/0!")]
    DivZero,
    #[error("#CYCLE!")]
    Cycle,
}

impl FormulaError {
    pub const ALL: [FormulaError; 6] = [
        FormulaError::Parse,
        FormulaError::Name,
        FormulaError::Value,
        FormulaError::Ref,
        FormulaError::DivZero,
        FormulaError::Cycle,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            FormulaError::Parse => "#ERROR!",
            FormulaError::Name => "#NAME?",
            FormulaError::Value => "#VALUE!",
            FormulaError::Ref => "#REF!",
            FormulaError::DivZero => "#DIV/0!",
            FormulaError::Cycle => "#CYCLE!",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.marker() == marker)
    }
}

/// A date cell. `display` is what the user sees; `serial` is the spreadsheet
/// day count when one is known (recovered imports, re-parsed edits).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    pub display: String,
    pub serial: Option<f64>,
}

/// The content of one grid cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(DateValue),
    /// Top-left cell of a chart footprint; carries the whole definition.
    ChartAnchor(Box<Chart>),
    /// Any other cell inside a chart footprint.
    ChartOccupied,
    Error(FormulaError),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Parse non-formula user input.
    /// - Empty string or whitespace -> Empty
    /// - Chart wire string that decodes -> ChartAnchor
    /// - Valid number -> Number (unless it has leading zeros like "007")
    /// - Otherwise -> Text, kept verbatim
    pub fn parse_input(input: &str) -> CellValue {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if Chart::is_anchor_candidate(trimmed) {
            if let Some(chart) = Chart::decode(trimmed) {
                return CellValue::ChartAnchor(Box::new(chart));
            }
            return CellValue::Text(input.to_string());
        }

        if has_significant_leading_zero(trimmed) {
            return CellValue::Text(input.to_string());
        }

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(input.to_string()),
        }
    }

    /// Parse input that replaces `previous`. A date cell stays a date when the
    /// new text is still a recognisable date; otherwise it demotes to the
    /// ordinary parse.
    pub fn reparse_input(previous: &CellValue, input: &str) -> CellValue {
        if let CellValue::Date(_) = previous
            && let Some(date) = parse_date_input(input)
        {
            return CellValue::Date(DateValue {
                display: input.trim().to_string(),
                serial: Some(date_to_serial(date)),
            });
        }
        CellValue::parse_input(input)
    }

    /// Unformatted display text. Chart cells render as their wire strings.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(d) => d.display.clone(),
            CellValue::ChartAnchor(chart) => chart.encode(),
            CellValue::ChartOccupied => OCCUPIED_SENTINEL.to_string(),
            CellValue::Error(e) => e.marker().to_string(),
        }
    }

    /// Numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Date(d) => d.serial,
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Empty, or text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, CellValue::ChartAnchor(_) | CellValue::ChartOccupied)
    }

    pub fn as_chart(&self) -> Option<&Chart> {
        match self {
            CellValue::ChartAnchor(chart) => Some(chart),
            _ => None,
        }
    }
}

/// "007" and "00123" stay text; "0", "0.5" and "-0.5" are numbers.
fn has_significant_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.starts_with('0')
        && digits.len() > 1
        && digits.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
}
