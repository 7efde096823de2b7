//! Named tabular worksheets crossing the import/export boundary.

use serde::{Deserialize, Serialize};

use chartgrid_engine::engine::{CellValue, DateSerialPolicy};

/// A value as it appears in a file, before the grid interprets it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawValue {
    /// Interpret one delimited-text field.
    /// - Blank -> Empty
    /// - Valid number -> Number (unless it has leading zeros like "007", or
    ///   surrounding whitespace that must survive)
    /// - Otherwise -> Text, kept verbatim
    pub fn from_field(field: &str) -> RawValue {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return RawValue::Empty;
        }
        if field != trimmed {
            return RawValue::Text(field.to_string());
        }
        match CellValue::parse_input(trimmed) {
            CellValue::Number(n) => RawValue::Number(n),
            _ => RawValue::Text(field.to_string()),
        }
    }

    /// What an exported cell looks like. Formula cells hold their result
    /// already; dates export as their display text and charts as wire strings.
    pub fn from_cell(value: &CellValue) -> RawValue {
        match value {
            CellValue::Empty => RawValue::Empty,
            CellValue::Number(n) => RawValue::Number(*n),
            CellValue::Text(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.display_string()),
        }
    }

    /// Cell value for an imported number or boolean. Numbers inside the
    /// serial window become dates when a policy is given. Text needs the
    /// sheet's input routing (formulas, chart strings) and returns None.
    pub fn to_cell(&self, policy: Option<&DateSerialPolicy>) -> Option<CellValue> {
        match self {
            RawValue::Empty => Some(CellValue::Empty),
            RawValue::Number(n) => Some(
                policy
                    .and_then(|p| p.recover(*n))
                    .map(CellValue::Date)
                    .unwrap_or(CellValue::Number(*n)),
            ),
            RawValue::Bool(b) => Some(CellValue::text(if *b { "TRUE" } else { "FALSE" })),
            RawValue::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// A sheet name plus a row-major grid of raw values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<RawValue>>,
}

pub type ImportedSheet = Worksheet;
pub type ExportedSheet = Worksheet;

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build from parsed delimited-text fields.
    pub fn from_fields(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|f| RawValue::from_field(f)).collect())
            .collect();
        Self::new(name, rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(RawValue::is_empty)
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}
