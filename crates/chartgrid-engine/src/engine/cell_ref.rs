//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//!
//! Column labels use the bijective base-26 numbering spreadsheets use: the
//! digit set is `A..=Z` standing for 1..=26, so there is no zero digit and
//! `Z` is followed by `AA`, not `BA`.
//!
//! # Examples
//!
//! ```
//! use chartgrid_engine::engine::CellRef;
//!
//! let cell = CellRef::from_a1("B3").unwrap();
//! assert_eq!(cell.col, 1); // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by row and column indices (0-indexed).
///
/// Ordering is row-major, so sorted collections of refs iterate the way the
/// grid is laid out.
#[derive(
    Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub const fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "b2", "$AA$10").
    /// Returns None if the input is invalid.
    pub fn from_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let col = index_for_label(&caps["letters"])?;
        let row = caps["numbers"].parse::<usize>().ok()?.checked_sub(1)?;
        Some(CellRef::new(row, col))
    }

    /// Return this reference moved by a signed row/column delta, or None if
    /// it would leave the grid on the top or left edge.
    pub fn offset(self, delta_row: isize, delta_col: isize) -> Option<CellRef> {
        let row = self.row.checked_add_signed(delta_row)?;
        let col = self.col.checked_add_signed(delta_col)?;
        Some(CellRef::new(row, col))
    }
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$?(?<letters>[A-Za-z]+)\$?(?<numbers>[0-9]+)$")
            .expect("A1 reference regex must compile")
    })
}

/// Convert a column index to spreadsheet letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn label_for_index(index: usize) -> String {
    let mut result = String::new();
    let mut n = index as u128 + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Inverse of [`label_for_index`]. Case-insensitive; returns None for empty
/// input, non-letters, or labels that overflow `usize`.
pub fn index_for_label(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut acc = 0usize;
    for c in label.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    acc.checked_sub(1)
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", label_for_index(self.col), self.row + 1)
    }
}
