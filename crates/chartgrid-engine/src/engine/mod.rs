//! Spreadsheet engine API.
//!
//! This module provides the value model and computation for the grid:
//!
//! - [`CellValue`], [`DateValue`], [`FormulaError`] - What a cell holds
//! - [`CellRef`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`CellFormat`], [`format_for_display`], [`style_for_cell`] - Display rules
//! - [`DateSerialPolicy`], [`serial_to_date`] - Spreadsheet date serials
//! - [`extract_dependencies`], [`DepGraph`], [`detect_cycle`] - Evaluation order
//! - [`preprocess_formula`], [`offset_formula_references`] - Formula rewriting
//! - [`FormulaEngine`] - Rhai-backed evaluation with built-in functions

mod cell;
mod cell_ref;
mod cycle;
mod dates;
mod deps;
mod eval;
mod format;
mod graph;
mod preprocess;

pub use cell::{CellValue, DateValue, FormulaError};
pub use cell_ref::{CellRef, index_for_label, label_for_index};
pub use cycle::{describe_cycle, detect_cycle};
pub use dates::{
    DEFAULT_SERIAL_MAX, DEFAULT_SERIAL_MIN, DateSerialPolicy, LEAP_BUG_SERIAL, date_to_serial,
    format_iso, parse_date_input, serial_to_date,
};
pub use deps::{MAX_DEPENDENCY_RANGE_CELLS, extract_dependencies, parse_range};
pub use eval::{
    DEFAULT_MAX_OPERATIONS, FormulaEngine, ValueCache, cell_to_dynamic, dynamic_to_cell,
    error_marker,
};
pub use format::{
    Alignment, Borders, CellFormat, CellStyle, DEFAULT_DECIMALS, DateStyle, MAX_DECIMALS,
    NumberStyle, fixed_decimal_string, format_for_display, format_number, format_styled_number,
    group_thousands, money_string, style_for_cell,
};
pub use graph::{DepGraph, EvalOrder};
pub use preprocess::{REF_ERROR_TOKEN, formula_body, offset_formula_references, preprocess_formula};

pub use rhai::Dynamic;
