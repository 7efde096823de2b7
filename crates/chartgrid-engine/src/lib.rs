//! chartgrid_engine - Cell values, charts, and Rhai-backed formula evaluation.

pub(crate) mod builtins;
pub mod chart;
pub mod engine;

pub use chart::{Chart, ChartKind, ChartRecord, ChartSize};
pub use engine::{CellRef, CellValue, FormulaEngine, FormulaError};
