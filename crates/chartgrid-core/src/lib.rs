//! chartgrid-core - UI-agnostic document model + storage.

pub mod config;
pub mod document;
pub mod error;
pub mod storage;

pub use config::Settings;
pub use document::{
    Direction, Document, FormatOp, FormatTarget, History, Selection, Sheet, SheetId, Workbook,
};
pub use error::{GridError, Result};
pub use storage::{CellBlock, ClipCell, ClipboardChain, ClipboardSource, RawValue, Worksheet};

pub use chartgrid_engine::engine::{CellRef, CellValue};
pub use chartgrid_engine::{Chart, ChartKind, ChartRecord, ChartSize};
