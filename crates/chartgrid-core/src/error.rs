//! Error types for Chartgrid core.

use thiserror::Error;

use chartgrid_engine::engine::CellRef;

use crate::document::SheetId;

/// Failures of document operations. Formula problems never show up here;
/// they become error markers inside the cell instead.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cell {0} is covered by a chart")]
    CellOccupiedByChart(CellRef),

    #[error("No chart is anchored at {0}")]
    NotAChart(CellRef),

    #[error("Chart at {anchor} would overlap another chart")]
    ChartOverlap { anchor: CellRef },

    #[error("Invalid chart size {width}x{height}")]
    InvalidChartSize { width: usize, height: usize },

    #[error("Sheet {0} not found")]
    SheetNotFound(SheetId),

    #[error("Cannot delete the last sheet")]
    LastSheet,

    #[error("Nothing to import")]
    EmptyImport,

    #[error("Clipboard is unavailable")]
    ClipboardUnavailable,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
