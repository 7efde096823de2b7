//! Document state and logic (UI-agnostic).

mod charts;
mod eval;
mod formatting;
mod history;
mod io;
mod ops;
mod paste;
mod selection;
mod sheet;
mod state;
mod workbook;

pub use eval::RecalcSummary;
pub use formatting::{FormatOp, FormatTarget};
pub use history::History;
pub use ops::Direction;
pub use selection::{Selection, is_selected};
pub use sheet::Sheet;
pub use state::Document;
pub use workbook::{SheetId, Workbook};
