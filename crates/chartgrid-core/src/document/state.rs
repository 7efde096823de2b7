use chartgrid_engine::engine::{CellRef, CellValue, FormulaEngine};
use std::collections::BTreeMap;

use super::history::History;
use super::sheet::Sheet;
use super::workbook::{SheetId, Workbook};
use crate::config::Settings;
use crate::error::Result;

/// UI-agnostic document state for the spreadsheet.
///
/// Every successful edit recalculates the edited sheet and pushes a snapshot
/// of the whole workbook onto the history. Navigation, scrolling and filters
/// are view state: they are never snapshotted on their own and survive
/// undo/redo.
#[derive(Debug)]
pub struct Document {
    pub(crate) workbook: Workbook,
    /// Rhai engine for evaluating formulas
    pub(crate) engine: FormulaEngine,
    pub(crate) history: History<Workbook>,
    pub(crate) settings: Settings,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new document with default settings.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let workbook = Workbook::new(settings.grid.initial_rows, settings.grid.initial_cols);
        Self::from_workbook(workbook, settings)
    }

    /// Wrap an existing workbook. All sheets are recalculated and the history
    /// starts from the result.
    pub fn from_workbook(workbook: Workbook, settings: Settings) -> Self {
        let mut doc = Document {
            workbook,
            engine: FormulaEngine::new(),
            history: History::new(settings.history.max_depth),
            settings,
        };
        doc.recalculate_all();
        doc.history.reset(doc.workbook.clone());
        doc
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The active sheet.
    pub fn sheet(&self) -> &Sheet {
        self.workbook.active_sheet()
    }

    pub fn cell(&self, cell: CellRef) -> &CellValue {
        self.sheet().get(cell)
    }

    pub fn display_value(&self, cell: CellRef) -> String {
        self.sheet().display_value(cell)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub(crate) fn commit(&mut self) {
        self.history.push(self.workbook.clone());
    }

    /// Run an edit against the active sheet. On success the sheet is
    /// recalculated and, if anything changed, a snapshot is recorded. On
    /// failure the sheet is put back the way it was.
    pub(crate) fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Sheet, &Settings) -> Result<T>,
    ) -> Result<T> {
        let before = self.workbook.active_sheet().clone();
        let sheet = self.workbook.active_sheet_mut();
        match f(sheet, &self.settings) {
            Ok(value) => {
                super::eval::recalculate_sheet(&self.engine, sheet);
                if *sheet != before {
                    self.commit();
                }
                Ok(value)
            }
            Err(e) => {
                *sheet = before;
                Err(e)
            }
        }
    }

    /// Swap in a snapshot, keeping each surviving sheet's view state and size.
    pub(crate) fn restore(&mut self, snapshot: Workbook) {
        let mut views: BTreeMap<SheetId, _> = self
            .workbook
            .sheets()
            .map(|(id, sheet)| (id, sheet.view()))
            .collect();
        self.workbook = snapshot;
        for (id, sheet) in self.workbook.sheets_mut() {
            if let Some(view) = views.remove(&id) {
                sheet.apply_view(view);
            }
        }
    }
}
