//! Core-to-presentation operations on a [`Document`].
//!
//! Content edits go through `Document::edit`, so each one recalculates the
//! active sheet and lands on the history exactly once. Navigation, scrolling,
//! selection and filters only touch view state.

use std::collections::BTreeSet;

use chartgrid_engine::Chart;
use chartgrid_engine::ChartSize;
use chartgrid_engine::engine::{CellRef, CellValue};

use super::formatting::{FormatOp, FormatTarget};
use super::selection::Selection;
use super::state::Document;
use super::workbook::SheetId;
use crate::error::{GridError, Result};
use crate::storage::{CellBlock, ClipboardChain, parse_paste_buffer};

/// Direction for keyboard navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Document {
    // --- cell content ---

    /// Handle typed input: formulas, chart strings, numbers, text.
    pub fn set_cell_input(&mut self, cell: CellRef, input: &str) -> Result<()> {
        self.edit(|sheet, _| sheet.set_input(cell, input))
    }

    pub fn set_cell_value(&mut self, cell: CellRef, value: CellValue) -> Result<()> {
        self.edit(|sheet, _| sheet.set_value(cell, value))
    }

    pub fn set_cell_formula(&mut self, cell: CellRef, formula: &str) -> Result<()> {
        self.edit(|sheet, _| sheet.set_formula(cell, formula))
    }

    /// Empty every cell of `rect`. Chart-covered cells are left alone; an
    /// anchor inside the rectangle takes its chart with it.
    pub fn clear_cells(&mut self, rect: Selection) -> Result<usize> {
        self.edit(|sheet, _| {
            let mut cleared = 0;
            for cell in rect.cells() {
                if matches!(sheet.get(cell), CellValue::ChartOccupied) {
                    continue;
                }
                if !sheet.get(cell).is_blank() || sheet.formula(cell).is_some() {
                    sheet.clear_cell(cell)?;
                    cleared += 1;
                }
            }
            Ok(cleared)
        })
    }

    /// Grow the active sheet by `rows` and `cols`. Returns the new size.
    pub fn expand_grid(&mut self, rows: usize, cols: usize) -> (usize, usize) {
        let sheet = self.workbook.active_sheet_mut();
        sheet.expand(rows, cols);
        (sheet.row_count(), sheet.col_count())
    }

    pub fn apply_format(&mut self, target: FormatTarget, op: FormatOp) -> Result<usize> {
        self.edit(|sheet, settings| {
            let rect = match target {
                FormatTarget::Cell(cell) => Selection::single(cell),
                FormatTarget::Selection => sheet.selection,
                FormatTarget::Range(rect) => rect,
            };
            Ok(sheet.apply_format(rect, &op, &settings.format))
        })
    }

    // --- navigation and view ---

    /// Move the active cell one step. Stepping past the last row or column
    /// grows the grid first; the top and left edges stop the cursor.
    pub fn move_active(&mut self, direction: Direction) -> CellRef {
        let (grow_rows, grow_cols) = (
            self.settings.grid.grow_rows.max(1),
            self.settings.grid.grow_cols.max(1),
        );
        let sheet = self.workbook.active_sheet_mut();
        let CellRef { row, col } = sheet.active;
        let next = match direction {
            Direction::Up => CellRef::new(row.saturating_sub(1), col),
            Direction::Down => CellRef::new(row + 1, col),
            Direction::Left => CellRef::new(row, col.saturating_sub(1)),
            Direction::Right => CellRef::new(row, col + 1),
        };
        if next.row >= sheet.row_count() {
            sheet.expand(grow_rows, 0);
        }
        if next.col >= sheet.col_count() {
            sheet.expand(0, grow_cols);
        }
        sheet.active = next;
        sheet.selection = Selection::single(next);
        next
    }

    /// Report the bottom-right cell currently on screen. Within the edge
    /// margin of the grid's end, the grid grows. Returns whether it did.
    pub fn on_scroll(&mut self, last_visible: CellRef) -> bool {
        let grid = &self.settings.grid;
        let (margin, grow_rows, grow_cols) = (grid.edge_margin, grid.grow_rows, grid.grow_cols);
        let sheet = self.workbook.active_sheet_mut();
        let add_rows = if last_visible.row + margin >= sheet.row_count() {
            grow_rows
        } else {
            0
        };
        let add_cols = if last_visible.col + margin >= sheet.col_count() {
            grow_cols
        } else {
            0
        };
        sheet.expand(add_rows, add_cols);
        add_rows > 0 || add_cols > 0
    }

    pub fn set_active(&mut self, cell: CellRef) {
        let sheet = self.workbook.active_sheet_mut();
        sheet.ensure_contains(cell);
        sheet.active = cell;
        sheet.selection = Selection::single(cell);
    }

    pub fn select(&mut self, rect: Selection) {
        let sheet = self.workbook.active_sheet_mut();
        let (_, bottom_right) = rect.normalized();
        sheet.ensure_contains(bottom_right);
        sheet.active = rect.start;
        sheet.selection = rect;
    }

    pub fn selection(&self) -> Selection {
        self.sheet().selection
    }

    pub fn select_column(&mut self, col: usize) {
        self.workbook.active_sheet_mut().select_column(col);
    }

    pub fn visible_rows(&self) -> Vec<usize> {
        self.sheet().visible_rows()
    }

    pub fn filter_candidates(&self, col: usize) -> BTreeSet<String> {
        self.sheet().filter_candidates(col)
    }

    pub fn toggle_column_filter(&mut self, col: usize) -> bool {
        self.workbook.active_sheet_mut().toggle_column_filter(col)
    }

    pub fn set_filter(&mut self, col: usize, allowed: BTreeSet<String>) {
        self.workbook.active_sheet_mut().set_filter(col, allowed);
    }

    pub fn clear_filters(&mut self) {
        self.workbook.active_sheet_mut().clear_filters();
    }

    // --- charts ---

    /// Place `chart` at `anchor`. Without a size hint the configured default
    /// footprint is used.
    pub fn create_chart(
        &mut self,
        anchor: CellRef,
        mut chart: Chart,
        size_hint: Option<ChartSize>,
    ) -> Result<CellRef> {
        self.edit(|sheet, settings| {
            chart.size = size_hint.unwrap_or_else(|| settings.charts.default_size());
            sheet.place_chart(anchor, chart)
        })
    }

    pub fn move_chart(&mut self, from: CellRef, to: CellRef) -> Result<CellRef> {
        self.edit(|sheet, _| sheet.move_chart(from, to))
    }

    pub fn resize_chart(&mut self, anchor: CellRef, size: ChartSize) -> Result<CellRef> {
        self.edit(|sheet, _| sheet.resize_chart(anchor, size))
    }

    pub fn delete_chart(&mut self, anchor: CellRef) -> Result<Chart> {
        self.edit(|sheet, _| sheet.delete_chart(anchor))
    }

    pub fn chart_at(&self, cell: CellRef) -> Option<&Chart> {
        self.sheet().chart_at(cell)
    }

    pub fn charts(&self) -> Vec<&Chart> {
        self.sheet().charts()
    }

    // --- clipboard ---

    /// Paste a text buffer (TSV or CSV) with its first field at `target`.
    pub fn paste_at(&mut self, target: CellRef, buffer: &str) -> Result<usize> {
        let rows = parse_paste_buffer(buffer);
        if rows.is_empty() {
            return Ok(0);
        }
        self.edit(|sheet, _| Ok(sheet.apply_paste_block(target, &rows)))
    }

    /// Paste whatever the first working clipboard source holds.
    pub fn paste_from_clipboard(
        &mut self,
        target: CellRef,
        clipboard: &mut ClipboardChain,
    ) -> Result<usize> {
        let text = clipboard.read().ok_or(GridError::ClipboardUnavailable)?;
        self.paste_at(target, &text)
    }

    pub fn copy_cells(&self, rect: Selection) -> CellBlock {
        self.sheet().copy_block(rect)
    }

    /// Copy `rect` as text. The block is returned for in-grid pastes, which
    /// keep formulas and shift their references.
    pub fn copy_to_clipboard(
        &self,
        rect: Selection,
        clipboard: &mut ClipboardChain,
    ) -> CellBlock {
        let block = self.copy_cells(rect);
        if !clipboard.write(&block.to_text()) {
            log::debug!("no clipboard source accepted the copy; kept in memory");
        }
        block
    }

    pub fn paste_cells(&mut self, target: CellRef, block: &CellBlock) -> Result<usize> {
        self.edit(|sheet, _| Ok(sheet.paste_block(target, block)))
    }

    // --- history ---

    pub fn undo(&mut self) -> Result<()> {
        let snapshot = self.history.undo().cloned().ok_or(GridError::NothingToUndo)?;
        self.restore(snapshot);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let snapshot = self.history.redo().cloned().ok_or(GridError::NothingToRedo)?;
        self.restore(snapshot);
        Ok(())
    }

    // --- sheets ---

    /// Add an empty sheet and make it active. Taken names get a numeric suffix.
    pub fn add_sheet(&mut self, name: Option<&str>) -> Result<SheetId> {
        let name = name.map(|n| self.workbook.unique_sheet_name(n));
        let grid = &self.settings.grid;
        let id = self
            .workbook
            .add_sheet(name.as_deref(), grid.initial_rows, grid.initial_cols);
        self.workbook.set_active(id)?;
        self.commit();
        Ok(id)
    }

    pub fn rename_sheet(&mut self, id: SheetId, name: &str) -> Result<()> {
        let current = &self.workbook.sheet(id)?.name;
        if current == name.trim() || name.trim().is_empty() {
            return Ok(());
        }
        let name = self.workbook.unique_sheet_name(name);
        self.workbook.rename_sheet(id, &name)?;
        self.commit();
        Ok(())
    }

    pub fn delete_sheet(&mut self, id: SheetId) -> Result<()> {
        self.workbook.delete_sheet(id)?;
        self.commit();
        Ok(())
    }

    pub fn set_active_sheet(&mut self, id: SheetId) -> Result<()> {
        self.workbook.set_active(id)
    }
}
