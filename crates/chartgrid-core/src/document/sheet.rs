//! A single sheet: a dense, growable grid of values plus side maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use chartgrid_engine::engine::{CellFormat, CellRef, CellValue, format_for_display};

use super::selection::Selection;
use crate::error::{GridError, Result};

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Rows are stored row-major and always rectangular. The grid only grows;
/// chart clearing reverts cells to `Empty` but never drops rows or columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
    /// Raw formula text (with `=`) for formula cells. The grid holds their results.
    formulas: BTreeMap<CellRef, String>,
    formats: BTreeMap<CellRef, CellFormat>,
    /// Column -> display strings allowed through the filter.
    pub(crate) filters: BTreeMap<usize, BTreeSet<String>>,
    pub active: CellRef,
    pub selection: Selection,
}

/// The parts of a sheet that belong to the user's view rather than its content.
#[derive(Clone, Debug)]
pub(crate) struct SheetView {
    rows: usize,
    cols: usize,
    filters: BTreeMap<usize, BTreeSet<String>>,
    active: CellRef,
    selection: Selection,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            name: name.into(),
            rows: vec![vec![CellValue::Empty; cols]; rows],
            formulas: BTreeMap::new(),
            formats: BTreeMap::new(),
            filters: BTreeMap::new(),
            active: CellRef::new(0, 0),
            selection: Selection::single(CellRef::new(0, 0)),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn in_bounds(&self, cell: CellRef) -> bool {
        cell.row < self.row_count() && cell.col < self.col_count()
    }

    /// Value at `cell`; out-of-bounds cells read as empty.
    pub fn get(&self, cell: CellRef) -> &CellValue {
        self.rows
            .get(cell.row)
            .and_then(|row| row.get(cell.col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn formula(&self, cell: CellRef) -> Option<&str> {
        self.formulas.get(&cell).map(String::as_str)
    }

    pub fn formulas(&self) -> impl Iterator<Item = (&CellRef, &String)> {
        self.formulas.iter()
    }

    pub fn has_formulas(&self) -> bool {
        !self.formulas.is_empty()
    }

    pub fn format(&self, cell: CellRef) -> Option<&CellFormat> {
        self.formats.get(&cell)
    }

    /// What the user sees in `cell`, after number and date styles.
    pub fn display_value(&self, cell: CellRef) -> String {
        let value = self.get(cell);
        match self.formats.get(&cell) {
            Some(format) => format_for_display(value, format),
            None => value.display_string(),
        }
    }

    /// Text to put in an editor for `cell`: the formula when there is one.
    pub fn edit_text(&self, cell: CellRef) -> String {
        match self.formula(cell) {
            Some(formula) => formula.to_string(),
            None => self.get(cell).display_string(),
        }
    }

    /// Append empty rows and columns. Never removes anything.
    pub fn expand(&mut self, add_rows: usize, add_cols: usize) {
        if add_rows == 0 && add_cols == 0 {
            return;
        }
        let cols = self.col_count() + add_cols;
        if add_cols > 0 {
            for row in &mut self.rows {
                row.resize(cols, CellValue::Empty);
            }
        }
        for _ in 0..add_rows {
            self.rows.push(vec![CellValue::Empty; cols]);
        }
        log::debug!(
            "sheet {:?} grew by {} rows, {} cols to {}x{}",
            self.name,
            add_rows,
            add_cols,
            self.row_count(),
            self.col_count()
        );
    }

    /// Grow until the grid has at least `rows` x `cols` cells.
    pub fn ensure_size(&mut self, rows: usize, cols: usize) {
        let add_rows = rows.saturating_sub(self.row_count());
        let add_cols = cols.saturating_sub(self.col_count());
        self.expand(add_rows, add_cols);
    }

    pub fn ensure_contains(&mut self, cell: CellRef) {
        self.ensure_size(cell.row + 1, cell.col + 1);
    }

    /// Store a value without any chart or formula bookkeeping.
    pub(crate) fn put(&mut self, cell: CellRef, value: CellValue) {
        self.ensure_contains(cell);
        self.rows[cell.row][cell.col] = value;
    }

    pub(crate) fn remove_formula(&mut self, cell: CellRef) -> Option<String> {
        self.formulas.remove(&cell)
    }

    pub(crate) fn set_format(&mut self, cell: CellRef, format: CellFormat) {
        if format.is_default() {
            self.formats.remove(&cell);
        } else {
            self.formats.insert(cell, format);
        }
    }

    /// Fail on chart-covered cells and tear down a chart whose anchor is about
    /// to be overwritten.
    fn prepare_write(&mut self, cell: CellRef) -> Result<()> {
        match self.get(cell) {
            CellValue::ChartOccupied => Err(GridError::CellOccupiedByChart(cell)),
            CellValue::ChartAnchor(_) => {
                self.delete_chart(cell)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Overwrite `cell` with a plain value. A chart value places that chart
    /// with `cell` as its anchor; the occupied sentinel is ignored since a
    /// footprint is always written by its anchor.
    pub fn set_value(&mut self, cell: CellRef, value: CellValue) -> Result<()> {
        match value {
            CellValue::ChartOccupied => Ok(()),
            CellValue::ChartAnchor(chart) => {
                if matches!(self.get(cell), CellValue::ChartOccupied) {
                    return Err(GridError::CellOccupiedByChart(cell));
                }
                self.place_chart(cell, *chart).map(|_| ())
            }
            value => {
                self.prepare_write(cell)?;
                self.formulas.remove(&cell);
                self.put(cell, value);
                Ok(())
            }
        }
    }

    /// Store a formula. The cell shows nothing until the next recalculation.
    /// A bare `=` is kept as text, since the user is still typing.
    pub fn set_formula(&mut self, cell: CellRef, formula: &str) -> Result<()> {
        let formula = formula.trim();
        if formula == "=" {
            return self.set_value(cell, CellValue::text("="));
        }
        self.prepare_write(cell)?;
        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };
        self.formulas.insert(cell, formula);
        self.put(cell, CellValue::Empty);
        Ok(())
    }

    /// Route raw user input: formulas, chart wire strings, numbers, text.
    /// A date cell stays a date when the input still reads as one.
    pub fn set_input(&mut self, cell: CellRef, input: &str) -> Result<()> {
        if input.trim_start().starts_with('=') {
            return self.set_formula(cell, input);
        }
        let value = CellValue::reparse_input(self.get(cell), input);
        self.set_value(cell, value)
    }

    /// Empty a cell's content; its format stays.
    pub fn clear_cell(&mut self, cell: CellRef) -> Result<()> {
        self.set_value(cell, CellValue::Empty)
    }

    /// Grid size, filters and cursor: state that undo leaves alone.
    pub(crate) fn view(&self) -> SheetView {
        SheetView {
            rows: self.row_count(),
            cols: self.col_count(),
            filters: self.filters.clone(),
            active: self.active,
            selection: self.selection,
        }
    }

    pub(crate) fn apply_view(&mut self, view: SheetView) {
        self.ensure_size(view.rows, view.cols);
        self.filters = view.filters;
        self.active = view.active;
        self.selection = view.selection;
    }

    /// True when no cell holds anything and no formula is stored.
    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty() && self.rows.iter().flatten().all(CellValue::is_blank)
    }

    /// Smallest (rows, cols) covering every non-blank cell or formula.
    pub fn used_extent(&self) -> (usize, usize) {
        let mut rows = 0;
        let mut cols = 0;
        for (r, row) in self.rows.iter().enumerate() {
            if let Some(c) = row.iter().rposition(|v| !v.is_blank()) {
                rows = r + 1;
                cols = cols.max(c + 1);
            }
        }
        for cell in self.formulas.keys() {
            rows = rows.max(cell.row + 1);
            cols = cols.max(cell.col + 1);
        }
        (rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgrid_engine::engine::DateValue;
    use pretty_assertions::assert_eq;

    fn a1(name: &str) -> CellRef {
        CellRef::from_a1(name).unwrap()
    }

    #[test]
    fn test_expand_appends_rows_and_cols() {
        let mut sheet = Sheet::new("Sheet 1", 2, 2);
        sheet.set_input(a1("B2"), "x").unwrap();
        sheet.expand(3, 1);
        assert_eq!(sheet.row_count(), 5);
        assert_eq!(sheet.col_count(), 3);
        assert!(sheet.rows().iter().all(|row| row.len() == 3));
        assert_eq!(sheet.get(a1("B2")), &CellValue::text("x"));
    }

    #[test]
    fn test_writes_past_the_edge_grow_the_grid() {
        let mut sheet = Sheet::new("Sheet 1", 2, 2);
        sheet.set_input(a1("E9"), "5").unwrap();
        assert_eq!(sheet.row_count(), 9);
        assert_eq!(sheet.col_count(), 5);
        assert_eq!(sheet.get(a1("E9")), &CellValue::Number(5.0));
    }

    #[test]
    fn test_out_of_bounds_reads_are_empty() {
        let sheet = Sheet::new("Sheet 1", 2, 2);
        assert_eq!(sheet.get(a1("Z99")), &CellValue::Empty);
        assert_eq!(sheet.display_value(a1("Z99")), "");
    }

    #[test]
    fn test_formula_removed_when_overwritten() {
        let mut sheet = Sheet::new("Sheet 1", 3, 3);
        sheet.set_input(a1("A1"), "=1+1").unwrap();
        assert_eq!(sheet.formula(a1("A1")), Some("=1+1"));
        sheet.set_input(a1("A1"), "hello").unwrap();
        assert_eq!(sheet.formula(a1("A1")), None);
        assert_eq!(sheet.get(a1("A1")), &CellValue::text("hello"));
    }

    #[test]
    fn test_bare_equals_is_text() {
        let mut sheet = Sheet::new("Sheet 1", 3, 3);
        sheet.set_input(a1("A1"), "=").unwrap();
        assert_eq!(sheet.formula(a1("A1")), None);
        assert_eq!(sheet.get(a1("A1")), &CellValue::text("="));
    }

    #[test]
    fn test_date_cell_keeps_tag_on_reedit() {
        let mut sheet = Sheet::new("Sheet 1", 3, 3);
        sheet
            .set_value(
                a1("A1"),
                CellValue::Date(DateValue {
                    display: "2024-01-01".into(),
                    serial: Some(45_292.0),
                }),
            )
            .unwrap();
        sheet.set_input(a1("A1"), "2024-01-02").unwrap();
        assert!(matches!(sheet.get(a1("A1")), CellValue::Date(d) if d.serial == Some(45_293.0)));
        sheet.set_input(a1("A1"), "soon").unwrap();
        assert_eq!(sheet.get(a1("A1")), &CellValue::text("soon"));
    }

    #[test]
    fn test_is_empty_and_used_extent() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        assert!(sheet.is_empty());
        assert_eq!(sheet.used_extent(), (0, 0));
        sheet.set_input(a1("C2"), "x").unwrap();
        sheet.set_input(a1("A4"), "=C2").unwrap();
        assert!(!sheet.is_empty());
        assert_eq!(sheet.used_extent(), (4, 3));
    }
}
