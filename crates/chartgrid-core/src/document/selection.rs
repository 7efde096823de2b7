//! Selection rectangles and the column filter view.
//!
//! Row 0 is the header row: it is always visible and never a filter candidate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chartgrid_engine::engine::CellRef;

use super::sheet::Sheet;

/// Two corners in any order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub start: CellRef,
    pub end: CellRef,
}

impl Selection {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    pub fn single(cell: CellRef) -> Self {
        Self::new(cell, cell)
    }

    /// (top-left, bottom-right)
    pub fn normalized(&self) -> (CellRef, CellRef) {
        (
            CellRef::new(
                self.start.row.min(self.end.row),
                self.start.col.min(self.end.col),
            ),
            CellRef::new(
                self.start.row.max(self.end.row),
                self.start.col.max(self.end.col),
            ),
        )
    }

    pub fn rows(&self) -> RangeInclusive<usize> {
        let (top_left, bottom_right) = self.normalized();
        top_left.row..=bottom_right.row
    }

    pub fn cols(&self) -> RangeInclusive<usize> {
        let (top_left, bottom_right) = self.normalized();
        top_left.col..=bottom_right.col
    }

    pub fn height(&self) -> usize {
        self.start.row.abs_diff(self.end.row) + 1
    }

    pub fn width(&self) -> usize {
        self.start.col.abs_diff(self.end.col) + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        is_selected(cell.row, cell.col, self)
    }

    /// Every cell in the rectangle, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + use<> {
        let cols = self.cols();
        self.rows()
            .flat_map(move |row| cols.clone().map(move |col| CellRef::new(row, col)))
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::single(CellRef::new(0, 0))
    }
}

/// Inclusive membership test after normalizing the corners.
pub fn is_selected(row: usize, col: usize, rect: &Selection) -> bool {
    let (top_left, bottom_right) = rect.normalized();
    (top_left.row..=bottom_right.row).contains(&row)
        && (top_left.col..=bottom_right.col).contains(&col)
}

impl Sheet {
    /// Rows that pass every active column filter, in order. Row 0 always does.
    pub fn visible_rows(&self) -> Vec<usize> {
        (0..self.row_count())
            .filter(|&row| self.is_row_visible(row))
            .collect()
    }

    pub fn is_row_visible(&self, row: usize) -> bool {
        row == 0
            || (row < self.row_count()
                && self.filters.iter().all(|(&col, allowed)| {
                    allowed.contains(&self.display_value(CellRef::new(row, col)))
                }))
    }

    /// Select the whole of column `col`.
    pub fn select_column(&mut self, col: usize) {
        self.ensure_size(1, col + 1);
        let last_row = self.row_count().saturating_sub(1);
        self.selection = Selection::new(CellRef::new(0, col), CellRef::new(last_row, col));
        self.active = CellRef::new(0, col);
    }

    /// Distinct display strings below the header in column `col`.
    pub fn filter_candidates(&self, col: usize) -> BTreeSet<String> {
        (1..self.row_count())
            .map(|row| self.display_value(CellRef::new(row, col)))
            .collect()
    }

    pub fn filter(&self, col: usize) -> Option<&BTreeSet<String>> {
        self.filters.get(&col)
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Turn the filter on column `col` on or off. A new filter starts with
    /// every current value allowed. Returns whether a filter is now active.
    pub fn toggle_column_filter(&mut self, col: usize) -> bool {
        if self.filters.remove(&col).is_some() {
            return false;
        }
        let candidates = self.filter_candidates(col);
        self.filters.insert(col, candidates);
        true
    }

    pub fn set_filter(&mut self, col: usize, allowed: BTreeSet<String>) {
        self.filters.insert(col, allowed);
    }

    pub fn clear_filter(&mut self, col: usize) -> Option<BTreeSet<String>> {
        self.filters.remove(&col)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }
}
