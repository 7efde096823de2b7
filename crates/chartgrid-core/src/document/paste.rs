//! Writing pasted text blocks and copied cell blocks into a sheet.

use chartgrid_engine::chart::OCCUPIED_SENTINEL;
use chartgrid_engine::engine::{CellRef, CellValue, offset_formula_references};

use super::selection::Selection;
use super::sheet::Sheet;
use crate::storage::{CellBlock, ClipCell, strip_enclosing_quotes};

impl Sheet {
    /// Write parsed rows with their top-left field at `target`.
    ///
    /// The grid first grows to fit the whole block. Each field loses one
    /// layer of enclosing quotes and is then handled like typed input.
    /// Chart-covered cells and `CHART:OCCUPIED` fields are skipped; an
    /// anchor string re-creates its chart. Returns the number of cells written.
    pub fn apply_paste_block(&mut self, target: CellRef, rows: &[Vec<String>]) -> usize {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return 0;
        }
        self.ensure_size(target.row + rows.len(), target.col + width);

        let mut written = 0;
        for (dr, row) in rows.iter().enumerate() {
            for (dc, field) in row.iter().enumerate() {
                let cell = CellRef::new(target.row + dr, target.col + dc);
                let field = strip_enclosing_quotes(field);
                if field == OCCUPIED_SENTINEL {
                    continue;
                }
                match self.set_input(cell, field) {
                    Ok(()) => written += 1,
                    Err(e) => log::debug!("paste skipped {}: {}", cell, e),
                }
            }
        }
        written
    }

    /// Copy a rectangle. Formula cells keep their formula text.
    pub fn copy_block(&self, rect: Selection) -> CellBlock {
        let (origin, _) = rect.normalized();
        let mut block = CellBlock::new(origin);
        for cell in rect.cells() {
            let content = match self.formula(cell) {
                Some(formula) => ClipCell::Formula(formula.to_string()),
                None => ClipCell::Value(self.get(cell).clone()),
            };
            block.add_cell(cell.row - origin.row, cell.col - origin.col, content);
        }
        block
    }

    /// Paste a copied block at `target`, shifting relative references by the
    /// distance between the block's origin and `target`.
    pub fn paste_block(&mut self, target: CellRef, block: &CellBlock) -> usize {
        if block.is_empty() {
            return 0;
        }
        self.ensure_size(target.row + block.height, target.col + block.width);
        let delta_row = target.row as isize - block.origin.row as isize;
        let delta_col = target.col as isize - block.origin.col as isize;

        let mut written = 0;
        for (dr, dc, content) in &block.cells {
            let cell = CellRef::new(target.row + dr, target.col + dc);
            if content.is_chart_occupied() || matches!(self.get(cell), CellValue::ChartOccupied) {
                continue;
            }
            let result = match content {
                ClipCell::Formula(formula) => {
                    let shifted = offset_formula_references(formula, delta_row, delta_col);
                    self.set_formula(cell, &shifted)
                }
                ClipCell::Value(value) => self.set_value(cell, value.clone()),
            };
            match result {
                Ok(()) => written += 1,
                Err(e) => log::warn!("paste skipped {}: {}", cell, e),
            }
        }
        written
    }
}
