//! Import and export of whole worksheets.

use chartgrid_engine::engine::{CellRef, CellValue, DateSerialPolicy};

use super::eval::recalculate_sheet;
use super::sheet::Sheet;
use super::state::Document;
use super::workbook::SheetId;
use crate::error::{GridError, Result};
use crate::storage::{
    ExportedSheet, ImportedSheet, RawValue, Worksheet, read_delimited, read_delimited_file,
    write_delimited,
};

/// Text exported with a leading `'` so other spreadsheets would not run it.
fn unescape_guarded_text(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('\'')?;
    let first = rest.trim_start_matches([' ', '\t']).chars().next();
    matches!(first, Some('=' | '+' | '-' | '@')).then_some(rest)
}

fn fill_sheet(sheet: &mut Sheet, source: &Worksheet, policy: Option<&DateSerialPolicy>) {
    sheet.ensure_size(source.rows.len(), source.width());
    for (r, row) in source.rows.iter().enumerate() {
        for (c, raw) in row.iter().enumerate() {
            let cell = CellRef::new(r, c);
            let result = match (raw.to_cell(policy), raw) {
                (Some(value), _) => sheet.set_value(cell, value),
                (None, RawValue::Text(text)) => match unescape_guarded_text(text) {
                    Some(literal) => sheet.set_value(cell, CellValue::text(literal)),
                    None => sheet.set_input(cell, text),
                },
                (None, _) => Ok(()),
            };
            if let Err(e) = result {
                log::warn!("import into {:?} skipped {}: {}", sheet.name, cell, e);
            }
        }
    }
}

impl Document {
    /// Bring in a set of worksheets, one destination sheet each.
    ///
    /// If exactly one existing sheet is empty, the first worksheet goes there
    /// (taking its name); every other worksheet gets a new sheet. Numbers in
    /// the configured serial window come in as dates. The first imported
    /// sheet becomes active.
    pub fn import_worksheets(&mut self, worksheets: Vec<ImportedSheet>) -> Result<Vec<SheetId>> {
        if worksheets.iter().all(Worksheet::is_empty) {
            return Err(GridError::EmptyImport);
        }
        let policy = self.settings.dates.policy();
        let (rows, cols) = (
            self.settings.grid.initial_rows,
            self.settings.grid.initial_cols,
        );
        let empty = self.workbook.empty_sheet_ids();
        let mut reusable = match empty.as_slice() {
            [only] => Some(*only),
            _ => None,
        };

        let mut ids = Vec::with_capacity(worksheets.len());
        for source in &worksheets {
            let id = match reusable.take() {
                Some(id) => {
                    if !source.name.trim().is_empty() {
                        let name = self.workbook.unique_sheet_name(&source.name);
                        self.workbook.rename_sheet(id, &name)?;
                    }
                    id
                }
                None => {
                    let name = self.workbook.unique_sheet_name(&source.name);
                    self.workbook.add_sheet(Some(&name), rows, cols)
                }
            };
            let sheet = self.workbook.sheet_mut(id)?;
            fill_sheet(sheet, source, policy.as_ref());
            recalculate_sheet(&self.engine, sheet);
            log::debug!("imported worksheet {:?} into sheet {}", source.name, id);
            ids.push(id);
        }

        if let Some(first) = ids.first() {
            self.workbook.set_active(*first)?;
        }
        self.commit();
        Ok(ids)
    }

    /// Import CSV/TSV text as a worksheet called `name`.
    pub fn import_delimited(&mut self, name: &str, text: &str) -> Result<SheetId> {
        let sheet = read_delimited(name, text)?;
        let ids = self.import_worksheets(vec![sheet])?;
        ids.first().copied().ok_or(GridError::EmptyImport)
    }

    pub fn import_delimited_file(&mut self, path: &std::path::Path) -> Result<SheetId> {
        let sheet = read_delimited_file(path)?;
        let ids = self.import_worksheets(vec![sheet])?;
        ids.first().copied().ok_or(GridError::EmptyImport)
    }

    /// Every sheet as a named grid of values, trimmed to its used extent.
    pub fn export(&self) -> Vec<ExportedSheet> {
        self.workbook
            .sheets()
            .map(|(_, sheet)| export_sheet(sheet))
            .collect()
    }

    pub fn export_active(&self) -> ExportedSheet {
        export_sheet(self.sheet())
    }

    /// The active sheet as CSV text.
    pub fn to_csv(&self) -> String {
        write_delimited(&self.export_active(), b',')
    }
}

fn export_sheet(sheet: &Sheet) -> ExportedSheet {
    let (rows, cols) = sheet.used_extent();
    let rows = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| RawValue::from_cell(sheet.get(CellRef::new(r, c))))
                .collect()
        })
        .collect();
    Worksheet::new(sheet.name.clone(), rows)
}
