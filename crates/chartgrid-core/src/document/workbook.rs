//! Sheets keyed by id, plus which one is active.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::sheet::Sheet;
use crate::error::{GridError, Result};

pub type SheetId = u32;

/// Always holds at least one sheet. Ids are handed out in creation order and
/// never reused, so iteration order is creation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkbookData")]
pub struct Workbook {
    sheets: BTreeMap<SheetId, Sheet>,
    active: SheetId,
    next_id: SheetId,
}

/// Serialized shape of a [`Workbook`], checked before it becomes one.
#[derive(Deserialize)]
struct WorkbookData {
    sheets: BTreeMap<SheetId, Sheet>,
    active: SheetId,
    next_id: SheetId,
}

impl TryFrom<WorkbookData> for Workbook {
    type Error = String;

    /// A stale active id falls back to the first sheet; `next_id` is raised
    /// past every stored id.
    fn try_from(data: WorkbookData) -> std::result::Result<Self, String> {
        let (Some(&first), Some(&last)) =
            (data.sheets.keys().next(), data.sheets.keys().next_back())
        else {
            return Err("workbook has no sheets".to_string());
        };
        let active = if data.sheets.contains_key(&data.active) {
            data.active
        } else {
            log::warn!("active sheet {} not in workbook, using {}", data.active, first);
            first
        };
        let next_id = data
            .next_id
            .max(last.checked_add(1).ok_or_else(|| "sheet id out of range".to_string())?);
        Ok(Self {
            sheets: data.sheets,
            active,
            next_id,
        })
    }
}

impl Workbook {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut sheets = BTreeMap::new();
        sheets.insert(1, Sheet::new("Sheet 1", rows, cols));
        Self {
            sheets,
            active: 1,
            next_id: 2,
        }
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn active_id(&self) -> SheetId {
        self.active
    }

    pub fn set_active(&mut self, id: SheetId) -> Result<()> {
        if !self.sheets.contains_key(&id) {
            return Err(GridError::SheetNotFound(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[&self.active]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        self.sheets
            .get_mut(&self.active)
            .unwrap_or_else(|| unreachable!("active sheet id always exists"))
    }

    pub fn sheet(&self, id: SheetId) -> Result<&Sheet> {
        self.sheets.get(&id).ok_or(GridError::SheetNotFound(id))
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Result<&mut Sheet> {
        self.sheets.get_mut(&id).ok_or(GridError::SheetNotFound(id))
    }

    pub fn sheets(&self) -> impl Iterator<Item = (SheetId, &Sheet)> {
        self.sheets.iter().map(|(id, sheet)| (*id, sheet))
    }

    pub(crate) fn sheets_mut(&mut self) -> impl Iterator<Item = (SheetId, &mut Sheet)> {
        self.sheets.iter_mut().map(|(id, sheet)| (*id, sheet))
    }

    /// `base`, or `base (2)`, `base (3)`, ... whichever is free first.
    pub fn unique_sheet_name(&self, base: &str) -> String {
        let base = base.trim();
        if base.is_empty() {
            return self.next_sheet_name();
        }
        if self.sheet_id_by_name(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{} ({})", base, n))
            .find(|name| self.sheet_id_by_name(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    pub fn sheet_id_by_name(&self, name: &str) -> Option<SheetId> {
        self.sheets
            .iter()
            .find(|(_, sheet)| sheet.name == name)
            .map(|(id, _)| *id)
    }

    /// First free "Sheet N" name.
    pub fn next_sheet_name(&self) -> String {
        (self.sheets.len() + 1..)
            .map(|n| format!("Sheet {}", n))
            .find(|name| self.sheet_id_by_name(name).is_none())
            .unwrap_or_else(|| format!("Sheet {}", self.next_id))
    }

    /// Add a sheet sized `rows x cols`. A missing or blank name gets the next
    /// "Sheet N" name.
    pub fn add_sheet(&mut self, name: Option<&str>, rows: usize, cols: usize) -> SheetId {
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.next_sheet_name(),
        };
        let id = self.next_id;
        self.next_id += 1;
        self.sheets.insert(id, Sheet::new(name, rows, cols));
        id
    }

    pub fn rename_sheet(&mut self, id: SheetId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        self.sheet_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Remove a sheet. The last remaining sheet cannot be deleted. Deleting the
    /// active sheet activates its nearest predecessor.
    pub fn delete_sheet(&mut self, id: SheetId) -> Result<Sheet> {
        if !self.sheets.contains_key(&id) {
            return Err(GridError::SheetNotFound(id));
        }
        if self.sheets.len() == 1 {
            return Err(GridError::LastSheet);
        }
        let removed = self
            .sheets
            .remove(&id)
            .ok_or(GridError::SheetNotFound(id))?;
        if self.active == id {
            self.active = self
                .sheets
                .range(..id)
                .next_back()
                .or_else(|| self.sheets.iter().next())
                .map(|(id, _)| *id)
                .ok_or(GridError::LastSheet)?;
        }
        Ok(removed)
    }

    pub fn empty_sheet_ids(&self) -> Vec<SheetId> {
        self.sheets
            .iter()
            .filter(|(_, sheet)| sheet.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgrid_engine::engine::CellRef;

    #[test]
    fn test_new_workbook_has_one_active_sheet() {
        let book = Workbook::new(10, 5);
        assert_eq!(book.len(), 1);
        assert_eq!(book.active_sheet().name, "Sheet 1");
        assert_eq!(book.active_sheet().row_count(), 10);
    }

    #[test]
    fn test_sequential_names_skip_taken_ones() {
        let mut book = Workbook::new(2, 2);
        let id = book.add_sheet(None, 2, 2);
        assert_eq!(book.sheet(id).unwrap().name, "Sheet 2");
        book.rename_sheet(id, "Sheet 3").unwrap();
        let next = book.add_sheet(Some("  "), 2, 2);
        assert_eq!(book.sheet(next).unwrap().name, "Sheet 4");
    }

    #[test]
    fn test_last_sheet_cannot_be_deleted() {
        let mut book = Workbook::new(2, 2);
        assert!(matches!(book.delete_sheet(1), Err(GridError::LastSheet)));
        assert!(matches!(book.delete_sheet(9), Err(GridError::SheetNotFound(9))));
    }

    #[test]
    fn test_deleting_active_sheet_moves_activation() {
        let mut book = Workbook::new(2, 2);
        let second = book.add_sheet(Some("Data"), 2, 2);
        book.set_active(second).unwrap();
        book.delete_sheet(second).unwrap();
        assert_eq!(book.active_id(), 1);

        let third = book.add_sheet(None, 2, 2);
        book.delete_sheet(1).unwrap();
        assert_eq!(book.active_id(), third);
    }

    #[test]
    fn test_empty_sheet_ids() {
        let mut book = Workbook::new(2, 2);
        let second = book.add_sheet(None, 2, 2);
        book.active_sheet_mut()
            .set_input(CellRef::new(0, 0), "x")
            .unwrap();
        assert_eq!(book.empty_sheet_ids(), vec![second]);
    }

    fn data(ids: &[SheetId], active: SheetId, next_id: SheetId) -> WorkbookData {
        WorkbookData {
            sheets: ids
                .iter()
                .map(|id| (*id, Sheet::new(format!("Sheet {}", id), 2, 2)))
                .collect(),
            active,
            next_id,
        }
    }

    #[test]
    fn test_stored_workbook_with_stale_active_id_is_repaired() {
        let mut book = Workbook::try_from(data(&[3, 5], 9, 1)).unwrap();
        assert_eq!(book.active_id(), 3);
        assert_eq!(book.active_sheet().name, "Sheet 3");
        assert_eq!(book.active_sheet_mut().row_count(), 2);

        let id = book.add_sheet(None, 2, 2);
        assert_eq!(id, 6);
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_stored_workbook_without_usable_ids_is_rejected() {
        assert!(Workbook::try_from(data(&[], 1, 2)).is_err());
        assert!(Workbook::try_from(data(&[SheetId::MAX], SheetId::MAX, 1)).is_err());
    }
}
