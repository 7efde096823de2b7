//! Chart footprints inside a sheet.
//!
//! A chart lives in its anchor cell as `CellValue::ChartAnchor`; every other
//! cell of its `width x height` footprint holds `CellValue::ChartOccupied`.
//! Footprints never overlap. Every operation clears the old footprint before
//! marking the new one.

use chartgrid_engine::engine::{CellRef, CellValue};
use chartgrid_engine::{Chart, ChartSize, chart::footprint_cells};

use super::sheet::Sheet;
use crate::error::{GridError, Result};

fn rects_intersect(a: CellRef, a_size: ChartSize, b: CellRef, b_size: ChartSize) -> bool {
    a.row < b.row.saturating_add(b_size.height)
        && b.row < a.row.saturating_add(a_size.height)
        && a.col < b.col.saturating_add(b_size.width)
        && b.col < a.col.saturating_add(a_size.width)
}

impl Sheet {
    /// Every chart on the sheet, in row-major anchor order.
    pub fn charts(&self) -> Vec<&Chart> {
        self.rows()
            .iter()
            .flatten()
            .filter_map(CellValue::as_chart)
            .collect()
    }

    /// The chart whose footprint covers `cell`, if any.
    pub fn chart_at(&self, cell: CellRef) -> Option<&Chart> {
        match self.get(cell) {
            CellValue::ChartAnchor(chart) => Some(chart),
            CellValue::ChartOccupied => self.charts().into_iter().find(|c| c.contains(cell)),
            _ => None,
        }
    }

    /// Whether a footprint of `size` at `anchor` stays clear of every chart
    /// other than the one anchored at `ignore`.
    pub fn footprint_is_free(
        &self,
        anchor: CellRef,
        size: ChartSize,
        ignore: Option<CellRef>,
    ) -> bool {
        self.charts()
            .into_iter()
            .filter(|c| Some(c.anchor) != ignore)
            .all(|c| !rects_intersect(anchor, size, c.anchor, c.size))
    }

    /// Put `chart` down with its anchor at `anchor`, growing the grid to fit.
    /// Whatever was under the footprint (values and formulas) is replaced.
    /// An existing chart anchored at exactly `anchor` is replaced as well.
    pub fn place_chart(&mut self, anchor: CellRef, mut chart: Chart) -> Result<CellRef> {
        let size = chart.size;
        let Some(end) = size.end_from(anchor).filter(|_| size.is_valid()) else {
            return Err(GridError::InvalidChartSize {
                width: size.width,
                height: size.height,
            });
        };
        if !self.footprint_is_free(anchor, size, Some(anchor)) {
            log::warn!("chart at {} would overlap another chart", anchor);
            return Err(GridError::ChartOverlap { anchor });
        }
        if matches!(self.get(anchor), CellValue::ChartAnchor(_)) {
            self.delete_chart(anchor)?;
        }

        self.ensure_size(end.row, end.col);
        chart.anchor = anchor;
        for cell in footprint_cells(anchor, size) {
            self.remove_formula(cell);
            if cell == anchor {
                continue;
            }
            self.put(cell, CellValue::ChartOccupied);
        }
        self.put(anchor, CellValue::ChartAnchor(Box::new(chart)));
        Ok(anchor)
    }

    /// Remove the chart anchored at `anchor`, emptying its footprint.
    pub fn delete_chart(&mut self, anchor: CellRef) -> Result<Chart> {
        let chart = match self.get(anchor) {
            CellValue::ChartAnchor(chart) => (**chart).clone(),
            _ => return Err(GridError::NotAChart(anchor)),
        };
        self.clear_footprint(&chart);
        Ok(chart)
    }

    /// Empty the cells that belong to `chart`. Cells of the rectangle that
    /// hold anything else are left alone.
    fn clear_footprint(&mut self, chart: &Chart) {
        for cell in chart.footprint() {
            let owned = match self.get(cell) {
                CellValue::ChartAnchor(c) => cell == chart.anchor && c.anchor == chart.anchor,
                CellValue::ChartOccupied => true,
                _ => false,
            };
            if owned {
                self.put(cell, CellValue::Empty);
            }
        }
    }

    /// Move the chart anchored at `from` so it is anchored at `to`.
    /// A refused move leaves the chart where it was.
    pub fn move_chart(&mut self, from: CellRef, to: CellRef) -> Result<CellRef> {
        let chart = self
            .get(from)
            .as_chart()
            .cloned()
            .ok_or(GridError::NotAChart(from))?;
        if from == to {
            return Ok(from);
        }
        if !self.footprint_is_free(to, chart.size, Some(from)) {
            log::warn!("refusing to move chart {} -> {}: overlap", from, to);
            return Err(GridError::ChartOverlap { anchor: to });
        }

        self.clear_footprint(&chart);
        let placed = self.place_chart(to, chart.clone());
        if placed.is_err() {
            // Restore the original footprint; it was free a moment ago.
            self.place_chart(from, chart)?;
        } else {
            log::debug!("moved chart {} -> {}", from, to);
        }
        placed
    }

    /// Give the chart at `anchor` a new footprint size.
    pub fn resize_chart(&mut self, anchor: CellRef, size: ChartSize) -> Result<CellRef> {
        let chart = self
            .get(anchor)
            .as_chart()
            .cloned()
            .ok_or(GridError::NotAChart(anchor))?;
        if !size.is_valid() || size.end_from(anchor).is_none() {
            return Err(GridError::InvalidChartSize {
                width: size.width,
                height: size.height,
            });
        }
        if !self.footprint_is_free(anchor, size, Some(anchor)) {
            log::warn!("refusing to resize chart at {}: overlap", anchor);
            return Err(GridError::ChartOverlap { anchor });
        }

        self.clear_footprint(&chart);
        let mut resized = chart;
        resized.size = size;
        log::debug!("resized chart at {} to {}x{}", anchor, size.width, size.height);
        self.place_chart(anchor, resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgrid_engine::{ChartKind, ChartRecord};
    use pretty_assertions::assert_eq;

    fn a1(name: &str) -> CellRef {
        CellRef::from_a1(name).unwrap()
    }

    fn chart(width: usize, height: usize) -> Chart {
        let mut chart = Chart::new(ChartKind::Line, vec![ChartRecord::new("Q1").with("Sales", 3.0)]);
        chart.size = ChartSize::new(width, height);
        chart
    }

    /// Cells holding chart variants, row-major.
    fn chart_cells(sheet: &Sheet) -> Vec<(CellRef, bool)> {
        let mut out = Vec::new();
        for (r, row) in sheet.rows().iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                match value {
                    CellValue::ChartAnchor(_) => out.push((CellRef::new(r, c), true)),
                    CellValue::ChartOccupied => out.push((CellRef::new(r, c), false)),
                    _ => {}
                }
            }
        }
        out
    }

    #[test]
    fn test_place_marks_footprint_and_grows_grid() {
        let mut sheet = Sheet::new("Sheet 1", 3, 3);
        sheet.set_input(a1("C2"), "=1").unwrap();
        sheet.place_chart(a1("B2"), chart(3, 2)).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 4);
        assert_eq!(chart_cells(&sheet).len(), 6);
        assert_eq!(sheet.get(a1("C2")), &CellValue::ChartOccupied);
        assert_eq!(sheet.formula(a1("C2")), None);
        assert_eq!(sheet.chart_at(a1("D3")).map(|c| c.anchor), Some(a1("B2")));
        assert!(sheet.chart_at(a1("A1")).is_none());
    }

    #[test]
    fn test_oversized_or_off_grid_footprints_are_refused() {
        let mut sheet = Sheet::new("Sheet 1", 4, 4);
        for (w, h) in [(usize::MAX, 1), (400_000_000, 400_000_000), (0, 2)] {
            let err = sheet.place_chart(a1("B1"), chart(w, h)).unwrap_err();
            assert!(matches!(err, GridError::InvalidChartSize { .. }), "{}x{}", w, h);
        }
        let far = CellRef::new(usize::MAX - 1, 0);
        assert!(matches!(
            sheet.place_chart(far, chart(2, 2)),
            Err(GridError::InvalidChartSize { .. })
        ));
        assert_eq!((sheet.row_count(), sheet.col_count()), (4, 4));

        sheet.place_chart(a1("A1"), chart(1, 1)).unwrap();
        assert!(matches!(
            sheet.resize_chart(a1("A1"), chart(usize::MAX, 1).size),
            Err(GridError::InvalidChartSize { .. })
        ));
        assert_eq!(sheet.chart_at(a1("A1")).map(|c| c.size), Some(ChartSize::new(1, 1)));
    }

    #[test]
    fn test_overlapping_charts_are_refused() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(2, 2)).unwrap();
        let err = sheet.place_chart(a1("B2"), chart(2, 2)).unwrap_err();
        assert!(matches!(err, GridError::ChartOverlap { .. }));
        sheet.place_chart(a1("C1"), chart(2, 2)).unwrap();
        assert_eq!(sheet.charts().len(), 2);
    }

    #[test]
    fn test_move_and_back_restores_footprint() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("B2"), chart(2, 3)).unwrap();
        let before = chart_cells(&sheet);

        assert_eq!(sheet.move_chart(a1("B2"), a1("E5")).unwrap(), a1("E5"));
        assert_eq!(chart_cells(&sheet)[0], (a1("E5"), true));
        assert_eq!(sheet.get(a1("B2")), &CellValue::Empty);

        assert_eq!(sheet.move_chart(a1("E5"), a1("B2")).unwrap(), a1("B2"));
        assert_eq!(chart_cells(&sheet), before);
    }

    #[test]
    fn test_move_onto_overlapping_self_is_allowed() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(3, 3)).unwrap();
        sheet.move_chart(a1("A1"), a1("B2")).unwrap();
        assert_eq!(chart_cells(&sheet).len(), 9);
        assert_eq!(sheet.get(a1("A1")), &CellValue::Empty);
        assert!(sheet.get(a1("B2")).as_chart().is_some());
    }

    #[test]
    fn test_refused_move_keeps_chart_and_neighbour() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(2, 2)).unwrap();
        sheet.place_chart(a1("D1"), chart(2, 2)).unwrap();
        let before = chart_cells(&sheet);
        assert!(sheet.move_chart(a1("A1"), a1("C1")).is_err());
        assert_eq!(chart_cells(&sheet), before);
    }

    #[test]
    fn test_move_same_anchor_and_non_chart_source() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(2, 2)).unwrap();
        assert_eq!(sheet.move_chart(a1("A1"), a1("A1")).unwrap(), a1("A1"));
        assert!(matches!(
            sheet.move_chart(a1("B2"), a1("F6")),
            Err(GridError::NotAChart(_))
        ));
    }

    #[test]
    fn test_resize_remarks_footprint() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(3, 3)).unwrap();
        sheet.resize_chart(a1("A1"), ChartSize::new(2, 1)).unwrap();
        assert_eq!(chart_cells(&sheet), vec![(a1("A1"), true), (a1("B1"), false)]);
        assert_eq!(sheet.chart_at(a1("A1")).map(|c| c.size), Some(ChartSize::new(2, 1)));
        assert!(matches!(
            sheet.resize_chart(a1("A1"), ChartSize::new(0, 2)),
            Err(GridError::InvalidChartSize { .. })
        ));
    }

    #[test]
    fn test_overwriting_anchor_destroys_chart() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(2, 2)).unwrap();
        assert!(matches!(
            sheet.set_input(a1("B2"), "x"),
            Err(GridError::CellOccupiedByChart(_))
        ));
        sheet.set_input(a1("A1"), "x").unwrap();
        assert!(chart_cells(&sheet).is_empty());
        assert_eq!(sheet.get(a1("A1")), &CellValue::text("x"));
    }

    #[test]
    fn test_delete_leaves_neighbours_alone() {
        let mut sheet = Sheet::new("Sheet 1", 10, 10);
        sheet.place_chart(a1("A1"), chart(2, 2)).unwrap();
        sheet.place_chart(a1("C1"), chart(2, 2)).unwrap();
        let removed = sheet.delete_chart(a1("A1")).unwrap();
        assert_eq!(removed.anchor, a1("A1"));
        assert_eq!(chart_cells(&sheet).len(), 4);
        assert!(matches!(sheet.delete_chart(a1("A1")), Err(GridError::NotAChart(_))));
    }
}
