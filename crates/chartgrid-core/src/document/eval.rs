//! Recalculation: evaluate every formula of a sheet in dependency order.

use chartgrid_engine::engine::{
    CellRef, CellValue, DepGraph, FormulaEngine, FormulaError, describe_cycle, detect_cycle,
};

use super::sheet::Sheet;
use super::state::Document;

/// What a recalculation pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecalcSummary {
    pub evaluated: usize,
    pub cyclic: usize,
}

/// Make every non-empty cell of `sheet` visible to formulas.
fn load_sheet(engine: &FormulaEngine, sheet: &Sheet) {
    engine.clear();
    for (r, row) in sheet.rows().iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !matches!(value, CellValue::Empty) {
                engine.load(CellRef::new(r, c), value);
            }
        }
    }
}

/// Re-evaluate all formulas of `sheet`.
///
/// Formula cells are ordered topologically over the references between them.
/// Cells that cannot be ordered (on a cycle, or reading from one) get
/// `#CYCLE!`; everything else is evaluated after the formulas it reads.
pub(crate) fn recalculate_sheet(engine: &FormulaEngine, sheet: &mut Sheet) -> RecalcSummary {
    if !sheet.has_formulas() {
        return RecalcSummary::default();
    }
    load_sheet(engine, sheet);

    let formulas: Vec<(CellRef, String)> = sheet
        .formulas()
        .map(|(cell, formula)| (*cell, formula.clone()))
        .collect();
    let graph = DepGraph::from_formulas(formulas.iter().map(|(c, f)| (*c, f.as_str())));
    let order = graph.evaluation_order();

    if let Some(first) = order.cyclic.first() {
        match detect_cycle(first, &graph) {
            Some(path) => log::warn!("circular reference: {}", describe_cycle(&path)),
            None => log::warn!("{} cells depend on a circular reference", order.cyclic.len()),
        }
    }
    for cell in &order.cyclic {
        let value = CellValue::Error(FormulaError::Cycle);
        engine.load(*cell, &value);
        sheet.put(*cell, value);
    }

    let by_cell: std::collections::BTreeMap<CellRef, &str> =
        formulas.iter().map(|(c, f)| (*c, f.as_str())).collect();
    for cell in &order.ordered {
        if let Some(formula) = by_cell.get(cell) {
            let value = engine.evaluate_at(*cell, formula);
            sheet.put(*cell, value);
        }
    }

    let summary = RecalcSummary {
        evaluated: order.ordered.len(),
        cyclic: order.cyclic.len(),
    };
    log::debug!(
        "recalculated sheet {:?}: {} formulas, {} cyclic",
        sheet.name,
        summary.evaluated,
        summary.cyclic
    );
    summary
}

impl Document {
    /// Recalculate the active sheet.
    pub fn recalculate(&mut self) -> RecalcSummary {
        recalculate_sheet(&self.engine, self.workbook.active_sheet_mut())
    }

    pub fn recalculate_all(&mut self) {
        for (_, sheet) in self.workbook.sheets_mut() {
            recalculate_sheet(&self.engine, sheet);
        }
    }

    /// Evaluate a formula against the active sheet without storing it.
    pub fn evaluate(&self, formula: &str) -> CellValue {
        let formula = formula.trim();
        if formula == "=" {
            return CellValue::text("=");
        }
        load_sheet(&self.engine, self.sheet());
        self.engine.evaluate(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a1(name: &str) -> CellRef {
        CellRef::from_a1(name).unwrap()
    }

    #[test]
    fn test_recalc_orders_by_dependency() {
        let engine = FormulaEngine::new();
        let mut sheet = Sheet::new("Sheet 1", 5, 5);
        sheet.set_input(a1("A1"), "=B1*2").unwrap();
        sheet.set_input(a1("B1"), "=C1+1").unwrap();
        sheet.set_input(a1("C1"), "4").unwrap();
        let summary = recalculate_sheet(&engine, &mut sheet);
        assert_eq!(summary, RecalcSummary { evaluated: 2, cyclic: 0 });
        assert_eq!(sheet.get(a1("A1")), &CellValue::Number(10.0));
    }

    #[test]
    fn test_cycle_becomes_marker_and_others_continue() {
        let engine = FormulaEngine::new();
        let mut sheet = Sheet::new("Sheet 1", 5, 5);
        sheet.set_input(a1("A1"), "=A2").unwrap();
        sheet.set_input(a1("A2"), "=A1").unwrap();
        sheet.set_input(a1("B1"), "=1/0").unwrap();
        sheet.set_input(a1("C1"), "=2+2").unwrap();
        let summary = recalculate_sheet(&engine, &mut sheet);
        assert_eq!(summary.cyclic, 2);
        assert_eq!(sheet.get(a1("A1")), &CellValue::Error(FormulaError::Cycle));
        assert_eq!(sheet.get(a1("B1")), &CellValue::Error(FormulaError::DivZero));
        assert_eq!(sheet.get(a1("C1")), &CellValue::Number(4.0));
        assert_eq!(sheet.formula(a1("A1")), Some("=A2"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let engine = FormulaEngine::new();
        let mut sheet = Sheet::new("Sheet 1", 2, 2);
        sheet.set_input(a1("A1"), "=A1+1").unwrap();
        recalculate_sheet(&engine, &mut sheet);
        assert_eq!(sheet.get(a1("A1")), &CellValue::Error(FormulaError::Cycle));
    }
}
