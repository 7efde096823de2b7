//! Rhai engine creation and formula evaluation.
//!
//! A [`FormulaEngine`] owns a Rhai engine with the spreadsheet built-ins
//! registered against a shared [`ValueCache`]. Callers load the cells a
//! formula may read into the cache, evaluate, and store the result back so
//! later formulas see it.

use dashmap::DashMap;
use rhai::{Dynamic, Engine, EvalAltResult};
use std::sync::Arc;

use super::cell::{CellValue, FormulaError};
use super::cell_ref::CellRef;
use super::preprocess::preprocess_formula;

/// Evaluated cell values keyed by position, shared with the registered built-ins.
pub type ValueCache = Arc<DashMap<CellRef, Dynamic>>;

/// Operation budget for a single formula. Stops runaway scripts.
pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

pub struct FormulaEngine {
    engine: Engine,
    cache: ValueCache,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormulaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaEngine")
            .field("cached_cells", &self.cache.len())
            .finish()
    }
}

impl FormulaEngine {
    pub fn new() -> Self {
        Self::with_cache(ValueCache::default())
    }

    pub fn with_cache(cache: ValueCache) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(DEFAULT_MAX_OPERATIONS);
        engine.set_max_expr_depths(64, 32);
        crate::builtins::register_builtins(&mut engine, cache.clone());
        Self { engine, cache }
    }

    pub fn set_max_operations(&mut self, operations: u64) {
        self.engine.set_max_operations(operations);
    }

    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    /// Forget every loaded value.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Make `value` visible to formulas reading `cell`.
    pub fn load(&self, cell: CellRef, value: &CellValue) {
        match cell_to_dynamic(value) {
            Some(d) => {
                self.cache.insert(cell, d);
            }
            None => {
                self.cache.remove(&cell);
            }
        }
    }

    /// Evaluate a formula (with or without its leading `=`) against the
    /// loaded values. Never fails: problems come back as `CellValue::Error`.
    pub fn evaluate(&self, formula: &str) -> CellValue {
        let script = preprocess_formula(formula);
        if script.trim().is_empty() {
            return CellValue::Error(FormulaError::Parse);
        }
        match self.engine.eval::<Dynamic>(&script) {
            Ok(value) => dynamic_to_cell(value),
            Err(err) => {
                let marker = error_marker(&err);
                log::debug!("formula {:?} failed: {} ({})", formula, marker, err);
                CellValue::Error(marker)
            }
        }
    }

    /// Evaluate the formula for `cell` and load its result for later readers.
    pub fn evaluate_at(&self, cell: CellRef, formula: &str) -> CellValue {
        let value = self.evaluate(formula);
        self.load(cell, &value);
        value
    }
}

/// How a stored cell looks to formulas. None means blank.
pub fn cell_to_dynamic(value: &CellValue) -> Option<Dynamic> {
    match value {
        CellValue::Empty => None,
        CellValue::Text(s) => Some(Dynamic::from(s.clone())),
        CellValue::Number(n) => Some(Dynamic::from(*n)),
        CellValue::Date(d) => Some(match d.serial {
            Some(serial) => Dynamic::from(serial),
            None => Dynamic::from(d.display.clone()),
        }),
        CellValue::ChartAnchor(_) | CellValue::ChartOccupied => {
            Some(Dynamic::from(FormulaError::Value))
        }
        CellValue::Error(e) => Some(Dynamic::from(*e)),
    }
}

/// Turn a formula result into a cell value.
pub fn dynamic_to_cell(value: Dynamic) -> CellValue {
    if value.is_unit() {
        return CellValue::Empty;
    }
    if let Ok(n) = value.as_float() {
        return number_result(n);
    }
    if let Ok(n) = value.as_int() {
        return CellValue::Number(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return CellValue::text(if b { "TRUE" } else { "FALSE" });
    }
    if value.is_array() || value.is_map() {
        return CellValue::Error(FormulaError::Value);
    }
    if let Some(e) = value.clone().try_cast::<FormulaError>() {
        return CellValue::Error(e);
    }
    if value.is_string() {
        return CellValue::Text(value.to_string());
    }
    CellValue::Error(FormulaError::Value)
}

fn number_result(n: f64) -> CellValue {
    if n.is_nan() {
        CellValue::Error(FormulaError::Value)
    } else if n.is_infinite() {
        CellValue::Error(FormulaError::DivZero)
    } else {
        CellValue::Number(n)
    }
}

/// Map a Rhai failure to the marker shown in the cell.
pub fn error_marker(err: &EvalAltResult) -> FormulaError {
    match err {
        EvalAltResult::ErrorParsing(..) => FormulaError::Parse,
        EvalAltResult::ErrorVariableNotFound(..) | EvalAltResult::ErrorFunctionNotFound(..) => {
            FormulaError::Name
        }
        EvalAltResult::ErrorArithmetic(..) => FormulaError::DivZero,
        EvalAltResult::ErrorRuntime(payload, _) => payload
            .read_lock::<rhai::ImmutableString>()
            .and_then(|s| FormulaError::from_marker(s.as_str()))
            .unwrap_or(FormulaError::Value),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => error_marker(inner),
        _ => FormulaError::Value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DateValue;

    fn engine_with(values: &[(&str, CellValue)]) -> FormulaEngine {
        let engine = FormulaEngine::new();
        for (a1, value) in values {
            engine.load(CellRef::from_a1(a1).unwrap(), value);
        }
        engine
    }

    #[test]
    fn test_arithmetic_is_floating_point() {
        let engine = engine_with(&[]);
        assert_eq!(engine.evaluate("=10/4"), CellValue::Number(2.5));
        assert_eq!(engine.evaluate("=2^10"), CellValue::Number(1024.0));
    }

    #[test]
    fn test_references_and_ranges() {
        let engine = engine_with(&[
            ("A1", CellValue::Number(2.0)),
            ("A2", CellValue::Number(3.0)),
            ("B1", CellValue::text("x")),
        ]);
        assert_eq!(engine.evaluate("=A1*A2"), CellValue::Number(6.0));
        assert_eq!(engine.evaluate("=SUM(A1:A2) + C9"), CellValue::Number(5.0));
        assert_eq!(engine.evaluate("=CONCAT(@B1, @C9)"), CellValue::text("x"));
    }

    #[test]
    fn test_error_markers() {
        let engine = engine_with(&[
            ("A1", CellValue::text("abc")),
            ("A2", CellValue::Error(FormulaError::Cycle)),
            ("A3", CellValue::ChartOccupied),
        ]);
        assert_eq!(engine.evaluate("=1/0"), CellValue::Error(FormulaError::DivZero));
        assert_eq!(engine.evaluate("=A1+1"), CellValue::Error(FormulaError::Value));
        assert_eq!(engine.evaluate("=A2*2"), CellValue::Error(FormulaError::Cycle));
        assert_eq!(engine.evaluate("=A3"), CellValue::Error(FormulaError::Value));
        assert_eq!(engine.evaluate("=NOPE(1)"), CellValue::Error(FormulaError::Name));
        assert_eq!(engine.evaluate("=foo + 1"), CellValue::Error(FormulaError::Name));
        assert_eq!(engine.evaluate("=(1+"), CellValue::Error(FormulaError::Parse));
        assert_eq!(engine.evaluate("=#REF!"), CellValue::Error(FormulaError::Ref));
        assert_eq!(engine.evaluate("=A1:A3"), CellValue::Error(FormulaError::Value));
    }

    #[test]
    fn test_runaway_script_is_stopped() {
        let mut engine = engine_with(&[]);
        engine.set_max_operations(1_000);
        assert_eq!(
            engine.evaluate("=loop { }"),
            CellValue::Error(FormulaError::Value)
        );
    }

    #[test]
    fn test_dates_read_as_serials() {
        let engine = engine_with(&[(
            "A1",
            CellValue::Date(DateValue {
                display: "2024-01-01".into(),
                serial: Some(45_292.0),
            }),
        )]);
        assert_eq!(engine.evaluate("=A1+1"), CellValue::Number(45_293.0));
    }

    #[test]
    fn test_evaluate_at_loads_result() {
        let engine = engine_with(&[("A1", CellValue::Number(4.0))]);
        let b1 = CellRef::from_a1("B1").unwrap();
        assert_eq!(engine.evaluate_at(b1, "=A1*2"), CellValue::Number(8.0));
        assert_eq!(engine.evaluate("=B1+1"), CellValue::Number(9.0));
    }

    #[test]
    fn test_text_and_boolean_results() {
        let engine = engine_with(&[]);
        assert_eq!(engine.evaluate(r#"="hi""#), CellValue::text("hi"));
        assert_eq!(engine.evaluate("=1 < 2"), CellValue::text("TRUE"));
        assert_eq!(engine.evaluate("=IF(1 = 1, 10, 20)"), CellValue::Number(10.0));
    }
}
