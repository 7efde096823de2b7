//! Built-in spreadsheet functions (Rust).
//!
//! Conventions:
//! - Spreadsheet-facing built-in names are ALL CAPS (e.g. `SUM`, `AVERAGE`).
//! - Preprocessing rewrites references into `CELL`, `VALUE` and `RANGE`
//!   calls; everything else here is called by name from formulas.
//! - A cell holding an error marker fails any read of it with that marker,
//!   so errors flow through dependent formulas.

use rhai::{Array, Dynamic, Engine, EvalAltResult, Position};

use crate::engine::{CellRef, FormulaError, MAX_DEPENDENCY_RANGE_CELLS, ValueCache};
use crate::engine::{fixed_decimal_string, format_number, money_string};

const MAX_DECIMALS: i64 = 12;

type BuiltinResult<T> = Result<T, Box<EvalAltResult>>;

/// Fail a call with a cell error marker. The marker travels as the runtime
/// error's payload text (`#VALUE!`, ...) and is recovered by the evaluator.
pub(crate) fn formula_error(e: FormulaError) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(e.marker().to_string()), Position::NONE).into()
}

fn cell_at(row: i64, col: i64) -> BuiltinResult<CellRef> {
    match (usize::try_from(row), usize::try_from(col)) {
        (Ok(row), Ok(col)) => Ok(CellRef::new(row, col)),
        _ => Err(formula_error(FormulaError::Ref)),
    }
}

fn error_in(value: &Dynamic) -> Option<FormulaError> {
    value.clone().try_cast::<FormulaError>()
}

/// Strict numeric reading: blanks are 0, numeric text parses, other text is `#VALUE!`.
fn to_number(value: &Dynamic) -> BuiltinResult<f64> {
    if let Some(e) = error_in(value) {
        return Err(formula_error(e));
    }
    if let Ok(n) = value.as_float() {
        return Ok(n);
    }
    if let Ok(n) = value.as_int() {
        return Ok(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(if b { 1.0 } else { 0.0 });
    }
    if value.is_unit() {
        return Ok(0.0);
    }
    if let Some(s) = value.read_lock::<rhai::ImmutableString>() {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        return trimmed
            .parse::<f64>()
            .map_err(|_| formula_error(FormulaError::Value));
    }
    Err(formula_error(FormulaError::Value))
}

fn to_text(value: &Dynamic) -> BuiltinResult<String> {
    if let Some(e) = error_in(value) {
        return Err(formula_error(e));
    }
    if let Ok(n) = value.as_float() {
        return Ok(format_number(n));
    }
    if let Ok(n) = value.as_int() {
        return Ok(n.to_string());
    }
    if let Ok(b) = value.as_bool() {
        return Ok(if b { "TRUE" } else { "FALSE" }.to_string());
    }
    if value.is_unit() {
        return Ok(String::new());
    }
    if value.is_array() {
        return Err(formula_error(FormulaError::Value));
    }
    Ok(value.to_string())
}

fn truthy(value: &Dynamic) -> BuiltinResult<bool> {
    if let Ok(b) = value.as_bool() {
        return Ok(b);
    }
    if let Some(s) = value.read_lock::<rhai::ImmutableString>() {
        return match s.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Ok(true),
            "FALSE" | "" => Ok(false),
            _ => Err(formula_error(FormulaError::Value)),
        };
    }
    to_number(value).map(|n| n != 0.0)
}

/// Arguments with arrays (ranges) expanded in place.
fn flatten(args: &[Dynamic]) -> Vec<Dynamic> {
    let mut out = Vec::new();
    for arg in args {
        match arg.read_lock::<Array>() {
            Some(items) => out.extend(flatten(&items)),
            None => out.push(arg.clone()),
        }
    }
    out
}

/// Numeric items of the arguments. Text and blanks are skipped; error
/// markers fail the whole call.
fn numbers(args: &[Dynamic]) -> BuiltinResult<Vec<f64>> {
    let mut out = Vec::new();
    for item in flatten(args) {
        if let Some(e) = error_in(&item) {
            return Err(formula_error(e));
        }
        if let Ok(n) = item.as_float() {
            out.push(n);
        } else if let Ok(n) = item.as_int() {
            out.push(n as f64);
        }
    }
    Ok(out)
}

fn sum(args: &[Dynamic]) -> BuiltinResult<f64> {
    Ok(numbers(args)?.iter().sum())
}

fn average(args: &[Dynamic]) -> BuiltinResult<f64> {
    let values = numbers(args)?;
    if values.is_empty() {
        return Err(formula_error(FormulaError::DivZero));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn count(args: &[Dynamic]) -> BuiltinResult<f64> {
    let n = flatten(args)
        .iter()
        .filter(|v| v.is_float() || v.is_int())
        .count();
    Ok(n as f64)
}

fn count_non_empty(args: &[Dynamic]) -> BuiltinResult<f64> {
    let n = flatten(args)
        .iter()
        .filter(|v| {
            if v.is_unit() {
                return false;
            }
            match v.read_lock::<rhai::ImmutableString>() {
                Some(s) => !s.is_empty(),
                None => true,
            }
        })
        .count();
    Ok(n as f64)
}

fn min(args: &[Dynamic]) -> BuiltinResult<f64> {
    Ok(numbers(args)?.into_iter().reduce(f64::min).unwrap_or(0.0))
}

fn max(args: &[Dynamic]) -> BuiltinResult<f64> {
    Ok(numbers(args)?.into_iter().reduce(f64::max).unwrap_or(0.0))
}

fn concat(args: &[Dynamic]) -> BuiltinResult<String> {
    flatten(args).iter().map(to_text).collect()
}

fn decimal_places(value: &Dynamic) -> BuiltinResult<usize> {
    let n = to_number(value)?.trunc() as i64;
    if !(0..=MAX_DECIMALS).contains(&n) {
        return Err(formula_error(FormulaError::Value));
    }
    Ok(n as usize)
}

fn round_to(n: f64, digits: i64) -> f64 {
    let digits = digits.clamp(-MAX_DECIMALS, MAX_DECIMALS) as i32;
    if digits < 0 {
        let factor = 10f64.powi(-digits);
        return (n / factor).round() * factor;
    }
    let factor = 10f64.powi(digits);
    // Nudge by one ulp so 2.345 (stored as 2.34499...) rounds the way it reads.
    let scaled = n * factor;
    (scaled + scaled * f64::EPSILON).round() / factor
}

/// Register `name` for one to four arguments, any of which may be a range.
fn register_variadic<R: Clone + Send + Sync + 'static>(
    engine: &mut Engine,
    name: &str,
    f: fn(&[Dynamic]) -> BuiltinResult<R>,
) {
    engine.register_fn(name, move |a: Dynamic| f(&[a]));
    engine.register_fn(name, move |a: Dynamic, b: Dynamic| f(&[a, b]));
    engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| f(&[a, b, c]));
    engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        f(&[a, b, c, d])
    });
}

/// Register all built-in functions into the Rhai engine.
pub fn register_builtins(engine: &mut Engine, value_cache: ValueCache) {
    // CELL(row, col): numeric value at cell. Blank or unknown cells are 0.
    let cache_cell = value_cache.clone();
    engine.register_fn("CELL", move |row: i64, col: i64| -> BuiltinResult<f64> {
        let cell = cell_at(row, col)?;
        match cache_cell.get(&cell) {
            Some(value) => to_number(value.value()),
            None => Ok(0.0),
        }
    });

    // VALUE(row, col): typed value at cell. Blank or unknown cells are "".
    let cache_value = value_cache.clone();
    engine.register_fn("VALUE", move |row: i64, col: i64| -> BuiltinResult<Dynamic> {
        let cell = cell_at(row, col)?;
        let Some(value) = cache_value.get(&cell) else {
            return Ok(Dynamic::from(String::new()));
        };
        if let Some(e) = error_in(value.value()) {
            return Err(formula_error(e));
        }
        Ok(value.value().clone())
    });

    // RANGE(r1, c1, r2, c2): typed values, row-major, corners in any order.
    // Errors are kept as items so aggregates decide what to do with them.
    let cache_range = value_cache;
    engine.register_fn(
        "RANGE",
        move |r1: i64, c1: i64, r2: i64, c2: i64| -> BuiltinResult<Array> {
            let start = cell_at(r1.min(r2), c1.min(c2))?;
            let end = cell_at(r1.max(r2), c1.max(c2))?;
            let cells = (end.row - start.row + 1).saturating_mul(end.col - start.col + 1);
            if cells > MAX_DEPENDENCY_RANGE_CELLS {
                return Err(formula_error(FormulaError::Ref));
            }

            let mut result = Array::with_capacity(cells);
            for row in start.row..=end.row {
                for col in start.col..=end.col {
                    let value = cache_range
                        .get(&CellRef::new(row, col))
                        .map(|v| v.value().clone())
                        .unwrap_or_else(|| Dynamic::from(String::new()));
                    result.push(value);
                }
            }
            Ok(result)
        },
    );

    engine.register_fn("REF_ERROR", || -> BuiltinResult<Dynamic> {
        Err(formula_error(FormulaError::Ref))
    });

    register_variadic(engine, "SUM", sum);
    register_variadic(engine, "AVERAGE", average);
    register_variadic(engine, "AVG", average);
    register_variadic(engine, "COUNT", count);
    register_variadic(engine, "COUNTA", count_non_empty);
    register_variadic(engine, "MIN", min);
    register_variadic(engine, "MAX", max);
    register_variadic(engine, "CONCAT", concat);

    // IF(cond, then, else)
    engine.register_fn(
        "IF",
        |cond: Dynamic, then: Dynamic, otherwise: Dynamic| -> BuiltinResult<Dynamic> {
            if let Some(e) = error_in(&cond) {
                return Err(formula_error(e));
            }
            Ok(if truthy(&cond)? { then } else { otherwise })
        },
    );

    engine.register_fn("ABS", |x: Dynamic| -> BuiltinResult<f64> {
        Ok(to_number(&x)?.abs())
    });

    // ROUND(x[, digits]): half away from zero; negative digits round left of the point.
    engine.register_fn("ROUND", |x: Dynamic| -> BuiltinResult<f64> {
        Ok(round_to(to_number(&x)?, 0))
    });
    engine.register_fn("ROUND", |x: Dynamic, digits: Dynamic| -> BuiltinResult<f64> {
        let digits = to_number(&digits)?.trunc() as i64;
        Ok(round_to(to_number(&x)?, digits))
    });

    engine.register_fn("UPPER", |s: Dynamic| -> BuiltinResult<String> {
        Ok(to_text(&s)?.to_uppercase())
    });
    engine.register_fn("LOWER", |s: Dynamic| -> BuiltinResult<String> {
        Ok(to_text(&s)?.to_lowercase())
    });
    engine.register_fn("LEN", |s: Dynamic| -> BuiltinResult<f64> {
        Ok(to_text(&s)?.chars().count() as f64)
    });

    // FIXED(n, decimals): format with a fixed number of decimal places.
    engine.register_fn("FIXED", |n: Dynamic, decimals: Dynamic| -> BuiltinResult<String> {
        Ok(fixed_decimal_string(to_number(&n)?, decimal_places(&decimals)?))
    });

    // MONEY(n[, symbol[, decimals]]): currency text, thousands grouped.
    //   MONEY(1234.5)         -> "$1,234.50"
    //   MONEY(-2, "£", 0)     -> "-£2"
    engine.register_fn("MONEY", |n: Dynamic| -> BuiltinResult<String> {
        Ok(money_string(to_number(&n)?, "$", 2))
    });
    engine.register_fn("MONEY", |n: Dynamic, symbol: &str| -> BuiltinResult<String> {
        Ok(money_string(to_number(&n)?, symbol, 2))
    });
    engine.register_fn(
        "MONEY",
        |n: Dynamic, symbol: &str, decimals: Dynamic| -> BuiltinResult<String> {
            Ok(money_string(to_number(&n)?, symbol, decimal_places(&decimals)?))
        },
    );
}
