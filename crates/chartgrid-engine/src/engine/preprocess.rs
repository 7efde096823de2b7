//! Formula preprocessing and reference transformation.
//!
//! Before formulas can be evaluated by Rhai, spreadsheet notation must be
//! turned into plain Rhai. This module handles:
//!
//! - **References**: `A1` → `CELL(0, 0)`, `@A1` → `VALUE(0, 0)`,
//!   `A1:B5` → `RANGE(0, 0, 4, 1)` (row/col order), `$` markers ignored
//! - **Operators**: `^` → `**`, `<>` → `!=`, a lone `=` → `==`
//! - **Numbers**: integer literals become floats so `10/4` is `2.5`
//! - **Reference offsetting**: shifting refs when a formula is pasted elsewhere
//!
//! String literals are never touched.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::cell_ref::{CellRef, index_for_label, label_for_index};

/// Placeholder written into a formula when a reference is pushed off the grid.
pub const REF_ERROR_TOKEN: &str = "#REF!";

fn ref_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?<at>@?)(?<start>\$?[A-Za-z]{1,3}\$?[0-9]+)(?::(?<end>\$?[A-Za-z]{1,3}\$?[0-9]+))?",
        )
        .expect("formula reference regex must compile")
    })
}

fn ref_piece_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<col_abs>\$?)(?<letters>[A-Za-z]+)(?<row_abs>\$?)(?<digits>[0-9]+)$")
            .expect("reference piece regex must compile")
    })
}

/// Strip the leading `=` of a formula, if present.
pub fn formula_body(formula: &str) -> &str {
    formula.trim_start().strip_prefix('=').unwrap_or(formula)
}

/// Turn a spreadsheet formula (with or without its leading `=`) into a Rhai script.
pub fn preprocess_formula(formula: &str) -> String {
    map_outside_strings(formula_body(formula), |seg| {
        let seg = seg.replace(REF_ERROR_TOKEN, "REF_ERROR()");
        let seg = rewrite_operators(&seg);
        let seg = floatify_integers(&seg);
        rewrite_references(&seg, |typed, start, end| {
            let start = CellRef::from_a1(start)?;
            Some(match end {
                Some(end) => {
                    let end = CellRef::from_a1(end)?;
                    format!("RANGE({}, {}, {}, {})", start.row, start.col, end.row, end.col)
                }
                None if typed => format!("VALUE({}, {})", start.row, start.col),
                None => format!("CELL({}, {})", start.row, start.col),
            })
        })
    })
}

/// Offset all relative cell references in a formula by a row/column delta.
/// Used by copy/paste so pasted formulas preserve relative references.
///
/// Rules:
/// - `A1` offset by (+2 rows, +1 col) becomes `B3`
/// - `@A1` keeps its `@`
/// - `$` pins the column or row it precedes
/// - range refs are offset on both ends: `SUM(A1:B2)` -> `SUM(B3:C4)`
/// - a ref (or range) that moves off the top/left edge becomes `#REF!`
pub fn offset_formula_references(formula: &str, delta_row: isize, delta_col: isize) -> String {
    if delta_row == 0 && delta_col == 0 {
        return formula.to_string();
    }

    let (prefix, body) = match formula.trim_start().strip_prefix('=') {
        Some(body) => ("=", body),
        None => ("", formula),
    };

    let shifted = map_outside_strings(body, |seg| {
        rewrite_references(seg, |typed, start, end| {
            let start = offset_ref_piece(start, delta_row, delta_col);
            let end = end.map(|e| offset_ref_piece(e, delta_row, delta_col));
            let rewritten = match (start, end) {
                (Some(Some(s)), None) => format!("{}{}", if typed { "@" } else { "" }, s),
                (Some(Some(s)), Some(Some(Some(e)))) => format!("{}:{}", s, e),
                (Some(None), _) | (_, Some(Some(None))) => REF_ERROR_TOKEN.to_string(),
                _ => return None,
            };
            Some(rewritten)
        })
    });
    format!("{}{}", prefix, shifted)
}

/// Outer None: not a reference at all. Inner None: pushed off the grid.
fn offset_ref_piece(piece: &str, delta_row: isize, delta_col: isize) -> Option<Option<String>> {
    let caps = ref_piece_re().captures(piece)?;
    let col = index_for_label(&caps["letters"])?;
    let row = caps["digits"].parse::<usize>().ok()?.checked_sub(1)?;
    let col_abs = &caps["col_abs"];
    let row_abs = &caps["row_abs"];

    let new_col = if col_abs.is_empty() {
        col.checked_add_signed(delta_col)
    } else {
        Some(col)
    };
    let new_row = if row_abs.is_empty() {
        row.checked_add_signed(delta_row)
    } else {
        Some(row)
    };

    Some(match (new_row, new_col) {
        (Some(r), Some(c)) => Some(format!(
            "{}{}{}{}",
            col_abs,
            label_for_index(c),
            row_abs,
            r + 1
        )),
        _ => None,
    })
}

/// Rewrite every reference token in `seg`. `f(typed, start, end)` returns
/// the replacement, or None to leave the token alone. Tokens glued to other
/// identifier characters, or followed by `(` (function names like `LOG10`),
/// are not references.
fn rewrite_references<F>(seg: &str, mut f: F) -> String
where
    F: FnMut(bool, &str, Option<&str>) -> Option<String>,
{
    ref_token_re()
        .replace_all(seg, |caps: &Captures| {
            let whole = &caps[0];
            let Some(m) = caps.get(0) else {
                return whole.to_string();
            };
            let before = seg[..m.start()].chars().next_back();
            let after = seg[m.end()..].chars().next();
            let glued_before = before.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.');
            let glued_after = after.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '(');
            if glued_before || glued_after {
                return whole.to_string();
            }

            let typed = !caps["at"].is_empty();
            let end = caps.name("end").map(|m| m.as_str());
            f(typed, &caps["start"], end).unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

fn rewrite_operators(seg: &str) -> String {
    let seg = seg.replace("<>", "!=").replace('^', "**");
    let chars: Vec<char> = seg.chars().collect();
    let mut out = String::with_capacity(seg.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '=' {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let lone = !matches!(prev, Some('=' | '!' | '<' | '>')) && next != Some('=');
            if lone {
                out.push_str("==");
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// `3` -> `3.0`, leaving floats, exponents and digits inside identifiers alone.
fn floatify_integers(seg: &str) -> String {
    let chars: Vec<char> = seg.chars().collect();
    let mut out = String::with_capacity(seg.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_ascii_digit() {
            out.push(ch);
            i += 1;
            continue;
        }

        let in_identifier = i > 0
            && (chars[i - 1].is_alphanumeric() || matches!(chars[i - 1], '_' | '.' | '$'));
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '.'))
        {
            i += 1;
            let exponent_sign = i < chars.len()
                && matches!(chars[i], '+' | '-')
                && matches!(chars[i - 1], 'e' | 'E')
                && !in_identifier
                && chars[start..i - 1]
                    .iter()
                    .all(|c| c.is_ascii_digit() || *c == '.');
            if exponent_sign {
                i += 1;
            }
        }

        let token: String = chars[start..i].iter().collect();
        let is_integer = token.chars().all(|c| c.is_ascii_digit());
        out.push_str(&token);
        if is_integer && !in_identifier {
            out.push_str(".0");
        }
    }
    out
}

/// Apply `f` to every stretch of `script` outside `"..."` literals.
fn map_outside_strings<F>(script: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let bytes = script.as_bytes();
    let mut out = String::new();
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == b'"' && backslashes.is_multiple_of(2) {
                out.push_str(&script[seg_start..=i]);
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' {
            out.push_str(&f(&script[seg_start..i]));
            in_string = true;
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < script.len() {
        if in_string {
            out.push_str(&script[seg_start..]);
        } else {
            out.push_str(&f(&script[seg_start..]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_refs_and_ranges() {
        assert_eq!(preprocess_formula("=A1+B2"), "CELL(0, 0)+CELL(1, 1)");
        assert_eq!(preprocess_formula("=SUM(A1:B3)"), "SUM(RANGE(0, 0, 2, 1))");
        assert_eq!(preprocess_formula("=LEN(@C1)"), "LEN(VALUE(0, 2))");
        assert_eq!(preprocess_formula("=$A$1*2"), "CELL(0, 0)*2.0");
    }

    #[test]
    fn test_preprocess_operators_and_numbers() {
        assert_eq!(preprocess_formula("=10/4"), "10.0/4.0");
        assert_eq!(preprocess_formula("=2^3"), "2.0**3.0");
        assert_eq!(preprocess_formula("=1.5e-3+0.25"), "1.5e-3+0.25");
        assert_eq!(
            preprocess_formula("=IF(A1<>1, 2, 3)"),
            "IF(CELL(0, 0)!=1.0, 2.0, 3.0)"
        );
        assert_eq!(preprocess_formula("=IF(A1=1, 1, 0)"), "IF(CELL(0, 0)==1.0, 1.0, 0.0)");
        assert_eq!(preprocess_formula("=A1>=2"), "CELL(0, 0)>=2.0");
    }

    #[test]
    fn test_preprocess_leaves_strings_and_function_names() {
        assert_eq!(
            preprocess_formula(r#"=CONCAT("A1 = ", A1)"#),
            r#"CONCAT("A1 = ", CELL(0, 0))"#
        );
        assert_eq!(preprocess_formula("=LOG10(100)"), "LOG10(100.0)");
    }

    #[test]
    fn test_preprocess_ref_error_token() {
        assert_eq!(preprocess_formula("=#REF!+1"), "REF_ERROR()+1.0");
    }

    #[test]
    fn test_offset_formula_references_positive_delta() {
        let shifted = offset_formula_references("=SUM(A1:B2) + @C3 + D4", 2, 1);
        assert_eq!(shifted, "=SUM(B3:C4) + @D5 + E6");
    }

    #[test]
    fn test_offset_formula_references_out_of_bounds() {
        assert_eq!(offset_formula_references("=A1 + @B2", 0, -1), "=#REF! + @A2");
        assert_eq!(offset_formula_references("=SUM(A1:B2)", -1, 0), "=SUM(#REF!)");
    }

    #[test]
    fn test_offset_respects_absolute_markers() {
        assert_eq!(offset_formula_references("=$A$1+$A1+A$1", 1, 1), "=$A$1+$A2+B$1");
    }

    #[test]
    fn test_offset_skips_strings() {
        assert_eq!(
            offset_formula_references(r#"=CONCAT("A1", A1)"#, 1, 0),
            r#"=CONCAT("A1", A2)"#
        );
    }
}
