//! Dependency extraction from formula strings.
//!
//! Parses formula text to find all cell references (e.g., `A1`, `B2:C5`)
//! that the formula depends on. This is used to build the dependency graph
//! for evaluation order and cycle detection.
//!
//! Handles:
//! - Simple cell references: `A1`, `@B2`, `$C$3`
//! - Ranges anywhere in the formula: `SUM(A1:B5)`, `A1:A3`
//! - Ignores references inside string literals

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::CellRef;

/// Ranges larger than this are not expanded into individual dependencies.
pub const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// Extract all cell references from a formula as dependencies.
/// A leading `=` is accepted and ignored.
pub fn extract_dependencies(formula: &str) -> Vec<CellRef> {
    let mut deps = Vec::new();

    let body = formula.strip_prefix('=').unwrap_or(formula);
    let script = strip_string_literals(body).replace('$', "");

    // Ranges first, then remove them so their endpoints aren't counted twice.
    let range_re = range_ref_re();
    for caps in range_re.captures_iter(&script) {
        let Some((start, end)) = parse_range(&caps[0]) else {
            continue;
        };
        let min_row = start.row.min(end.row);
        let max_row = start.row.max(end.row);
        let min_col = start.col.min(end.col);
        let max_col = start.col.max(end.col);

        let row_count = max_row - min_row + 1;
        let col_count = max_col - min_col + 1;
        let Some(cell_count) = row_count.checked_mul(col_count) else {
            continue;
        };
        if cell_count > MAX_DEPENDENCY_RANGE_CELLS {
            log::warn!("skipping dependency range {} ({} cells)", &caps[0], cell_count);
            continue;
        }

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                deps.push(CellRef::new(row, col));
            }
        }
    }
    let script_without_ranges = range_re.replace_all(&script, " ");

    for caps in cell_ref_re().captures_iter(&script_without_ranges) {
        if let Some(cr) = CellRef::from_a1(&caps[0]) {
            deps.push(cr);
        }
    }

    deps
}

pub(crate) fn cell_ref_re() -> &'static Regex {
    static CELL_RE: OnceLock<Regex> = OnceLock::new();
    CELL_RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z]{1,3}[0-9]+\b").expect("dependency cell reference regex must compile")
    })
}

pub(crate) fn range_ref_re() -> &'static Regex {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    RANGE_RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z]{1,3}[0-9]+:[A-Za-z]{1,3}[0-9]+\b")
            .expect("dependency range regex must compile")
    })
}

/// Blank out the contents of `"..."` literals, keeping the quotes and the
/// byte length so positions still line up with the original.
pub(crate) fn strip_string_literals(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in script.chars() {
        if in_string {
            if escaped {
                escaped = false;
                push_blank(&mut out, ch);
                continue;
            }
            if ch == '\\' {
                escaped = true;
                out.push(' ');
                continue;
            }
            if ch == '"' {
                in_string = false;
                out.push('"');
            } else {
                push_blank(&mut out, ch);
            }
        } else if ch == '"' {
            in_string = true;
            out.push('"');
        } else {
            out.push(ch);
        }
    }

    out
}

fn push_blank(out: &mut String, ch: char) {
    for _ in 0..ch.len_utf8() {
        out.push(' ');
    }
}

/// Parse a cell range like "A1:B5" into its two corner references.
pub fn parse_range(range: &str) -> Option<(CellRef, CellRef)> {
    let (start, end) = range.split_once(':')?;
    Some((CellRef::from_a1(start.trim())?, CellRef::from_a1(end.trim())?))
}
