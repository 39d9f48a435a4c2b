//! Dependency extraction from formula strings.
//!
//! Parses formula text to find all cell references (e.g., `A1`, `Costs!B2`,
//! `SUM(B2:C5)`) that the formula depends on. The workbook uses this for
//! cycle detection before evaluating a cell.
//!
//! References inside string literals and references to unknown sheets are
//! ignored here; the latter already fail preprocessing.

use super::cell_ref::{CellAddress, CellRef, SheetId};
use super::preprocess::{cell_ref_re, resolve_qualifier};

const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// Extract all cell references from a script as dependencies.
pub fn extract_dependencies<F>(script: &str, current: SheetId, resolve: F) -> Vec<CellAddress>
where
    F: Fn(&str) -> Option<SheetId>,
{
    let mut deps = Vec::new();

    let script = strip_string_literals(script);

    let range_re = crate::builtins::range_fn_re();

    // Remove range calls from the script to avoid double-counting their endpoints
    let script_without_ranges = range_re.replace_all(&script, "").to_string();

    for caps in range_re.captures_iter(&script) {
        let Ok(sheet) = resolve_qualifier(&caps, 2, 3, current, &resolve) else {
            continue;
        };
        if let (Some(start), Some(end)) = (CellRef::from_str(&caps[4]), CellRef::from_str(&caps[5]))
        {
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
                continue;
            }

            for row in min_row..=max_row {
                for col in min_col..=max_col {
                    deps.push(CellAddress::new(sheet, col, row));
                }
            }
        }
    }

    for caps in cell_ref_re().captures_iter(&script_without_ranges) {
        let cell_ref = format!("{}{}", &caps[4], &caps[5]);
        let Some(cr) = CellRef::from_str(&cell_ref) else {
            continue;
        };
        if let Ok(sheet) = resolve_qualifier(&caps, 2, 3, current, &resolve) {
            deps.push(CellAddress { sheet, cell: cr });
        }
    }

    deps
}

fn strip_string_literals(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in script.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(' ');
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
                out.push(' ');
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
