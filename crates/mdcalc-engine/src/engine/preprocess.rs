//! Formula preprocessing and reference transformation.
//!
//! Before formulas can be evaluated by Rhai, cell references like `A1` must
//! be transformed into function calls like `CELL(0, 0, 0)` (sheet, col, row):
//!
//! - `A1` → `CELL(s, 0, 0)` and `@A1` → `VALUE(s, 0, 0)`, where `s` is the
//!   formula's own sheet
//! - `Costs!A1` and `'Q1 Costs'!A1` → `CELL(k, 0, 0)` on the named sheet
//! - `SUM(A1:B5)` → `SUM_RANGE(s, 0, 0, 1, 4)`, also with a sheet qualifier
//!
//! References inside string literals are left alone. The rewritten call
//! names are reserved: a formula that calls `CELL`, `VALUE` or a `*_RANGE`
//! function itself is rejected.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::cell_ref::{CellRef, SheetId};
use crate::error::{EngineError, Result};

/// Matches a single, optionally sheet-qualified cell reference.
///
/// Captures:
/// - group 1: `@` marker for typed value access
/// - group 2: quoted sheet name (`'Q1 Costs'`)
/// - group 3: bare sheet name (`Costs`)
/// - group 4: column letters
/// - group 5: row digits
pub(crate) fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(@)?(?:(?:'([^']+)'|\b([A-Za-z_][A-Za-z0-9_]*))!)?\b([A-Za-z]+)([0-9]+)\b",
        )
        .expect("cell reference regex must compile")
    })
}

/// Matches a call to one of the functions references are rewritten into.
fn reserved_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = ["CELL", "VALUE"]
            .into_iter()
            .chain(crate::builtins::RANGE_BUILTINS.iter().map(|b| b.rhai_name))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b({})\s*\(", names)).expect("reserved call regex must compile")
    })
}

/// Resolve the sheet qualifier captured at `quoted`/`bare`, defaulting to `current`.
pub(crate) fn resolve_qualifier<F>(
    caps: &Captures,
    quoted: usize,
    bare: usize,
    current: SheetId,
    resolve: &F,
) -> std::result::Result<SheetId, String>
where
    F: Fn(&str) -> Option<SheetId>,
{
    let name = caps.get(quoted).or_else(|| caps.get(bare));
    match name {
        None => Ok(current),
        Some(m) => resolve(m.as_str()).ok_or_else(|| m.as_str().to_string()),
    }
}

/// Replace cell references with Rhai builtin calls.
///
/// `current` is the sheet the formula lives on; `resolve` maps a sheet name
/// to its identifier. Fails with [`EngineError::UnknownSheet`] when a
/// qualifier names a sheet the workbook does not have, and with
/// [`EngineError::ReservedFunction`] when the formula calls a rewrite target.
pub fn preprocess_script<F>(script: &str, current: SheetId, resolve: F) -> Result<String>
where
    F: Fn(&str) -> Option<SheetId>,
{
    let mut unknown: Option<String> = None;
    let mut reserved: Option<String> = None;

    let out = map_outside_strings(script, |seg| {
        if let Some(caps) = reserved_call_re().captures(seg) {
            reserved.get_or_insert_with(|| caps[1].to_string());
            return seg.to_string();
        }

        let with_ranges = crate::builtins::range_fn_re()
            .replace_all(seg, |caps: &Captures| {
                let Some(rhai_name) = crate::builtins::range_rhai_name(&caps[1]) else {
                    return caps[0].to_string();
                };
                let sheet = match resolve_qualifier(caps, 2, 3, current, &resolve) {
                    Ok(sheet) => sheet,
                    Err(name) => {
                        unknown.get_or_insert(name);
                        return caps[0].to_string();
                    }
                };

                if let (Some(start), Some(end)) =
                    (CellRef::from_str(&caps[4]), CellRef::from_str(&caps[5]))
                {
                    format!(
                        "{}({}, {}, {}, {}, {})",
                        rhai_name, sheet.0, start.col, start.row, end.col, end.row
                    )
                } else {
                    caps[0].to_string()
                }
            })
            .to_string();

        cell_ref_re()
            .replace_all(&with_ranges, |caps: &Captures| {
                let cell_ref = format!("{}{}", &caps[4], &caps[5]);
                let Some(cr) = CellRef::from_str(&cell_ref) else {
                    return caps[0].to_string();
                };
                let sheet = match resolve_qualifier(caps, 2, 3, current, &resolve) {
                    Ok(sheet) => sheet,
                    Err(name) => {
                        unknown.get_or_insert(name);
                        return caps[0].to_string();
                    }
                };
                let func = if caps.get(1).is_some() { "VALUE" } else { "CELL" };
                format!("{}({}, {}, {})", func, sheet.0, cr.col, cr.row)
            })
            .to_string()
    });

    if let Some(name) = reserved {
        return Err(EngineError::ReservedFunction(name));
    }
    match unknown {
        Some(name) => Err(EngineError::UnknownSheet(name)),
        None => Ok(out),
    }
}

/// Apply `f` to every part of `script` that is not inside a `"..."` literal.
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
            i += 1;
            continue;
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
