//! Applying replacement instructions to a document.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::mapper::ReplacementInstruction;

/// Split `text` into (content, line ending) pairs, matching [`str::lines`].
fn lines_with_endings(text: &str) -> Vec<(&str, &str)> {
    text.split_inclusive('\n')
        .map(|line| {
            if let Some(body) = line.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = line.strip_suffix('\n') {
                (body, "\n")
            } else {
                (line, "")
            }
        })
        .collect()
}

fn apply_to_line(line_idx: usize, line: &str, edits: &[&ReplacementInstruction]) -> Result<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut pos = 0;

    for edit in edits {
        if edit.column < pos {
            return Err(CoreError::OverlappingEdits { line: line_idx });
        }
        let end = edit
            .column
            .checked_add(edit.span_length)
            .filter(|&end| end <= chars.len())
            .ok_or(CoreError::SpanOutOfRange {
                line: line_idx,
                column: edit.column,
                length: edit.span_length,
            })?;

        out.extend(&chars[pos..edit.column]);
        out.push_str(&edit.replacement_text);
        pos = end;
    }
    out.extend(&chars[pos..]);
    Ok(out)
}

/// Apply all instructions against the original `text` in one pass.
///
/// Positions refer to `text` as given, so instructions may come in any order.
/// Line endings are preserved.
pub fn apply_replacements(text: &str, instructions: &[ReplacementInstruction]) -> Result<String> {
    let lines = lines_with_endings(text);

    let mut by_line: BTreeMap<usize, Vec<&ReplacementInstruction>> = BTreeMap::new();
    for ins in instructions {
        if ins.line >= lines.len() {
            return Err(CoreError::LineOutOfRange {
                line: ins.line,
                count: lines.len(),
            });
        }
        by_line.entry(ins.line).or_default().push(ins);
    }

    let mut out = String::with_capacity(text.len());
    for (idx, (body, ending)) in lines.iter().enumerate() {
        match by_line.get_mut(&idx) {
            Some(edits) => {
                edits.sort_by_key(|e| e.column);
                out.push_str(&apply_to_line(idx, body, edits)?);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }
    Ok(out)
}
