//! Cell splitter: turns table lines into cells with exact source positions.
//!
//! Columns are counted in chars (Unicode scalar values) from the start of the
//! line. Escaped pipes are not special; splitting is purely structural.

use crate::validator::Block;

/// Raw content between two pipes of a table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// 0-based line index in the document.
    pub line: usize,
    /// 0-based char offset of the first char of `content` within the line.
    pub column: usize,
    /// Untrimmed text between the delimiters.
    pub content: String,
}

/// Split one table row into cells, dropping the text outside the outer pipes.
pub fn split_row(line: usize, text: &str) -> Vec<Cell> {
    let pieces: Vec<&str> = text.split('|').collect();
    if pieces.len() < 2 {
        return Vec::new();
    }

    let mut cells = Vec::with_capacity(pieces.len() - 2);
    let mut column = pieces[0].chars().count() + 1;
    for piece in &pieces[1..pieces.len() - 1] {
        cells.push(Cell {
            line,
            column,
            content: piece.to_string(),
        });
        column += piece.chars().count() + 1;
    }
    cells
}

/// Split a validated block into rows of cells.
///
/// The separator line is always skipped. The header line becomes row 0 only
/// when `include_header` is set.
pub fn split_block(lines: &[&str], block: Block, include_header: bool) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(block.len);
    if include_header {
        rows.push(split_row(block.header_line(), lines[block.header_line()]));
    }
    for line in block.data_lines() {
        rows.push(split_row(line, lines[line]));
    }
    rows
}
