//! Tables recognized in a document, with their cells and sheet names.

use crate::assembler::infer_sheet_name;
use crate::scanner::table_row_lines;
use crate::splitter::{Cell, split_block};
use crate::validator::{consecutive_runs, validate_blocks};

/// A validated table, split into cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub sheet_name: String,
    /// 0-based position among the tables found in the document.
    pub ordinal: usize,
    /// Line index of the header row.
    pub header_line: usize,
    pub rows: Vec<Vec<Cell>>,
}

/// Find every table in `lines`, in document order.
pub fn extract_tables(lines: &[&str], include_header: bool) -> Vec<Table> {
    let runs = consecutive_runs(&table_row_lines(lines));
    validate_blocks(lines, runs)
        .into_iter()
        .enumerate()
        .map(|(ordinal, block)| {
            let header_line = block.header_line();
            let preceding = header_line.checked_sub(1).map(|idx| lines[idx]);
            Table {
                sheet_name: infer_sheet_name(preceding, ordinal),
                ordinal,
                header_line,
                rows: split_block(lines, block, include_header),
            }
        })
        .collect()
}
