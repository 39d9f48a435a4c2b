//! Table validator: groups table-row lines into blocks and keeps real tables.
//!
//! A block is a maximal run of consecutive table-row lines. It becomes a
//! table when its second line is a separator row and it has at least one
//! data row after the separator.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Header, separator and one data row.
pub const MIN_TABLE_LINES: usize = 3;

/// A run of consecutive line indices `start..start + len`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub len: usize,
}

impl Block {
    pub fn lines(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn header_line(&self) -> usize {
        self.start
    }

    pub fn separator_line(&self) -> usize {
        self.start + 1
    }

    /// Lines after the separator.
    pub fn data_lines(&self) -> Range<usize> {
        (self.start + 2).min(self.start + self.len)..self.start + self.len
    }
}

/// A row of pipe-delimited cells made of dashes, colons and blanks, with at
/// least one dash group, e.g. `|---|:--:|` or `|---| |`.
fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\|(?:[\s:-]*\|)*\s*:?-+:?\s*\|(?:[\s:-]*\|)*$")
            .expect("separator row regex must compile")
    })
}

pub fn is_separator_row(line: &str) -> bool {
    separator_re().is_match(line)
}

/// Group sorted line indices into maximal consecutive runs.
///
/// Runs of a single line are dropped: a lone pipe-line is never a table.
pub fn consecutive_runs(indices: &[usize]) -> Vec<Block> {
    let mut runs = Vec::new();
    let Some((&first, rest)) = indices.split_first() else {
        return runs;
    };

    let mut current = Block {
        start: first,
        len: 1,
    };
    for &idx in rest {
        if current.start + current.len == idx {
            current.len += 1;
        } else {
            if current.len >= 2 {
                runs.push(current);
            }
            current = Block { start: idx, len: 1 };
        }
    }
    if current.len >= 2 {
        runs.push(current);
    }

    runs
}

/// Keep the runs that have a separator as second line and at least one data row.
pub fn validate_blocks(lines: &[&str], runs: Vec<Block>) -> Vec<Block> {
    runs.into_iter()
        .filter(|block| {
            lines
                .get(block.separator_line())
                .is_some_and(|line| is_separator_row(line))
        })
        .filter(|block| block.len >= MIN_TABLE_LINES)
        .collect()
}
