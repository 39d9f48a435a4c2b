//! Line scanner: splits a document into lines and finds table-row lines.

use regex::Regex;
use std::sync::OnceLock;

/// A line that starts and ends with `|`.
fn table_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\|.*\|$").expect("table row regex must compile"))
}

/// Split a document into lines on LF or CRLF.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Whether a single line looks like a bordered table row.
pub fn is_table_row(line: &str) -> bool {
    table_row_re().is_match(line)
}

/// Indices of all lines that look like table rows, in document order.
pub fn table_row_lines(lines: &[&str]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_table_row(line))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_handles_crlf() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a", "b", "c"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_is_table_row() {
        assert!(is_table_row("| a | b |"));
        assert!(is_table_row("||"));
        assert!(!is_table_row("|"));
        assert!(!is_table_row(" | a |"));
        assert!(!is_table_row("| a | "));
        assert!(!is_table_row("a | b"));
    }

    #[test]
    fn test_table_row_lines() {
        let lines = split_lines("# Title\n| a |\n|---|\n\n| b |");
        assert_eq!(table_row_lines(&lines), vec![1, 2, 4]);
    }
}
