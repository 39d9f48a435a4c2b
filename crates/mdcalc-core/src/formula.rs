//! Formula detector: finds annotated formulas in table cells.
//!
//! A cell is a formula cell when its content contains an annotation:
//!
//! - [`FormulaSyntax::Hash`]: `[display](#expression)` or `[display](#=expression)`
//! - [`FormulaSyntax::Brace`]: `[display]({=expression})`
//!
//! Text around the annotation is kept as is; only the annotation itself is
//! rewritten. The first annotation in a cell wins, and the expression runs
//! to the last `)` of the cell. Only the configured syntax is recognized.
//! Annotations with unbalanced or nested brackets are literal content.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::splitter::Cell;
use crate::table::Table;

/// Which annotation convention marks a formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaSyntax {
    /// `[display](#=expression)`, the `=` being optional.
    #[default]
    Hash,
    /// `[display]({=expression})`.
    Brace,
}

fn hash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(?<display>[^\[\]]*)\]\(#(?<eq>=?)(?<expr>.+)\)")
            .expect("hash annotation regex must compile")
    })
}

fn brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(?<display>[^\[\]]*)\]\(\{=(?<expr>.+)\}\)")
            .expect("brace annotation regex must compile")
    })
}

/// The parts of a matched annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub display: String,
    /// Expression as written, without the syntax's `=` marker.
    pub expression: String,
    /// Whether a hash annotation spelled its expression with a leading `=`.
    pub explicit_equals: bool,
    /// Byte range of the whole annotation within the searched text.
    pub span: Range<usize>,
}

impl FormulaSyntax {
    /// Find the first annotation of this syntax in a cell's text.
    pub fn find_annotation(self, text: &str) -> Option<Annotation> {
        let re = match self {
            FormulaSyntax::Hash => hash_re(),
            FormulaSyntax::Brace => brace_re(),
        };
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let expression = caps["expr"].to_string();
        if expression.trim().is_empty() || expression.starts_with('=') {
            return None;
        }

        Some(Annotation {
            display: caps["display"].to_string(),
            expression,
            explicit_equals: caps.name("eq").is_some_and(|m| !m.as_str().is_empty()),
            span: whole.range(),
        })
    }

    /// Build an annotation showing `display` for `expression`.
    pub fn render(self, display: &str, expression: &str, explicit_equals: bool) -> String {
        match self {
            FormulaSyntax::Hash => {
                let eq = if explicit_equals { "=" } else { "" };
                format!("[{}](#{}{})", display, eq, expression)
            }
            FormulaSyntax::Brace => format!("[{}]({{={}}})", display, expression),
        }
    }
}

impl fmt::Display for FormulaSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaSyntax::Hash => f.write_str("hash"),
            FormulaSyntax::Brace => f.write_str("brace"),
        }
    }
}

impl FromStr for FormulaSyntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(FormulaSyntax::Hash),
            "brace" => Ok(FormulaSyntax::Brace),
            other => Err(format!("Unknown formula syntax: {} (expected hash or brace)", other)),
        }
    }
}

/// A formula found in a table cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormulaOccurrence {
    /// Grid row within the table's evaluation grid.
    pub row: usize,
    /// Grid column within the table's evaluation grid.
    pub col: usize,
    pub line: usize,
    /// Char offset of the annotation's first char in the original line.
    pub column: usize,
    /// Length of the annotation in chars.
    pub span_length: usize,
    pub display: String,
    pub expression: String,
    pub explicit_equals: bool,
}

impl FormulaOccurrence {
    /// Content handed to the evaluation engine for this cell.
    pub fn eval_content(&self) -> String {
        format!("={}", self.expression.trim())
    }

    /// The annotation rewritten to show `value`.
    pub fn render(&self, value: &str, syntax: FormulaSyntax) -> String {
        syntax.render(value, &self.expression, self.explicit_equals)
    }
}

/// Detect a formula in a single cell at grid position `row`/`col`.
pub fn detect_cell(cell: &Cell, row: usize, col: usize, syntax: FormulaSyntax) -> Option<FormulaOccurrence> {
    let annotation = syntax.find_annotation(&cell.content)?;
    let before = cell.content[..annotation.span.start].chars().count();

    Some(FormulaOccurrence {
        row,
        col,
        line: cell.line,
        column: cell.column + before,
        span_length: cell.content[annotation.span.clone()].chars().count(),
        display: annotation.display,
        expression: annotation.expression,
        explicit_equals: annotation.explicit_equals,
    })
}

/// A table ready for evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedTable {
    /// Evaluation grid: `=expression` for formula cells, trimmed text otherwise.
    pub content: Vec<Vec<String>>,
    /// Formulas in row-major order.
    pub formulas: Vec<FormulaOccurrence>,
}

/// Scan every cell of a table for formulas.
pub fn detect(table: &Table, syntax: FormulaSyntax) -> DetectedTable {
    let mut content = Vec::with_capacity(table.rows.len());
    let mut formulas = Vec::new();

    for (r, row) in table.rows.iter().enumerate() {
        let mut row_content = Vec::with_capacity(row.len());
        for (c, cell) in row.iter().enumerate() {
            match detect_cell(cell, r, c, syntax) {
                Some(occurrence) => {
                    row_content.push(occurrence.eval_content());
                    formulas.push(occurrence);
                }
                None => row_content.push(cell.content.trim().to_string()),
            }
        }
        content.push(row_content);
    }

    DetectedTable { content, formulas }
}
