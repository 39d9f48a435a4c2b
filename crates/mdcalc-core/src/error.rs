//! Error types for mdcalc core.

use thiserror::Error;

use mdcalc_engine::EngineError;

/// Errors that can occur while assembling sheets or applying edits.
///
/// The extraction pipeline itself never fails; these surface from the
/// fallible building blocks it is made of.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Line {line} is out of range (document has {count} lines)")]
    LineOutOfRange { line: usize, count: usize },

    #[error("Span {column}+{length} runs past the end of line {line}")]
    SpanOutOfRange {
        line: usize,
        column: usize,
        length: usize,
    },

    #[error("Replacements overlap on line {line}")]
    OverlappingEdits { line: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
