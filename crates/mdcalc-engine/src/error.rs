//! Error types for the mdcalc engine.

use thiserror::Error;

use crate::engine::SheetId;

/// Errors raised while registering, loading or resolving sheets.
///
/// Evaluation problems never surface here: they become error cell values
/// (see [`crate::engine::CellError`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Sheet name must not be empty")]
    EmptySheetName,

    #[error("Sheet '{0}' already exists")]
    DuplicateSheet(String),

    #[error("No sheet registered with id {0}")]
    SheetNotFound(SheetId),

    #[error("Unknown sheet '{0}'")]
    UnknownSheet(String),

    #[error("'{0}' is an internal function and cannot be called from a formula")]
    ReservedFunction(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
