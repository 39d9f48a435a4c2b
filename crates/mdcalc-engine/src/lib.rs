//! mdcalc_engine - Workbook of named sheets with Rhai-powered formulas.
//!
//! The engine is used in two phases: a [`engine::WorkbookBuilder`] registers
//! sheets and loads their content, then [`engine::WorkbookBuilder::build`]
//! resolves references and hands back a read-only [`engine::Workbook`] that
//! answers cell queries.

pub(crate) mod builtins;
pub mod engine;
pub mod error;

pub use error::{EngineError, Result};
