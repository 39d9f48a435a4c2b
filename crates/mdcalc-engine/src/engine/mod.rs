//! Spreadsheet engine API.
//!
//! - [`Cell`], [`CellType`], [`Grid`], [`Sheet`] - Data structures for cell storage
//! - [`CellRef`], [`CellAddress`], [`SheetId`] - Cell and sheet addressing
//! - [`detect_cycle`], [`InFlight`] - Circular dependency detection, before and during evaluation
//! - [`extract_dependencies`] - Parse formula dependencies
//! - [`preprocess_script`] - Transform formulas for Rhai evaluation
//! - [`create_engine`] - Create a Rhai engine with built-in functions
//! - [`WorkbookBuilder`], [`Workbook`] - The two-phase workbook
//! - [`format_number`], [`format_value`] - Format values for display

mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod eval;
mod format;
mod preprocess;
mod workbook;

pub use cell::{
    Cell, CellType, Grid, InFlight, InFlightCells, MAX_NESTED_LOOKUPS, Sheet, Sheets, ValueCache,
};
pub use cell_ref::{CellAddress, CellRef, SheetId};
pub use cycle::detect_cycle;
pub use deps::extract_dependencies;
pub use eval::{create_engine, eval_program};
pub use format::{MAX_FRACTION_DIGITS, format_number, format_value, round_to_precision};
pub use preprocess::preprocess_script;
pub use workbook::{
    CellError, CellValue, DEFAULT_PRECISION, Workbook, WorkbookBuilder, WorkbookConfig,
};

pub use rhai::Dynamic;
