//! Rhai engine creation and formula evaluation.
//!
//! Creates the Rhai scripting engine with all spreadsheet built-in functions
//! registered (SUM, AVG, cell accessors, etc.) bound to a workbook's sheets.

use rhai::{Engine, EvalAltResult};

use super::{Dynamic, InFlightCells, Sheets, ValueCache};

/// Bounds function recursion inside a single formula. Chains of formula
/// cells are bounded separately, by [`super::MAX_NESTED_LOOKUPS`].
const MAX_CALL_LEVELS: usize = 256;

/// Create a Rhai engine with built-ins registered.
pub fn create_engine(sheets: Sheets, value_cache: ValueCache, in_flight: InFlightCells) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_call_levels(MAX_CALL_LEVELS);
    crate::builtins::register_builtins(&mut engine, sheets, value_cache, in_flight);
    engine
}

/// Evaluate a preprocessed formula program.
pub fn eval_program(engine: &Engine, program: &str) -> Result<Dynamic, Box<EvalAltResult>> {
    engine.eval::<Dynamic>(program)
}
