//! Cell data structures for workbook sheets.
//!
//! - [`CellType`] - The type of content in a cell (empty, text, number, or formula)
//! - [`Cell`] - A cell with content, resolved program and dependencies
//! - [`Grid`] - Thread-safe sparse storage for one sheet's cells (backed by `DashMap`)
//! - [`Sheet`] - A named grid
//! - [`ValueCache`] - Computed formula values shared with the engine builtins
//! - [`InFlight`] - Formula cells whose evaluation has started but not finished

use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::cell_ref::{CellAddress, CellRef};
use crate::error::EngineError;

/// The type of content stored in a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellType {
    Empty,
    Text(String),
    Number(f64),
    Script(String),
}

/// A cell in a sheet grid.
#[derive(Clone, Debug)]
pub struct Cell {
    pub contents: CellType,
    /// Cells this formula reads, filled in once all sheet names are known.
    pub depends_on: Vec<CellAddress>,
    /// Rhai source for a script cell after reference rewriting, or why the
    /// script could not be rewritten. `None` for non-scripts.
    pub program: Option<Result<String, EngineError>>,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell::with_contents(CellType::Empty)
    }

    pub fn new_text(text: &str) -> Cell {
        Cell::with_contents(CellType::Text(text.to_string()))
    }

    pub fn new_number(n: f64) -> Cell {
        Cell::with_contents(CellType::Number(n))
    }

    /// Create a new cell containing a script/formula (without the leading '=').
    /// References are resolved later, when the workbook is built.
    pub fn new_script(script: &str) -> Cell {
        Cell::with_contents(CellType::Script(script.to_string()))
    }

    fn with_contents(contents: CellType) -> Cell {
        Cell {
            contents,
            depends_on: vec![],
            program: None,
        }
    }

    /// Parse sheet content and create the appropriate cell type.
    /// - Empty string or whitespace -> Empty
    /// - Starts with '=' -> Script (without the '=')
    /// - Quoted string -> Text (without quotes)
    /// - Valid number -> Number
    /// - Otherwise -> Text
    pub fn from_input(input: &str) -> Cell {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Cell::new_empty();
        }

        if let Some(formula) = trimmed.strip_prefix('=') {
            return Cell::new_script(formula.trim());
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            let text = &trimmed[1..trimmed.len() - 1];
            return Cell::new_text(text);
        }

        if let Ok(n) = trimmed.parse::<f64>() {
            return Cell::new_number(n);
        }

        Cell::new_text(trimmed)
    }
}

/// Thread-safe sparse grid storage.
pub type Grid = Arc<DashMap<CellRef, Cell>>;

/// A named sheet registered with a workbook.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
}

impl Sheet {
    pub fn new(name: &str) -> Sheet {
        Sheet {
            name: name.to_string(),
            grid: Arc::new(DashMap::new()),
        }
    }
}

/// All sheets of a built workbook, indexed by `SheetId`.
pub type Sheets = Arc<Vec<Sheet>>;

/// Thread-safe cache for computed formula values, keyed by sheet-qualified address.
pub type ValueCache = Arc<DashMap<CellAddress, rhai::Dynamic>>;

/// Deepest chain of formula cells evaluated from inside another formula.
pub const MAX_NESTED_LOOKUPS: usize = 64;

/// Formula cells currently being evaluated.
///
/// Reading a cell that is already in flight is a circular reference, even
/// when dependency extraction could not see it (a range too large to
/// expand, for instance). Once a lookup is refused, every enclosing
/// evaluation fails instead of caching a partial result.
#[derive(Debug, Default)]
pub struct InFlight {
    cells: DashSet<CellAddress>,
    circular: AtomicBool,
    too_deep: AtomicBool,
}

impl InFlight {
    /// Mark `addr` as being evaluated. Returns `false`, and records why, if
    /// it already is or the chain is at [`MAX_NESTED_LOOKUPS`].
    pub fn enter(&self, addr: &CellAddress) -> bool {
        if self.cells.len() >= MAX_NESTED_LOOKUPS {
            self.too_deep.store(true, Ordering::Relaxed);
            return false;
        }
        if !self.cells.insert(addr.clone()) {
            self.circular.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn leave(&self, addr: &CellAddress) {
        self.cells.remove(addr);
    }

    /// Whether a lookup was refused since the last [`InFlight::reset`].
    pub fn refused(&self) -> bool {
        self.is_circular() || self.too_deep.load(Ordering::Relaxed)
    }

    pub fn is_circular(&self) -> bool {
        self.circular.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.cells.clear();
        self.circular.store(false, Ordering::Relaxed);
        self.too_deep.store(false, Ordering::Relaxed);
    }
}

/// In-flight set shared by a workbook and its engine builtins.
pub type InFlightCells = Arc<InFlight>;
