//! Two-phase workbook: register and load every sheet, then query values.
//!
//! [`WorkbookBuilder`] owns the mutable phase. [`WorkbookBuilder::build`]
//! resolves every formula against the complete set of sheet names, so a
//! formula may reference a sheet registered after it. The resulting
//! [`Workbook`] is read-only; no sheet can be added once values are queried.

use rhai::Engine;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::eval::{create_engine, eval_program};
use super::format::value_from_dynamic;
use super::{
    Cell, CellAddress, CellRef, CellType, InFlightCells, Sheet, SheetId, Sheets, ValueCache,
    detect_cycle, extract_dependencies, preprocess_script, round_to_precision,
};
use crate::error::{EngineError, Result};

/// Fractional digits used when no valid precision is configured.
pub const DEFAULT_PRECISION: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkbookConfig {
    /// Numeric results are rounded to this many fractional digits.
    pub precision: usize,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        WorkbookConfig {
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Spreadsheet-style error codes produced by evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellError {
    /// Reference to a sheet that does not exist.
    Ref,
    /// The cell depends on itself.
    Cycle,
    /// Rhai failed to evaluate the formula.
    Eval,
    /// The formula produced a value that cannot live in one cell.
    Value,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CellError::Ref => "#REF!",
            CellError::Cycle => "#CYCLE!",
            CellError::Eval => "#ERR!",
            CellError::Value => "#VALUE!",
        };
        f.write_str(code)
    }
}

/// The computed value of a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Error(CellError),
}

/// Registration phase of a workbook.
pub struct WorkbookBuilder {
    config: WorkbookConfig,
    sheets: Vec<Sheet>,
    /// Lowercased sheet name -> id; sheet names are case-insensitive.
    names: HashMap<String, SheetId>,
}

impl WorkbookBuilder {
    /// Create an empty workbook.
    pub fn new(config: WorkbookConfig) -> Self {
        WorkbookBuilder {
            config,
            sheets: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Register a named sheet.
    ///
    /// Names are trimmed and compared case-insensitively; an empty or
    /// already registered name is rejected.
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::EmptySheetName);
        }
        let key = name.to_lowercase();
        if self.names.contains_key(&key) {
            return Err(EngineError::DuplicateSheet(name.to_string()));
        }

        let id = SheetId(self.sheets.len());
        self.sheets.push(Sheet::new(name));
        self.names.insert(key, id);
        Ok(id)
    }

    /// Replace a sheet's content with a grid of strings (row-major).
    ///
    /// Each string is literal content or `=formula`; see [`Cell::from_input`].
    pub fn set_sheet_content<R: AsRef<str>>(&mut self, id: SheetId, content: &[Vec<R>]) -> Result<()> {
        let sheet = self
            .sheets
            .get(id.0)
            .ok_or(EngineError::SheetNotFound(id))?;

        sheet.grid.clear();
        for (row, cells) in content.iter().enumerate() {
            for (col, input) in cells.iter().enumerate() {
                let cell = Cell::from_input(input.as_ref());
                if matches!(cell.contents, CellType::Empty) {
                    continue;
                }
                sheet.grid.insert(CellRef::new(col, row), cell);
            }
        }
        Ok(())
    }

    /// Finish registration: resolve references and create the evaluation engine.
    pub fn build(self) -> Workbook {
        let names = self.names;
        let resolve = |name: &str| names.get(&name.trim().to_lowercase()).copied();

        for (idx, sheet) in self.sheets.iter().enumerate() {
            let id = SheetId(idx);
            for mut entry in sheet.grid.iter_mut() {
                let CellType::Script(script) = &entry.contents else {
                    continue;
                };
                let depends_on = extract_dependencies(script, id, &resolve);
                let program = preprocess_script(script, id, &resolve);
                if let Err(err) = &program {
                    log::warn!("{}!{}: {}", sheet.name, entry.key(), err);
                }
                entry.depends_on = depends_on;
                entry.program = Some(program);
            }
        }

        let sheets: Sheets = Arc::new(self.sheets);
        let value_cache = ValueCache::default();
        let in_flight = InFlightCells::default();
        let engine = create_engine(sheets.clone(), value_cache.clone(), in_flight.clone());

        Workbook {
            config: self.config,
            sheets,
            engine,
            value_cache,
            in_flight,
        }
    }
}

/// Query phase of a workbook.
pub struct Workbook {
    config: WorkbookConfig,
    sheets: Sheets,
    engine: Engine,
    value_cache: ValueCache,
    in_flight: InFlightCells,
}

impl Workbook {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_name(&self, id: SheetId) -> Option<&str> {
        self.sheets.get(id.0).map(|sheet| sheet.name.as_str())
    }

    /// Computed value at a sheet/column/row address.
    pub fn cell_value(&self, addr: &CellAddress) -> CellValue {
        let precision = self.config.precision;
        let Some(sheet) = self.sheets.get(addr.sheet.0) else {
            return CellValue::Error(CellError::Ref);
        };
        let Some(entry) = sheet.grid.get(&addr.cell) else {
            return CellValue::Empty;
        };

        let program = match &entry.contents {
            CellType::Empty => return CellValue::Empty,
            CellType::Text(s) => return CellValue::Text(s.clone()),
            CellType::Number(n) => return CellValue::Number(round_to_precision(*n, precision)),
            CellType::Script(_) => entry.program.clone(),
        };
        drop(entry);

        // Nested lookups cache failures as UNIT; re-run those to report the error.
        if let Some(cached) = self.value_cache.get(addr)
            && !cached.is_unit()
        {
            return value_from_dynamic(cached.clone(), precision);
        }

        if detect_cycle(addr, &self.sheets).is_some() {
            return CellValue::Error(CellError::Cycle);
        }

        let program = match program {
            Some(Ok(program)) => program,
            Some(Err(EngineError::UnknownSheet(_))) | None => {
                return CellValue::Error(CellError::Ref);
            }
            Some(Err(_)) => return CellValue::Error(CellError::Eval),
        };

        self.in_flight.reset();
        self.in_flight.enter(addr);
        let result = eval_program(&self.engine, &program);
        self.in_flight.leave(addr);

        match result {
            Ok(_) if self.in_flight.is_circular() => CellValue::Error(CellError::Cycle),
            Ok(result) => {
                self.value_cache.insert(addr.clone(), result.clone());
                value_from_dynamic(result, precision)
            }
            Err(err) => {
                log::debug!("{}!{}: {}", sheet.name, addr.cell, err);
                if self.in_flight.is_circular() {
                    CellValue::Error(CellError::Cycle)
                } else {
                    CellValue::Error(CellError::Eval)
                }
            }
        }
    }
}
