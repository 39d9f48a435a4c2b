//! Built-in spreadsheet functions (Rust) and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing built-in names are ALL CAPS (e.g. `SUM`, `AVG`).
//! - Range built-ins rewrite to ALLCAPS Rhai function names (e.g. `SUM_RANGE`)
//!   whose first argument is the sheet index.
//! - If you add a new built-in range function, update `RANGE_BUILTINS` and
//!   register its implementation in `register_builtins`.

use crate::engine::{CellAddress, CellType, InFlightCells, SheetId, Sheets, ValueCache};
use rand::Rng;
use regex::Regex;
use rhai::{Dynamic, Engine, EvalAltResult, NativeCallContext, Position};

type RhaiResult = Result<Dynamic, Box<EvalAltResult>>;

use std::sync::OnceLock;

/// A range function as written in a formula and the Rhai function it calls.
pub struct RangeBuiltin {
    pub formula_name: &'static str,
    pub rhai_name: &'static str,
}

pub const RANGE_BUILTINS: &[RangeBuiltin] = &[
    RangeBuiltin {
        formula_name: "SUM",
        rhai_name: "SUM_RANGE",
    },
    RangeBuiltin {
        formula_name: "AVG",
        rhai_name: "AVG_RANGE",
    },
    RangeBuiltin {
        formula_name: "COUNT",
        rhai_name: "COUNT_RANGE",
    },
    RangeBuiltin {
        formula_name: "MIN",
        rhai_name: "MIN_RANGE",
    },
    RangeBuiltin {
        formula_name: "MAX",
        rhai_name: "MAX_RANGE",
    },
    RangeBuiltin {
        formula_name: "VEC",
        rhai_name: "VEC_RANGE",
    },
];

/// Regex that matches built-in range calls like `SUM(A1:B5)` or `SUM(Costs!A1:B5)`.
///
/// Captures:
/// - group 1: function name (e.g. `SUM`)
/// - group 2: quoted sheet name (e.g. `'Q1 Costs'`)
/// - group 3: bare sheet name (e.g. `Costs`)
/// - group 4: start cell ref (e.g. `A1`)
/// - group 5: end cell ref (e.g. `B5`)
pub fn range_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = RANGE_BUILTINS
            .iter()
            .map(|b| b.formula_name)
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            r"\b({})\(\s*(?:(?:'([^']+)'|([A-Za-z_][A-Za-z0-9_]*))!)?([A-Za-z]+[0-9]+):([A-Za-z]+[0-9]+)\s*\)",
            names
        ))
        .expect("built-in range regex must compile")
    })
}

pub fn range_rhai_name(formula_name: &str) -> Option<&'static str> {
    RANGE_BUILTINS
        .iter()
        .find(|b| b.formula_name == formula_name)
        .map(|b| b.rhai_name)
}

fn runtime_error(message: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
}

fn to_usize(value: i64, label: &str) -> Result<usize, Box<EvalAltResult>> {
    usize::try_from(value).map_err(|_| runtime_error(&format!("{} must be >= 0", label)))
}

fn to_decimal_places(value: i64) -> Result<usize, Box<EvalAltResult>> {
    const MAX_DECIMALS: usize = 12;
    let places = to_usize(value, "decimals")?;
    if places > MAX_DECIMALS {
        return Err(runtime_error(&format!(
            "decimals must be <= {}",
            MAX_DECIMALS
        )));
    }
    Ok(places)
}

fn fixed_decimal_string(n: f64, decimals: usize) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }

    // Fixed number of decimal places (always prints trailing zeros).
    format!("{:.*}", decimals, n)
}

fn money_string(n: f64, symbol: &str, decimals: usize) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }

    let sign = if n.is_sign_negative() { "-" } else { "" };
    let abs = n.abs();
    format!("{}{}{}", sign, symbol, fixed_decimal_string(abs, decimals))
}

pub(crate) fn dynamic_to_f64(value: &Dynamic) -> Option<f64> {
    if let Ok(n) = value.as_float() {
        return Some(n);
    }
    if let Ok(n) = value.as_int() {
        return Some(n as f64);
    }
    None
}

fn address(sheet: i64, col: i64, row: i64) -> Option<CellAddress> {
    let sheet = usize::try_from(sheet).ok()?;
    let col = usize::try_from(col).ok()?;
    let row = usize::try_from(row).ok()?;
    Some(CellAddress::new(SheetId(sheet), col, row))
}

/// Everything the cell accessors share: the sheets, computed values and
/// the formula cells currently being evaluated.
#[derive(Clone)]
struct Lookup {
    sheets: Sheets,
    value_cache: ValueCache,
    in_flight: InFlightCells,
}

impl Lookup {
    /// Typed value of a cell, evaluating (and caching) formula cells on demand.
    ///
    /// Missing and empty cells read as `""`; formula cells that fail to
    /// evaluate read as UNIT. Reading a cell that is still being evaluated
    /// fails, and so does every evaluation enclosing it.
    fn read(&self, ctx: &NativeCallContext, addr: &CellAddress) -> RhaiResult {
        if let Some(cached_val) = self.value_cache.get(addr) {
            return Ok(cached_val.clone());
        }

        let Some(sheet) = self.sheets.get(addr.sheet.0) else {
            return Ok(Dynamic::UNIT);
        };
        let Some(entry) = sheet.grid.get(&addr.cell) else {
            return Ok(Dynamic::from(String::new()));
        };

        let program = match &entry.contents {
            CellType::Empty => return Ok(Dynamic::from(String::new())),
            CellType::Number(n) => return Ok(Dynamic::from(*n)),
            CellType::Text(s) => return Ok(Dynamic::from(s.clone())),
            CellType::Script(_) => entry.program.clone(),
        };
        drop(entry);

        let Some(Ok(program)) = program else {
            return Ok(Dynamic::UNIT);
        };
        if !self.in_flight.enter(addr) {
            return Err(runtime_error(&format!("cannot read {} while computing it", addr)));
        }
        let result = ctx.engine().eval::<Dynamic>(&program);
        self.in_flight.leave(addr);

        match result {
            Ok(value) => {
                self.value_cache.insert(addr.clone(), value.clone());
                Ok(value)
            }
            Err(err) if self.in_flight.refused() => Err(err),
            Err(_) => {
                self.value_cache.insert(addr.clone(), Dynamic::UNIT);
                Ok(Dynamic::UNIT)
            }
        }
    }

    /// Numeric value of a cell: empty cells are 0, text is NaN.
    fn number(&self, ctx: &NativeCallContext, addr: &CellAddress) -> Result<f64, Box<EvalAltResult>> {
        let value = self.read(ctx, addr)?;
        if let Some(n) = dynamic_to_f64(&value) {
            return Ok(n);
        }
        match value.into_string() {
            Ok(s) if s.is_empty() => Ok(0.0),
            _ => Ok(f64::NAN),
        }
    }

    /// Numeric value for range aggregates: anything non-numeric counts as 0.
    fn number_or_zero(
        &self,
        ctx: &NativeCallContext,
        addr: &CellAddress,
    ) -> Result<f64, Box<EvalAltResult>> {
        Ok(dynamic_to_f64(&self.read(ctx, addr)?).unwrap_or(0.0))
    }

    /// Numeric values of a range, in range order.
    fn numbers(
        &self,
        ctx: &NativeCallContext,
        addrs: &[CellAddress],
    ) -> Result<Vec<f64>, Box<EvalAltResult>> {
        addrs.iter().map(|addr| self.number_or_zero(ctx, addr)).collect()
    }
}

/// Iterate the addresses of a range in row-major order, respecting direction.
fn range_addresses(sheet: i64, c1: i64, r1: i64, c2: i64, r2: i64) -> Vec<CellAddress> {
    let Ok(sheet) = usize::try_from(sheet) else {
        return Vec::new();
    };
    let (Ok(c1), Ok(r1), Ok(c2), Ok(r2)) = (
        usize::try_from(c1),
        usize::try_from(r1),
        usize::try_from(c2),
        usize::try_from(r2),
    ) else {
        return Vec::new();
    };

    let rows: Vec<usize> = if r1 <= r2 {
        (r1..=r2).collect()
    } else {
        (r2..=r1).rev().collect()
    };
    let cols: Vec<usize> = if c1 <= c2 {
        (c1..=c2).collect()
    } else {
        (c2..=c1).rev().collect()
    };

    let mut out = Vec::with_capacity(rows.len() * cols.len());
    for row in &rows {
        for col in &cols {
            out.push(CellAddress::new(SheetId(sheet), *col, *row));
        }
    }
    out
}

/// Register all built-in functions into the Rhai engine.
pub fn register_builtins(
    engine: &mut Engine,
    sheets: Sheets,
    value_cache: ValueCache,
    in_flight: InFlightCells,
) {
    let lookup = Lookup {
        sheets,
        value_cache,
        in_flight,
    };

    // CELL(sheet, col, row): numeric value at cell (text -> NaN)
    let cell = lookup.clone();
    engine.register_fn(
        "CELL",
        move |ctx: NativeCallContext, sheet: i64, col: i64, row: i64| -> Result<f64, Box<EvalAltResult>> {
            match address(sheet, col, row) {
                Some(addr) => cell.number(&ctx, &addr),
                None => Ok(f64::NAN),
            }
        },
    );

    // VALUE(sheet, col, row): typed value at cell (number/text/bool) as Dynamic.
    // - Empty cells => "" (so things like `len(@A1)` behave intuitively)
    let value = lookup.clone();
    engine.register_fn(
        "VALUE",
        move |ctx: NativeCallContext, sheet: i64, col: i64, row: i64| -> RhaiResult {
            match address(sheet, col, row) {
                Some(addr) => value.read(&ctx, &addr),
                None => Ok(Dynamic::UNIT),
            }
        },
    );

    // SUM_RANGE(sheet, c1, r1, c2, r2)
    let sum = lookup.clone();
    engine.register_fn(
        "SUM_RANGE",
        move |ctx: NativeCallContext,
              sheet: i64,
              c1: i64,
              r1: i64,
              c2: i64,
              r2: i64|
              -> Result<f64, Box<EvalAltResult>> {
            let addrs = range_addresses(sheet, c1, r1, c2, r2);
            Ok(sum.numbers(&ctx, &addrs)?.into_iter().sum())
        },
    );

    // AVG_RANGE(sheet, c1, r1, c2, r2)
    let avg = lookup.clone();
    engine.register_fn(
        "AVG_RANGE",
        move |ctx: NativeCallContext,
              sheet: i64,
              c1: i64,
              r1: i64,
              c2: i64,
              r2: i64|
              -> Result<f64, Box<EvalAltResult>> {
            let addrs = range_addresses(sheet, c1, r1, c2, r2);
            if addrs.is_empty() {
                return Ok(0.0);
            }
            let total: f64 = avg.numbers(&ctx, &addrs)?.into_iter().sum();
            Ok(total / addrs.len() as f64)
        },
    );

    // COUNT_RANGE(sheet, c1, r1, c2, r2): count non-empty
    let count = lookup.clone();
    engine.register_fn(
        "COUNT_RANGE",
        move |_ctx: NativeCallContext, sheet: i64, c1: i64, r1: i64, c2: i64, r2: i64| -> f64 {
            let mut n = 0;
            for addr in range_addresses(sheet, c1, r1, c2, r2) {
                if count.value_cache.contains_key(&addr) {
                    n += 1;
                    continue;
                }
                if let Some(target) = count.sheets.get(addr.sheet.0)
                    && let Some(cell) = target.grid.get(&addr.cell)
                    && !matches!(cell.contents, CellType::Empty)
                {
                    n += 1;
                }
            }
            n as f64
        },
    );

    // MIN_RANGE(sheet, c1, r1, c2, r2)
    let min = lookup.clone();
    engine.register_fn(
        "MIN_RANGE",
        move |ctx: NativeCallContext,
              sheet: i64,
              c1: i64,
              r1: i64,
              c2: i64,
              r2: i64|
              -> Result<f64, Box<EvalAltResult>> {
            let addrs = range_addresses(sheet, c1, r1, c2, r2);
            let min_val = min
                .numbers(&ctx, &addrs)?
                .into_iter()
                .fold(f64::INFINITY, f64::min);
            Ok(if min_val == f64::INFINITY { 0.0 } else { min_val })
        },
    );

    // MAX_RANGE(sheet, c1, r1, c2, r2)
    let max = lookup.clone();
    engine.register_fn(
        "MAX_RANGE",
        move |ctx: NativeCallContext,
              sheet: i64,
              c1: i64,
              r1: i64,
              c2: i64,
              r2: i64|
              -> Result<f64, Box<EvalAltResult>> {
            let addrs = range_addresses(sheet, c1, r1, c2, r2);
            let max_val = max
                .numbers(&ctx, &addrs)?
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max);
            Ok(if max_val == f64::NEG_INFINITY { 0.0 } else { max_val })
        },
    );

    // VEC_RANGE(sheet, c1, r1, c2, r2): returns array of cell values
    // Respects range direction: VEC(A3:A1) returns [A3, A2, A1]
    let array = lookup;
    engine.register_fn(
        "VEC_RANGE",
        move |ctx: NativeCallContext,
              sheet: i64,
              c1: i64,
              r1: i64,
              c2: i64,
              r2: i64|
              -> Result<rhai::Array, Box<EvalAltResult>> {
            range_addresses(sheet, c1, r1, c2, r2)
                .iter()
                .map(|addr| array.read(&ctx, addr))
                .collect()
        },
    );

    // POW(base, exp): exponentiation
    // Handle all type combinations since cell values can be int or float
    engine.register_fn("POW", |base: f64, exp: f64| -> f64 { base.powf(exp) });
    engine.register_fn("POW", |base: f64, exp: i64| -> f64 {
        base.powf(exp as f64)
    });
    engine.register_fn("POW", |base: i64, exp: f64| -> f64 {
        (base as f64).powf(exp)
    });
    engine.register_fn("POW", |base: i64, exp: i64| -> f64 {
        (base as f64).powf(exp as f64)
    });

    // SQRT(x): square root
    engine.register_fn("SQRT", |x: f64| -> f64 { x.sqrt() });
    engine.register_fn("SQRT", |x: i64| -> f64 { (x as f64).sqrt() });

    // ABS(x): absolute value
    engine.register_fn("ABS", |x: f64| -> f64 { x.abs() });
    engine.register_fn("ABS", |x: i64| -> f64 { (x as f64).abs() });

    // ROUND(x, decimals): round half away from zero
    engine.register_fn(
        "ROUND",
        |x: f64, decimals: i64| -> Result<f64, Box<EvalAltResult>> {
            let decimals = to_decimal_places(decimals)?;
            let factor = 10f64.powi(decimals as i32);
            Ok((x * factor).round() / factor)
        },
    );
    engine.register_fn("ROUND", |x: i64, _decimals: i64| -> f64 { x as f64 });

    // RAND(): random float in [0.0, 1.0)
    engine.register_fn("RAND", || -> f64 { rand::thread_rng().r#gen() });

    // RANDINT(min, max): random integer in [min, max] inclusive
    engine.register_fn(
        "RANDINT",
        |min: i64, max: i64| -> Result<i64, Box<EvalAltResult>> {
            if min > max {
                return Err(runtime_error("RANDINT: min must be <= max"));
            }
            Ok(rand::thread_rng().r#gen_range(min..=max))
        },
    );

    // FIXED(n, decimals): format with a fixed number of decimal places.
    engine.register_fn(
        "FIXED",
        |n: f64, decimals: i64| -> Result<String, Box<EvalAltResult>> {
            let decimals = to_decimal_places(decimals)?;
            Ok(fixed_decimal_string(n, decimals))
        },
    );
    engine.register_fn(
        "FIXED",
        |n: i64, decimals: i64| -> Result<String, Box<EvalAltResult>> {
            let decimals = to_decimal_places(decimals)?;
            Ok(fixed_decimal_string(n as f64, decimals))
        },
    );

    // MONEY(n, symbol[, decimals]): format as currency (no separators).
    // Examples:
    //   MONEY(15.0424, "£")    -> "£15.04"
    //   MONEY(-2, "$", 0)      -> "-$2"
    engine.register_fn("MONEY", |n: f64, symbol: &str| -> String {
        money_string(n, symbol, 2)
    });
    engine.register_fn("MONEY", |n: i64, symbol: &str| -> String {
        money_string(n as f64, symbol, 2)
    });
    engine.register_fn(
        "MONEY",
        |n: f64, symbol: &str, decimals: i64| -> Result<String, Box<EvalAltResult>> {
            let decimals = to_decimal_places(decimals)?;
            Ok(money_string(n, symbol, decimals))
        },
    );
    engine.register_fn(
        "MONEY",
        |n: i64, symbol: &str, decimals: i64| -> Result<String, Box<EvalAltResult>> {
            let decimals = to_decimal_places(decimals)?;
            Ok(money_string(n as f64, symbol, decimals))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Cell, CellRef, InFlight, Sheet};
    use std::sync::Arc;

    fn engine_with(cells: &[(usize, usize, Cell)]) -> Engine {
        let sheet = Sheet::new("Sheet0");
        for (col, row, cell) in cells {
            sheet.grid.insert(CellRef::new(*col, *row), cell.clone());
        }
        let sheets: Sheets = Arc::new(vec![sheet]);
        let mut engine = Engine::new();
        register_builtins(
            &mut engine,
            sheets,
            ValueCache::default(),
            Arc::new(InFlight::default()),
        );
        engine
    }

    fn formula(program: &str) -> Cell {
        Cell {
            program: Some(Ok(program.to_string())),
            ..Cell::new_script(program)
        }
    }

    #[test]
    fn test_sum_and_avg_range() {
        let engine = engine_with(&[
            (0, 0, Cell::new_number(10.0)),
            (0, 1, Cell::new_number(20.0)),
            (0, 2, Cell::new_text("n/a")),
        ]);
        let sum: f64 = engine.eval("SUM_RANGE(0, 0, 0, 0, 2)").unwrap();
        assert_eq!(sum, 30.0);
        let avg: f64 = engine.eval("AVG_RANGE(0, 0, 0, 0, 1)").unwrap();
        assert_eq!(avg, 15.0);
    }

    #[test]
    fn test_count_min_max_range() {
        let engine = engine_with(&[
            (1, 0, Cell::new_number(4.0)),
            (1, 1, Cell::new_number(-2.0)),
            (1, 3, Cell::new_number(9.0)),
        ]);
        let count: f64 = engine.eval("COUNT_RANGE(0, 1, 0, 1, 3)").unwrap();
        assert_eq!(count, 3.0);
        let min: f64 = engine.eval("MIN_RANGE(0, 1, 0, 1, 3)").unwrap();
        assert_eq!(min, -2.0);
        let max: f64 = engine.eval("MAX_RANGE(0, 1, 0, 1, 3)").unwrap();
        assert_eq!(max, 9.0);
    }

    #[test]
    fn test_vec_range_respects_reverse_direction() {
        let engine = engine_with(&[
            (0, 0, Cell::new_number(10.0)),
            (0, 1, Cell::new_number(20.0)),
            (0, 2, Cell::new_number(30.0)),
        ]);

        let forward: rhai::Array = engine.eval("VEC_RANGE(0, 0, 0, 0, 2)").unwrap();
        assert_eq!(forward.len(), 3);
        assert_eq!(forward[0].clone().cast::<f64>(), 10.0);
        assert_eq!(forward[2].clone().cast::<f64>(), 30.0);

        let reverse: rhai::Array = engine.eval("VEC_RANGE(0, 0, 2, 0, 0)").unwrap();
        assert_eq!(reverse[0].clone().cast::<f64>(), 30.0);
        assert_eq!(reverse[2].clone().cast::<f64>(), 10.0);
    }

    #[test]
    fn test_cell_reads_text_as_nan_and_missing_as_zero() {
        let engine = engine_with(&[(0, 0, Cell::new_text("label"))]);
        let text: f64 = engine.eval("CELL(0, 0, 0)").unwrap();
        assert!(text.is_nan());
        let missing: f64 = engine.eval("CELL(0, 5, 5)").unwrap();
        assert_eq!(missing, 0.0);
    }

    #[test]
    fn test_reading_a_cell_from_its_own_formula_fails() {
        let engine = engine_with(&[
            (0, 0, formula("CELL(0, 0, 0) + 1")),
            (0, 1, formula("SUM_RANGE(0, 0, 0, 0, 1)")),
            (1, 0, formula("CELL(0, 0, 0) * 2")),
        ]);
        assert!(engine.eval::<f64>("CELL(0, 0, 0)").is_err());
        assert!(engine.eval::<f64>("CELL(0, 0, 1)").is_err());
        assert!(engine.eval::<f64>("CELL(0, 1, 0)").is_err());
    }

    #[test]
    fn test_nested_formula_values_are_cached() {
        let engine = engine_with(&[
            (0, 0, Cell::new_number(4.0)),
            (1, 0, formula("CELL(0, 0, 0) * 2")),
        ]);
        let first: f64 = engine.eval("CELL(0, 1, 0) + 1").unwrap();
        assert_eq!(first, 9.0);
        let count: f64 = engine.eval("COUNT_RANGE(0, 0, 0, 1, 0)").unwrap();
        assert_eq!(count, 2.0);
    }

    #[test]
    fn test_rand_returns_value_in_range() {
        let engine = engine_with(&[]);
        for _ in 0..100 {
            let result: f64 = engine.eval("RAND()").unwrap();
            assert!((0.0..1.0).contains(&result));
        }
    }

    #[test]
    fn test_randint_rejects_inverted_bounds() {
        let engine = engine_with(&[]);
        assert!(engine.eval::<i64>("RANDINT(6, 1)").is_err());
        let roll: i64 = engine.eval("RANDINT(1, 6)").unwrap();
        assert!((1..=6).contains(&roll));
    }

    #[test]
    fn test_round_fixed_money() {
        let engine = engine_with(&[]);
        let rounded: f64 = engine.eval("ROUND(2.345, 1)").unwrap();
        assert_eq!(rounded, 2.3);
        let fixed: String = engine.eval("FIXED(3.14159, 2)").unwrap();
        assert_eq!(fixed, "3.14");
        let money: String = engine.eval(r#"MONEY(-2, "$", 0)"#).unwrap();
        assert_eq!(money, "-$2");
    }

    #[test]
    fn test_range_fn_re_captures_sheet_qualifier() {
        let caps = range_fn_re().captures("SUM('Q1 Costs'!A1:B2)").unwrap();
        assert_eq!(&caps[1], "SUM");
        assert_eq!(&caps[2], "Q1 Costs");
        assert!(caps.get(3).is_none());
        assert_eq!(&caps[4], "A1");
        assert_eq!(&caps[5], "B2");
    }
}
