//! Options controlling table extraction and result formatting.

use serde::{Deserialize, Serialize};

use mdcalc_engine::engine::DEFAULT_PRECISION;

use crate::formula::FormulaSyntax;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalcOptions {
    /// Fractional digits of numeric results; negative values fall back to the default.
    #[serde(alias = "precisionRounding")]
    pub precision_rounding: i64,
    /// Count the header row as grid row 0 (row 1 in A1 notation).
    #[serde(alias = "includeTableHeaderInCellNumeration")]
    pub include_table_header_in_cell_numeration: bool,
    #[serde(alias = "formulaSyntax")]
    pub formula_syntax: FormulaSyntax,
}

impl Default for CalcOptions {
    fn default() -> Self {
        CalcOptions {
            precision_rounding: DEFAULT_PRECISION as i64,
            include_table_header_in_cell_numeration: false,
            formula_syntax: FormulaSyntax::default(),
        }
    }
}

impl CalcOptions {
    /// Precision to use, with a warning when the configured one was replaced.
    pub fn effective_precision(&self) -> (usize, Option<String>) {
        if self.precision_rounding < 0 {
            return (
                DEFAULT_PRECISION,
                Some(format!(
                    "Precision {} is negative, using {}",
                    self.precision_rounding, DEFAULT_PRECISION
                )),
            );
        }
        (usize::try_from(self.precision_rounding).unwrap_or(usize::MAX), None)
    }
}
