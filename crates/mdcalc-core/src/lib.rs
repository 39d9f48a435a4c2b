//! mdcalc_core - Formulas in Markdown tables.
//!
//! Finds tables in a Markdown document, detects formula annotations in
//! their cells, evaluates every table as a sheet of one workbook and reports
//! where each annotation should be rewritten with its computed value.
//!
//! The pipeline runs in stages, each in its own module:
//!
//! - [`scanner`] - lines that look like table rows
//! - [`validator`] - blocks of rows that form real tables
//! - [`splitter`] - cells with exact source positions
//! - [`formula`] - formula annotations inside cells
//! - [`assembler`] - tables registered as sheets of a workbook
//! - [`mapper`] - computed values turned into replacement instructions
//!
//! [`calculate`] runs all of them; [`edit::apply_replacements`] applies the
//! result to the document.

pub mod assembler;
pub mod config;
pub mod edit;
pub mod error;
pub mod formula;
pub mod mapper;
pub mod scanner;
pub mod splitter;
pub mod table;
pub mod validator;

pub use config::CalcOptions;
pub use edit::apply_replacements;
pub use error::{CoreError, Result};
pub use formula::FormulaSyntax;
pub use mapper::ReplacementInstruction;

use assembler::SheetAssembler;
use table::Table;

/// Output of [`calculate`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calculation {
    /// One instruction per formula, in table order.
    pub replacements: Vec<ReplacementInstruction>,
    /// Every table found, including ones left out of the workbook.
    pub tables: Vec<Table>,
    pub warnings: Vec<String>,
}

/// Run the whole pipeline over a document.
///
/// This never fails; problems are reported in [`Calculation::warnings`].
pub fn calculate(text: &str, options: &CalcOptions) -> Calculation {
    let mut warnings = Vec::new();
    let (precision, precision_warning) = options.effective_precision();
    if let Some(msg) = precision_warning {
        log::warn!("{}", msg);
        warnings.push(msg);
    }

    let lines = scanner::split_lines(text);
    let tables = table::extract_tables(&lines, options.include_table_header_in_cell_numeration);
    log::debug!("found {} table(s) in {} line(s)", tables.len(), lines.len());
    if tables.is_empty() {
        return Calculation {
            warnings,
            ..Calculation::default()
        };
    }

    let assembly = SheetAssembler::new(precision).assemble(&tables, options.formula_syntax);
    warnings.extend(assembly.warnings);

    let replacements = mapper::map_results(
        &assembly.workbook,
        &assembly.sheets,
        precision,
        options.formula_syntax,
    );

    Calculation {
        replacements,
        tables,
        warnings,
    }
}
