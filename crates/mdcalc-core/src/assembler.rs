//! Sheet assembler: turns detected tables into a workbook.
//!
//! Every table is registered as a named sheet before any value is read, so a
//! formula may refer to a table that appears later in the document.

use regex::Regex;
use std::sync::OnceLock;

use mdcalc_engine::engine::{SheetId, Workbook, WorkbookBuilder, WorkbookConfig};

use crate::error::CoreError;
use crate::formula::{FormulaOccurrence, FormulaSyntax, detect};
use crate::table::Table;

/// `<!-- NAME -->` on a line of its own.
fn sheet_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*<!--(?<name>.*?)-->\s*$").expect("sheet name regex must compile")
    })
}

/// Default name of the table at `ordinal`.
pub fn default_sheet_name(ordinal: usize) -> String {
    format!("Sheet{}", ordinal)
}

/// Name of a table given the line right above its header, if any.
pub fn infer_sheet_name(preceding: Option<&str>, ordinal: usize) -> String {
    preceding
        .and_then(|line| sheet_name_re().captures(line))
        .map(|caps| caps["name"].trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_sheet_name(ordinal))
}

/// A table that made it into the workbook.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledSheet {
    pub sheet: SheetId,
    pub name: String,
    pub ordinal: usize,
    pub formulas: Vec<FormulaOccurrence>,
}

/// Result of assembling a document's tables.
pub struct Assembly {
    pub workbook: Workbook,
    /// Sheets in table order; skipped tables are absent.
    pub sheets: Vec<AssembledSheet>,
    pub warnings: Vec<String>,
}

pub struct SheetAssembler {
    builder: WorkbookBuilder,
}

impl SheetAssembler {
    pub fn new(precision: usize) -> Self {
        SheetAssembler {
            builder: WorkbookBuilder::new(WorkbookConfig { precision }),
        }
    }

    /// Register and load every table, then freeze the workbook for reading.
    ///
    /// A table whose name is empty or already taken is left out with a warning.
    pub fn assemble(mut self, tables: &[Table], syntax: FormulaSyntax) -> Assembly {
        let mut sheets = Vec::with_capacity(tables.len());
        let mut warnings = Vec::new();

        for table in tables {
            match self.load_table(table, syntax) {
                Ok(sheet) => sheets.push(sheet),
                Err(err) => {
                    let msg = format!(
                        "Skipping table at line {} ('{}'): {}",
                        table.header_line + 1,
                        table.sheet_name,
                        err
                    );
                    log::warn!("{}", msg);
                    warnings.push(msg);
                }
            }
        }

        Assembly {
            workbook: self.builder.build(),
            sheets,
            warnings,
        }
    }

    fn load_table(
        &mut self,
        table: &Table,
        syntax: FormulaSyntax,
    ) -> Result<AssembledSheet, CoreError> {
        let detected = detect(table, syntax);
        let sheet = self.builder.add_sheet(&table.sheet_name)?;
        self.builder.set_sheet_content(sheet, &detected.content)?;

        Ok(AssembledSheet {
            sheet,
            name: table.sheet_name.clone(),
            ordinal: table.ordinal,
            formulas: detected.formulas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::split_lines;
    use crate::table::extract_tables;
    use mdcalc_engine::engine::{CellAddress, CellValue};

    #[test]
    fn test_infer_sheet_name() {
        assert_eq!(infer_sheet_name(Some("<!--Costs-->"), 0), "Costs");
        assert_eq!(infer_sheet_name(Some("  <!--  Q1 Costs -->  "), 0), "Q1 Costs");
        assert_eq!(infer_sheet_name(Some("<!---->"), 2), "Sheet2");
        assert_eq!(infer_sheet_name(Some("<!-- a --> text"), 1), "Sheet1");
        assert_eq!(infer_sheet_name(Some("# Heading"), 1), "Sheet1");
        assert_eq!(infer_sheet_name(None, 0), "Sheet0");
    }

    #[test]
    fn test_assemble_resolves_later_tables() {
        let text = "\
| total |
|-------|
| [](#=Costs!B1 + Costs!B2) |

<!--Costs-->
| item | amount |
|------|--------|
| rent | 100 |
| food | 50 |
";
        let lines = split_lines(text);
        let tables = extract_tables(&lines, false);
        let assembly = SheetAssembler::new(4).assemble(&tables, FormulaSyntax::Hash);

        assert!(assembly.warnings.is_empty());
        assert_eq!(assembly.sheets.len(), 2);
        let summary = &assembly.sheets[0];
        assert_eq!(summary.formulas.len(), 1);
        assert_eq!(assembly.workbook.sheet_name(assembly.sheets[1].sheet), Some("Costs"));
        assert_eq!(
            assembly
                .workbook
                .cell_value(&CellAddress::new(summary.sheet, 0, 0)),
            CellValue::Number(150.0)
        );
    }

    #[test]
    fn test_assemble_skips_duplicate_names() {
        let text = "\
<!--Data-->
| a |
|---|
| 1 |

<!--data-->
| b |
|---|
| 2 |
";
        let lines = split_lines(text);
        let tables = extract_tables(&lines, false);
        let assembly = SheetAssembler::new(4).assemble(&tables, FormulaSyntax::Hash);

        assert_eq!(assembly.sheets.len(), 1);
        assert_eq!(assembly.workbook.sheet_count(), 1);
        assert_eq!(assembly.warnings.len(), 1);
        assert!(assembly.warnings[0].contains("line 7"));
    }
}
