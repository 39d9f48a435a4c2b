//! Result mapper: turns computed values into replacement instructions.

use serde::{Deserialize, Serialize};

use mdcalc_engine::engine::{CellAddress, Workbook, format_value};

use crate::assembler::AssembledSheet;
use crate::formula::FormulaSyntax;

/// Replace `span_length` chars at `line`/`column` with `replacement_text`.
///
/// On the wire this is `{ "locations": [line, column, spanLength], "data": "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireInstruction", from = "WireInstruction")]
pub struct ReplacementInstruction {
    pub line: usize,
    pub column: usize,
    pub span_length: usize,
    pub replacement_text: String,
}

#[derive(Serialize, Deserialize)]
struct WireInstruction {
    locations: [usize; 3],
    data: String,
}

impl From<ReplacementInstruction> for WireInstruction {
    fn from(ins: ReplacementInstruction) -> Self {
        WireInstruction {
            locations: [ins.line, ins.column, ins.span_length],
            data: ins.replacement_text,
        }
    }
}

impl From<WireInstruction> for ReplacementInstruction {
    fn from(wire: WireInstruction) -> Self {
        let [line, column, span_length] = wire.locations;
        ReplacementInstruction {
            line,
            column,
            span_length,
            replacement_text: wire.data,
        }
    }
}

/// One instruction per formula, grouped by table, row-major within a table.
pub fn map_results(
    workbook: &Workbook,
    sheets: &[AssembledSheet],
    precision: usize,
    syntax: FormulaSyntax,
) -> Vec<ReplacementInstruction> {
    let mut out = Vec::new();
    for sheet in sheets {
        for formula in &sheet.formulas {
            let value = workbook.cell_value(&CellAddress::new(sheet.sheet, formula.col, formula.row));
            let display = format_value(&value, precision);
            out.push(ReplacementInstruction {
                line: formula.line,
                column: formula.column,
                span_length: formula.span_length,
                replacement_text: formula.render(&display, syntax),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::SheetAssembler;
    use crate::scanner::split_lines;
    use crate::table::extract_tables;

    #[test]
    fn test_wire_format() {
        let ins = ReplacementInstruction {
            line: 2,
            column: 7,
            span_length: 11,
            replacement_text: "[6](#=A1*3)".to_string(),
        };
        let json = serde_json::to_string(&ins).unwrap();
        assert_eq!(json, r##"{"locations":[2,7,11],"data":"[6](#=A1*3)"}"##);
    }

    #[test]
    fn test_map_results_formats_values() {
        let text = "\
| a | b | c | d |
|---|---|---|---|
| 0.1 | [](#=A1 + 0.2) | [](#=A1 > 0) | [](#=Nope!A1) |
| 2 | [](#=A2 / 3) | [x](#=\"hi\") | [](#=B2 * 0) |
";
        let lines = split_lines(text);
        let tables = extract_tables(&lines, false);
        let assembly = SheetAssembler::new(4).assemble(&tables, FormulaSyntax::Hash);
        let out = map_results(&assembly.workbook, &assembly.sheets, 4, FormulaSyntax::Hash);

        let data: Vec<&str> = out.iter().map(|i| i.replacement_text.as_str()).collect();
        assert_eq!(
            data,
            vec![
                "[0.3](#=A1 + 0.2)",
                "[TRUE](#=A1 > 0)",
                "[#REF!](#=Nope!A1)",
                "[0.6667](#=A2 / 3)",
                "[hi](#=\"hi\")",
                "[0](#=B2 * 0)",
            ]
        );
        assert!(out.iter().take(3).all(|i| i.line == 2));
        assert!(out.iter().skip(3).all(|i| i.line == 3));
    }
}
