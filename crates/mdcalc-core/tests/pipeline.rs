use mdcalc_core::{
    CalcOptions, FormulaSyntax, ReplacementInstruction, apply_replacements, calculate,
};

const EXAMPLE: &str = "| x | y |\n|---|---|\n| 2 | [3](#=A1*3) |\n";

fn span_text(text: &str, ins: &ReplacementInstruction) -> String {
    let line = text.lines().nth(ins.line).unwrap();
    line.chars().skip(ins.column).take(ins.span_length).collect()
}

#[test]
fn test_worked_example() {
    let calc = calculate(EXAMPLE, &CalcOptions::default());
    assert!(calc.warnings.is_empty());
    assert_eq!(calc.tables.len(), 1);
    assert_eq!(calc.replacements.len(), 1);

    let ins = &calc.replacements[0];
    assert_eq!(ins.line, 2);
    assert_eq!(span_text(EXAMPLE, ins), "[3](#=A1*3)");
    assert_eq!(ins.replacement_text, "[6](#=A1*3)");

    let rewritten = apply_replacements(EXAMPLE, &calc.replacements).unwrap();
    assert_eq!(rewritten, "| x | y |\n|---|---|\n| 2 | [6](#=A1*3) |\n");
}

#[test]
fn test_no_pipe_lines_yield_nothing() {
    for text in ["", "just prose\n", "# Title\n\n- item\n- [3](#=1+2)\n"] {
        let calc = calculate(text, &CalcOptions::default());
        assert!(calc.replacements.is_empty());
        assert!(calc.tables.is_empty());
    }
}

#[test]
fn test_row_count_follows_header_flag() {
    let text = "| h |\n|---|\n| 1 |\n| 2 |\n| 3 |\n";

    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.tables[0].rows.len(), 5 - 2);

    let opts = CalcOptions {
        include_table_header_in_cell_numeration: true,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert_eq!(calc.tables[0].rows.len(), 5 - 2 + 1);
}

#[test]
fn test_header_flag_shifts_references() {
    let text = "| 10 | [](#=A1 + 1) |\n|---|---|\n| 2 | [](#=A1 + 1) |\n";

    let calc = calculate(text, &CalcOptions::default());
    let data: Vec<&str> = calc.replacements.iter().map(|i| i.replacement_text.as_str()).collect();
    assert_eq!(data, vec!["[3](#=A1 + 1)"]);

    let opts = CalcOptions {
        include_table_header_in_cell_numeration: true,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    let data: Vec<&str> = calc.replacements.iter().map(|i| i.replacement_text.as_str()).collect();
    assert_eq!(data, vec!["[11](#=A1 + 1)", "[11](#=A1 + 1)"]);
}

#[test]
fn test_rerun_is_idempotent() {
    let text = "\
| item | qty | price | total |
|------|-----|-------|-------|
| pen | 3 | 1.5 | [0](#=B1 * C1) |
| ink | 2 | 4 | [](#=B2 * C2) |
| sum | | | [?](#=SUM(D1:D2)) |
";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.replacements.len(), 3);
    let rewritten = apply_replacements(text, &calc.replacements).unwrap();
    assert!(rewritten.contains("[4.5](#=B1 * C1)"));
    assert!(rewritten.contains("[12.5](#=SUM(D1:D2))"));

    let again = calculate(&rewritten, &CalcOptions::default());
    assert_eq!(again.replacements.len(), 3);
    for ins in &again.replacements {
        assert_eq!(span_text(&rewritten, ins), ins.replacement_text);
    }
    assert_eq!(apply_replacements(&rewritten, &again.replacements).unwrap(), rewritten);
}

#[test]
fn test_column_offsets_are_exact() {
    let text = "| é | ünï |\n|---|---|\n|  ä  |   [1](#=2-1)   |\n";
    let calc = calculate(text, &CalcOptions::default());
    let ins = &calc.replacements[0];
    assert_eq!(ins.column, 10);
    assert_eq!(span_text(text, ins), "[1](#=2-1)");

    let cells = &calc.tables[0].rows[0];
    let line = text.lines().nth(2).unwrap();
    assert_eq!(line.chars().nth(cells[0].column + 2), Some('ä'));
}

#[test]
fn test_sheet_names() {
    let text = "\
<!--Costs-->
| item | amount |
|------|--------|
| rent | 100 |

| a |
|---|
| [](#=Costs!B1 * 2) |
";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.tables[0].sheet_name, "Costs");
    assert_eq!(calc.tables[1].sheet_name, "Sheet1");
    assert_eq!(calc.replacements[0].replacement_text, "[200](#=Costs!B1 * 2)");
}

#[test]
fn test_negative_precision_falls_back_to_default() {
    let text = "| a |\n|---|\n| [](#=2.0/3) |\n";
    let opts = CalcOptions {
        precision_rounding: -1,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert_eq!(calc.warnings.len(), 1);
    assert_eq!(calc.replacements[0].replacement_text, "[0.6667](#=2.0/3)");

    let opts = CalcOptions {
        precision_rounding: 1,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert!(calc.warnings.is_empty());
    assert_eq!(calc.replacements[0].replacement_text, "[0.7](#=2.0/3)");
}

#[test]
fn test_large_precision_is_honored() {
    let text = "| a |\n|---|\n| [](#=2.0/3) |\n";
    let opts = CalcOptions {
        precision_rounding: 16,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert!(calc.warnings.is_empty());
    assert_eq!(calc.replacements[0].replacement_text, "[0.6666666666666666](#=2.0/3)");

    let opts = CalcOptions {
        precision_rounding: 17,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert_eq!(calc.replacements[0].replacement_text, "[0.66666666666666663](#=2.0/3)");
}

#[test]
fn test_blank_line_separates_tables() {
    let text = "| a |\n|---|\n| 1 |\n\n| b |\n|---|\n| 2 |\n";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.tables.len(), 2);
    assert_eq!(calc.tables[0].rows.len(), 1);
    assert_eq!(calc.tables[1].header_line, 4);
}

#[test]
fn test_cross_sheet_references_in_any_order() {
    let text = "\
<!--Summary-->
| what | value |
|------|-------|
| total | [](#=SUM('Q1 Costs'!B1:B2)) |
| first | [](#=@'Q1 Costs'!A1) |

<!--Q1 Costs-->
| item | amount |
|------|--------|
| rent | 100 |
| food | [](#=B1 / 4) |
";
    let calc = calculate(text, &CalcOptions::default());
    let data: Vec<&str> = calc.replacements.iter().map(|i| i.replacement_text.as_str()).collect();
    assert_eq!(
        data,
        vec![
            "[125](#=SUM('Q1 Costs'!B1:B2))",
            "[rent](#=@'Q1 Costs'!A1)",
            "[25](#=B1 / 4)",
        ]
    );
}

#[test]
fn test_duplicate_sheet_is_skipped_with_warning() {
    let text = "\
<!--Data-->
| a |
|---|
| [](#=1+1) |

<!--Data-->
| b |
|---|
| [](#=2+2) |
";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.tables.len(), 2);
    assert_eq!(calc.replacements.len(), 1);
    assert_eq!(calc.replacements[0].line, 3);
    assert_eq!(calc.warnings.len(), 1);
}

#[test]
fn test_brace_syntax() {
    let text = "| a | b |\n|---|---|\n| 4 | [0]({=A1 * 2}) |\n| 1 | [0](#=A1) |\n";
    let opts = CalcOptions {
        formula_syntax: FormulaSyntax::Brace,
        ..CalcOptions::default()
    };
    let calc = calculate(text, &opts);
    assert_eq!(calc.replacements.len(), 1);
    assert_eq!(calc.replacements[0].replacement_text, "[8]({=A1 * 2})");
}

#[test]
fn test_errors_surface_as_values() {
    let text = "| a | b |\n|---|---|\n| [](#=B1) | [](#=A1) |\n| [](#=Nope!A1) | [](#=A1 |\n";
    let calc = calculate(text, &CalcOptions::default());
    let data: Vec<&str> = calc.replacements.iter().map(|i| i.replacement_text.as_str()).collect();
    assert_eq!(
        data,
        vec!["[#CYCLE!](#=B1)", "[#CYCLE!](#=A1)", "[#REF!](#=Nope!A1)"]
    );
}

#[test]
fn test_crlf_document() {
    let text = EXAMPLE.replace('\n', "\r\n");
    let calc = calculate(&text, &CalcOptions::default());
    assert_eq!(calc.replacements.len(), 1);
    let rewritten = apply_replacements(&text, &calc.replacements).unwrap();
    assert_eq!(rewritten, "| x | y |\r\n|---|---|\r\n| 2 | [6](#=A1*3) |\r\n");
}

#[test]
fn test_annotation_inside_cell_text() {
    let text = "| x | y |\n|---|---|\n| 2 | total: [3](#=A1*3) each |\n| 5 | ≈[1](#=A2 / 2) |\n";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.replacements.len(), 2);

    let ins = &calc.replacements[0];
    assert_eq!(ins.column, "| 2 | total: ".chars().count());
    assert_eq!(span_text(text, ins), "[3](#=A1*3)");
    assert_eq!(ins.replacement_text, "[6](#=A1*3)");

    let ins = &calc.replacements[1];
    assert_eq!(ins.column, "| 5 | ≈".chars().count());
    assert_eq!(span_text(text, ins), "[1](#=A2 / 2)");

    let rewritten = apply_replacements(text, &calc.replacements).unwrap();
    assert_eq!(
        rewritten,
        "| x | y |\n|---|---|\n| 2 | total: [6](#=A1*3) each |\n| 5 | ≈[2.5](#=A2 / 2) |\n"
    );
}

#[test]
fn test_partly_blank_separator_row() {
    let text = "| a | b |\n|---| |\n| 2 | [](#=A1 + 1) |\n";
    let calc = calculate(text, &CalcOptions::default());
    assert_eq!(calc.tables.len(), 1);
    assert_eq!(calc.replacements[0].replacement_text, "[3](#=A1 + 1)");
}

#[test]
fn test_hidden_self_reference_is_an_error_value() {
    let text = "| x |\n|---|\n| [](#=CELL(0, 0, 0) + 1) |\n| [](#=SUM(A1:A1000001)) |\n";
    let calc = calculate(text, &CalcOptions::default());
    let data: Vec<&str> = calc.replacements.iter().map(|i| i.replacement_text.as_str()).collect();
    assert_eq!(
        data,
        vec!["[#ERR!](#=CELL(0, 0, 0) + 1)", "[#CYCLE!](#=SUM(A1:A1000001))"]
    );
}
