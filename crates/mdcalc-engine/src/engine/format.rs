//! Display formatting and precision rounding of computed values.
//!
//! Any precision is accepted. Past [`MAX_FRACTION_DIGITS`] an f64 has no
//! nonzero digits left, so larger precisions format like that one.

use super::{CellValue, Dynamic};

/// Fractional digits of the smallest positive f64 (2^-1074).
pub const MAX_FRACTION_DIGITS: usize = 1074;

/// Round a number to `precision` fractional digits.
pub fn round_to_precision(n: f64, precision: usize) -> f64 {
    if !n.is_finite() {
        return n;
    }
    format!("{:.*}", precision.min(MAX_FRACTION_DIGITS), n)
        .parse::<f64>()
        .unwrap_or(n)
}

/// Format a number for display with at most `precision` fractional digits.
///
/// Trailing zeros are dropped, so `6.0` renders as `6` and `0.1 + 0.2` as `0.3`.
pub fn format_number(n: f64, precision: usize) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }

    let fixed = format!("{:.*}", precision.min(MAX_FRACTION_DIGITS), n);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a cell value for display.
pub fn format_value(value: &CellValue, precision: usize) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(*n, precision),
        CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Text(s) => s.clone(),
        CellValue::Error(e) => e.to_string(),
    }
}

/// Convert an evaluation result into a cell value.
pub(crate) fn value_from_dynamic(value: Dynamic, precision: usize) -> CellValue {
    if value.is_unit() {
        CellValue::Empty
    } else if let Some(n) = crate::builtins::dynamic_to_f64(&value) {
        CellValue::Number(round_to_precision(n, precision))
    } else if let Ok(b) = value.as_bool() {
        CellValue::Bool(b)
    } else if value.is_array() {
        CellValue::Error(super::CellError::Value)
    } else {
        match value.into_string() {
            Ok(s) => CellValue::Text(s),
            Err(type_name) => CellValue::Text(type_name.to_string()),
        }
    }
}
