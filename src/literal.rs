//! SQL literal rendering for single cell values.
//!
//! Only values the reader already typed become bare numbers. Text stays text: a string that
//! merely looks numeric is still quoted.

use crate::model::{Cell, render_float};

pub const NULL: &str = "NULL";

pub fn sql_literal(value: &Cell) -> String {
    match value {
        Cell::Empty => NULL.to_string(),
        Cell::Text(text) => quoted_or_null(text),
        Cell::Int(number) => number.to_string(),
        Cell::Float(number) if !number.is_finite() => NULL.to_string(),
        Cell::Float(number) => render_float(*number),
        Cell::Bool(true) => "TRUE".to_string(),
        Cell::Bool(false) => "FALSE".to_string(),
        Cell::DateTime(stamp) => format!("'{}'", stamp.format("%Y-%m-%d %H:%M:%S")),
    }
}

/// Literal for a normalized-table value, where absence is `None`.
pub fn text_literal(value: Option<&str>) -> String {
    sql_literal(&Cell::from(value))
}

fn quoted_or_null(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NULL.to_string()
    } else {
        format!("'{}'", trimmed.replace('\'', "''"))
    }
}
