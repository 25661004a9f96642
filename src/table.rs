//! Plain-text tables for command output.
//!
//! Columns whose cells are all counts are right-aligned; everything else is left-aligned.
//! Control characters inside cells are flattened to spaces so one record stays on one line.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    excel::{SheetExport, SheetStructure},
    io_utils,
    merge::MergeSummary,
    sql::SqlGenerationReport,
    validate::FileQuality,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count().max(1))
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(flatten(cell).chars().count());
        }
    }
    let aligns = (0..column_count)
        .map(|idx| {
            let numeric = !rows.is_empty()
                && rows.iter().all(|row| {
                    row.get(idx)
                        .is_some_and(|cell| !cell.is_empty() && cell.parse::<u64>().is_ok())
                });
            if numeric { Align::Right } else { Align::Left }
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let line = values
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(value, (&width, align))| {
            let cell = flatten(value);
            match align {
                Align::Left => format!("{cell:<width$}"),
                Align::Right => format!("{cell:>width$}"),
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn sql_report_table(report: &SqlGenerationReport) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = report
        .items
        .iter()
        .map(|item| vec![item.label.clone(), item.rows.to_string()])
        .collect();
    (headers(&["item", "rows"]), rows)
}

pub fn sheet_export_table(exports: &[SheetExport]) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = exports
        .iter()
        .map(|export| {
            vec![
                export.sheet.clone(),
                io_utils::file_name(&export.output_file),
                export.rows.to_string(),
            ]
        })
        .collect();
    (headers(&["sheet", "file", "rows"]), rows)
}

pub fn structure_table(sheets: &[SheetStructure]) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = sheets
        .iter()
        .map(|sheet| {
            vec![
                sheet.sheet.clone(),
                sheet.non_empty_rows.to_string(),
                sheet.non_empty_columns.to_string(),
                sheet.header_row.to_string(),
            ]
        })
        .collect();
    (headers(&["sheet", "rows", "columns", "header_row"]), rows)
}

pub fn quality_table(report: &[FileQuality]) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = report
        .iter()
        .map(|item| {
            vec![
                item.file.clone(),
                item.rows.to_string(),
                item.columns.to_string(),
                crate::printable_delimiter(item.delimiter as u8),
                item.encoding.clone(),
                item.duplicate_columns.to_string(),
                item.empty_columns.to_string(),
                item.empty_rows.to_string(),
            ]
        })
        .collect();
    (
        headers(&[
            "file",
            "rows",
            "columns",
            "delimiter",
            "encoding",
            "dup_columns",
            "empty_columns",
            "empty_rows",
        ]),
        rows,
    )
}

pub fn merge_summary_table(summary: &MergeSummary) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = vec![
        vec!["output".to_string(), summary.output_file.display().to_string()],
        vec!["files".to_string(), summary.files_merged.to_string()],
        vec!["rows".to_string(), summary.total_rows.to_string()],
        vec!["columns".to_string(), summary.columns.join(", ")],
    ];
    (headers(&["field", "value"]), rows)
}
