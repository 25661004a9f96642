use std::{collections::HashSet, path::Path};

use log::debug;
use serde::Serialize;

use crate::{
    error::{ToolkitError, ToolkitResult},
    io_utils,
    reader::{self, DelimitedTable},
};

/// Shape diagnostics for one delimited file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileQuality {
    pub file: String,
    pub rows: usize,
    pub columns: usize,
    pub delimiter: char,
    pub encoding: String,
    pub duplicate_columns: usize,
    pub empty_columns: usize,
    pub empty_rows: usize,
}

/// Reports the shape of every delimited file in `folder`. Nothing is modified.
pub fn validate_csv_folder(folder: &Path, encoding: &str) -> ToolkitResult<Vec<FileQuality>> {
    if !folder.is_dir() {
        return Err(ToolkitError::not_found(folder));
    }
    let files = io_utils::list_delimited_files(folder)?;
    if files.is_empty() {
        return Err(ToolkitError::unsupported(format!(
            "No CSV files to validate in {}",
            folder.display()
        )));
    }

    let mut report = Vec::with_capacity(files.len());
    for file in &files {
        let read = reader::read_delimited_flexible(file, encoding)?;
        let quality = assess(io_utils::file_name(file), &read.table, read.delimiter, read.encoding);
        debug!("{quality:?}");
        report.push(quality);
    }
    Ok(report)
}

fn assess(file: String, table: &DelimitedTable, delimiter: u8, encoding: String) -> FileQuality {
    let mut seen = HashSet::with_capacity(table.column_count());
    let duplicate_columns = table
        .headers
        .iter()
        .filter(|name| !seen.insert(name.as_str()))
        .count();
    let empty_columns = (0..table.column_count())
        .filter(|&idx| table.rows.iter().all(|row| row[idx].is_none()))
        .count();
    let empty_rows = table
        .rows
        .iter()
        .filter(|row| row.iter().all(Option::is_none))
        .count();

    FileQuality {
        file,
        rows: table.row_count(),
        columns: table.column_count(),
        delimiter: delimiter as char,
        encoding,
        duplicate_columns,
        empty_columns,
        empty_rows,
    }
}
