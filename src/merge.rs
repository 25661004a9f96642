use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::Serialize;

use crate::{
    error::{ToolkitError, ToolkitResult},
    io_utils,
    model::{NormalizedTable, Row},
    reader,
};

pub const MERGED_FILE_NAME: &str = "merged_all.csv";
pub const SOURCE_COLUMN: &str = "source_file";

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Defaults to `merged_all.csv` inside the merged folder.
    pub output_file: Option<PathBuf>,
    pub encoding: String,
    pub include_source_column: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output_file: None,
            encoding: io_utils::DEFAULT_ENCODING.to_string(),
            include_source_column: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub output_file: PathBuf,
    pub files_merged: usize,
    pub total_rows: usize,
    pub columns: Vec<String>,
}

/// Concatenates the delimited files of `folder` into one UTF-8, comma-separated file.
///
/// Columns are the union of every file's columns in first-seen order; a file lacking a
/// column contributes empty values for it. The output file is never read back as an input.
pub fn merge_csv_folder(folder: &Path, options: &MergeOptions) -> ToolkitResult<MergeSummary> {
    if !folder.is_dir() {
        return Err(ToolkitError::not_found(folder));
    }
    let output_file = options
        .output_file
        .clone()
        .unwrap_or_else(|| folder.join(MERGED_FILE_NAME));

    let files = io_utils::list_delimited_files(folder)?
        .into_iter()
        .filter(|file| !same_file(file, &output_file))
        .collect::<Vec<_>>();
    if files.is_empty() {
        return Err(ToolkitError::unsupported(format!(
            "No CSV files to merge in {}",
            folder.display()
        )));
    }

    let mut merged = UnionTable::default();
    for file in &files {
        let read = reader::read_delimited_flexible(file, &options.encoding)?;
        let mut headers = mangle_duplicate_headers(read.table.headers);
        let mut rows = read.table.rows;
        if options.include_source_column {
            let tag = Some(io_utils::file_name(file));
            match headers.iter().position(|name| name == SOURCE_COLUMN) {
                Some(idx) => rows.iter_mut().for_each(|row| row[idx] = tag.clone()),
                None => {
                    headers.push(SOURCE_COLUMN.to_string());
                    rows.iter_mut().for_each(|row| row.push(tag.clone()));
                }
            }
        }
        debug!("Merging {:?}: {} row(s)", file, rows.len());
        merged.append(&headers, rows);
    }

    let table = merged.into_table()?;
    io_utils::write_normalized_table(&table, &output_file, b',', io_utils::DEFAULT_ENCODING)?;
    info!(
        "✓ Merged {} file(s), {} row(s) -> {:?}",
        files.len(),
        table.row_count(),
        output_file
    );

    Ok(MergeSummary {
        output_file,
        files_merged: files.len(),
        total_rows: table.row_count(),
        columns: table.columns().to_vec(),
    })
}

fn same_file(left: &Path, right: &Path) -> bool {
    if left == right {
        return true;
    }
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// Repeated names become `name.1`, `name.2`, ... so every column of a file stays addressable.
fn mangle_duplicate_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(headers.len());
    let mut counters: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let counter = counters.entry(name.clone()).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{name}.{counter}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Row buffer whose column set grows as files with new columns are appended.
#[derive(Debug, Default)]
struct UnionTable {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl UnionTable {
    fn append(&mut self, headers: &[String], rows: Vec<Row>) {
        let targets = headers
            .iter()
            .map(|name| match self.positions.get(name) {
                Some(&idx) => idx,
                None => {
                    let idx = self.columns.len();
                    self.columns.push(name.clone());
                    self.positions.insert(name.clone(), idx);
                    idx
                }
            })
            .collect::<Vec<_>>();
        for row in rows {
            let mut merged = vec![None; self.columns.len()];
            for (value, &target) in row.into_iter().zip(&targets) {
                merged[target] = value;
            }
            self.rows.push(merged);
        }
    }

    fn into_table(self) -> ToolkitResult<NormalizedTable> {
        let width = self.columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        NormalizedTable::new(self.columns, rows)
    }
}
