//! SQL `INSERT` generation from delimited files.
//!
//! Two profiles share the literal encoder:
//!
//! - **warehouse**: every file is routed to a staging table of a [`WarehouseSchema`],
//!   projected onto that table's allow-list and written as one single-row `INSERT` per
//!   record into one script, optionally wrapped in a transaction.
//! - **generic**: every file becomes its own script with chunked multi-row `INSERT`s into a
//!   table named after the file.
//!
//! Files are handled in file-name order. A file that cannot be used (unreadable, empty,
//! unmapped, nothing left after projection) only adds a note and a zero count to the
//! [`SqlGenerationReport`]; only a missing source path or an empty folder stops the run, and
//! both are detected before any output is created.

use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    error::{ToolkitError, ToolkitResult},
    io_utils,
    literal::text_literal,
    model::NormalizedTable,
    naming::{normalize_column_name, sanitize_name, unique_column_names},
    projector,
    reader::{self, FlexibleRead},
    warehouse::WarehouseSchema,
};

pub const SQL_EXPORT_DIR: &str = "sql_exports_local";
pub const WAREHOUSE_FILE_NAME: &str = "warehouse_seed.sql";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
const WAREHOUSE_BANNER: &str = "-- DATA LOAD FOR SCHEMA V2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlProfile {
    #[default]
    Warehouse,
    Generic,
}

impl SqlProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlProfile::Warehouse => "warehouse",
            SqlProfile::Generic => "generic",
        }
    }
}

impl fmt::Display for SqlProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlProfile {
    type Err = ToolkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warehouse" | "warehouse_clean" => Ok(SqlProfile::Warehouse),
            "generic" => Ok(SqlProfile::Generic),
            other => Err(ToolkitError::unsupported(format!(
                "Unsupported SQL profile '{other}'. Use 'warehouse' or 'generic'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlOptions {
    pub profile: SqlProfile,
    /// Generic profile: folder receiving one script per input file.
    pub output_dir: Option<PathBuf>,
    /// Warehouse profile: the single script to write.
    pub output_file: Option<PathBuf>,
    pub table_prefix: String,
    pub encoding: String,
    pub chunk_size: usize,
    pub wrap_transaction: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            profile: SqlProfile::default(),
            output_dir: None,
            output_file: None,
            table_prefix: String::new(),
            encoding: io_utils::DEFAULT_ENCODING.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            wrap_transaction: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    pub label: String,
    pub rows: usize,
}

/// Audit trail of one conversion run: rows per item, in processing order, plus notes.
#[derive(Debug, Clone, Serialize)]
pub struct SqlGenerationReport {
    pub profile: SqlProfile,
    pub output_path: PathBuf,
    pub items: Vec<ReportItem>,
    pub notes: Vec<String>,
}

impl SqlGenerationReport {
    pub fn new(profile: SqlProfile, output_path: PathBuf) -> Self {
        Self {
            profile,
            output_path,
            items: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Records the row count for `label`, replacing an earlier count under the same label.
    pub fn record(&mut self, label: impl Into<String>, rows: usize) {
        let label = label.into();
        match self.items.iter_mut().find(|item| item.label == label) {
            Some(item) => item.rows = rows,
            None => self.items.push(ReportItem { label, rows }),
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn rows_for(&self, label: &str) -> Option<usize> {
        self.items
            .iter()
            .find(|item| item.label == label)
            .map(|item| item.rows)
    }

    pub fn total_rows(&self) -> usize {
        self.items.iter().map(|item| item.rows).sum()
    }
}

pub fn csv_to_insert_sql(
    source: &Path,
    options: &SqlOptions,
    schema: &WarehouseSchema,
) -> ToolkitResult<SqlGenerationReport> {
    match options.profile {
        SqlProfile::Generic => csv_to_insert_sql_generic(source, options),
        SqlProfile::Warehouse => csv_to_insert_sql_warehouse(source, options, schema),
    }
}

/// `<dir of file>/sql_exports_local` for a file, `<folder>/sql_exports_local` for a folder.
pub fn default_sql_dir(source: &Path) -> PathBuf {
    if source.is_file() {
        source
            .parent()
            .map(|parent| parent.join(SQL_EXPORT_DIR))
            .unwrap_or_else(|| PathBuf::from(SQL_EXPORT_DIR))
    } else {
        source.join(SQL_EXPORT_DIR)
    }
}

pub fn csv_to_insert_sql_generic(
    source: &Path,
    options: &SqlOptions,
) -> ToolkitResult<SqlGenerationReport> {
    io_utils::resolve_encoding(&options.encoding)?;
    let files = io_utils::resolve_sources(source)?;
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| default_sql_dir(source));
    fs::create_dir_all(&output_dir)?;
    let chunk_size = options.chunk_size.max(1);

    let mut report = SqlGenerationReport::new(SqlProfile::Generic, output_dir.clone());
    for file in &files {
        let name = io_utils::file_name(file);
        let table_name = sanitize_name(
            &format!("{}{}", options.table_prefix, io_utils::file_stem(file)),
            "tabla",
        );
        let (content, rows) =
            match generic_script(file, &table_name, &options.encoding, chunk_size) {
                Ok((read, content, rows)) => {
                    if read.used_fallback(&options.encoding) {
                        report.note(format!("{name}: encoding detected '{}'", read.encoding));
                    }
                    (content, rows)
                }
                Err(err) => {
                    let note = format!("{name}: could not be read ({err})");
                    warn!("{note}");
                    report.note(note.clone());
                    (
                        format!("-- WARNING: {note}\n-- No rows to insert into {table_name}\n"),
                        0,
                    )
                }
            };

        let sql_file = output_dir.join(format!("{table_name}.sql"));
        fs::write(&sql_file, content)?;
        info!("✓ {name}: {rows} row(s) -> {sql_file:?}");
        report.record(io_utils::file_name(&sql_file), rows);
    }
    Ok(report)
}

fn generic_script(
    file: &Path,
    table_name: &str,
    encoding: &str,
    chunk_size: usize,
) -> ToolkitResult<(FlexibleRead, String, usize)> {
    let mut read = reader::read_delimited_flexible(file, encoding)?;
    if read.table.is_blank() {
        let content = format!(
            "-- Empty CSV: {}\n-- No rows to insert into {table_name}\n",
            io_utils::file_name(file)
        );
        return Ok((read, content, 0));
    }
    let columns = unique_column_names(&read.table.headers);
    let rows = std::mem::take(&mut read.table.rows);
    let table = NormalizedTable::new(columns, rows)?.without_empty_rows();
    let content = build_insert_statements(&table, table_name, chunk_size);
    Ok((read, content, table.row_count()))
}

/// Multi-row `INSERT ... VALUES (...),(...);` statements of at most `chunk_size` rows each.
pub fn build_insert_statements(
    table: &NormalizedTable,
    table_name: &str,
    chunk_size: usize,
) -> String {
    let column_sql = table.columns().join(", ");
    let statements = table
        .rows()
        .chunks(chunk_size.max(1))
        .map(|chunk| {
            let values = chunk.iter().map(|row| row_values_sql(row)).join(",\n");
            format!("INSERT INTO {table_name} ({column_sql}) VALUES\n{values};\n")
        })
        .collect::<Vec<_>>();
    if statements.is_empty() {
        format!("-- No rows to insert into {table_name}\n")
    } else {
        statements.join("\n")
    }
}

fn row_values_sql(row: &[Option<String>]) -> String {
    format!(
        "({})",
        row.iter()
            .map(|value| text_literal(value.as_deref()))
            .join(", ")
    )
}

pub fn csv_to_insert_sql_warehouse(
    source: &Path,
    options: &SqlOptions,
    schema: &WarehouseSchema,
) -> ToolkitResult<SqlGenerationReport> {
    io_utils::resolve_encoding(&options.encoding)?;
    let files = io_utils::resolve_sources(source)?;
    let output_file = options
        .output_file
        .clone()
        .unwrap_or_else(|| default_sql_dir(source).join(WAREHOUSE_FILE_NAME));
    io_utils::ensure_parent_dir(&output_file)?;

    let mut report = SqlGenerationReport::new(SqlProfile::Warehouse, output_file.clone());
    let mut out = BufWriter::new(File::create(&output_file)?);
    writeln!(out, "{WAREHOUSE_BANNER}")?;
    if options.wrap_transaction {
        out.write_all(b"BEGIN;\n\n")?;
    }
    for file in &files {
        emit_warehouse_file(&mut out, file, &options.encoding, schema, &mut report)?;
    }
    if options.wrap_transaction {
        out.write_all(b"\nCOMMIT;\n")?;
    }
    out.flush()?;

    info!(
        "Wrote {} INSERT row(s) from {} file(s) to {:?}",
        report.total_rows(),
        files.len(),
        output_file
    );
    Ok(report)
}

fn emit_warehouse_file<W: Write>(
    out: &mut W,
    file: &Path,
    encoding: &str,
    schema: &WarehouseSchema,
    report: &mut SqlGenerationReport,
) -> ToolkitResult<()> {
    let name = io_utils::file_name(file);
    let base_name = sanitize_name(&io_utils::file_stem(file), "archivo");

    let Some(target) = schema.resolve_target_table(&base_name) else {
        if schema.is_ignored(&base_name) {
            debug!("Ignoring {name}");
        } else {
            let note = format!("Skipped without mapping: {name}");
            warn!("{note}");
            writeln!(out, "-- WARNING: {note}")?;
            report.note(note);
        }
        return Ok(());
    };
    let label = format!("{name} -> {target}");

    let read = match reader::read_delimited_flexible(file, encoding) {
        Ok(read) => read,
        Err(err) => {
            let note = format!("{name}: could not be read ({err})");
            warn!("{note}");
            writeln!(out, "-- WARNING: {note}")?;
            report.note(note);
            report.record(label, 0);
            return Ok(());
        }
    };
    if read.used_fallback(encoding) {
        report.note(format!("{name}: encoding detected '{}'", read.encoding));
    }
    if read.table.is_blank() {
        writeln!(out, "-- INFO: empty CSV {name}")?;
        report.record(label, 0);
        return Ok(());
    }

    let headers = read
        .table
        .headers
        .iter()
        .map(|header| normalize_column_name(header))
        .collect();
    let table = NormalizedTable::keep_first_columns(headers, read.table.rows);
    let Some(projected) = projector::project(table, target, schema) else {
        let note = format!("{name} has no valid columns for {target}");
        warn!("{note}");
        writeln!(out, "-- WARNING: {note}")?;
        report.note(note);
        return Ok(());
    };

    let column_sql = projected.columns().join(", ");
    for row in projected.rows() {
        writeln!(
            out,
            "INSERT INTO {target} ({column_sql}) VALUES {};",
            row_values_sql(row)
        )?;
    }
    info!("✓ {label}: {} row(s)", projected.row_count());
    report.record(label, projected.row_count());
    Ok(())
}
