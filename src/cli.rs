use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::sql::{DEFAULT_CHUNK_SIZE, SqlProfile};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Turn spreadsheets and CSV files into clean CSV and SQL INSERT scripts",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export workbook sheets to CSV, detecting the header row of each sheet
    ExcelToCsv(ExcelToCsvArgs),
    /// Generate SQL INSERT scripts from a CSV file or a folder of CSV files
    CsvToSql(CsvToSqlArgs),
    /// Show rows, columns and the detected header row of every sheet
    Inspect(InspectArgs),
    /// Report the shape of every CSV file in a folder
    Validate(ValidateArgs),
    /// Combine every CSV file in a folder into one file
    Merge(MergeArgs),
    /// Print the built-in warehouse schema as YAML
    WarehouseSchema,
}

#[derive(Debug, Args)]
pub struct ExcelToCsvArgs {
    /// Workbook to export (.xlsx, .xls or .xlsm)
    #[arg(long = "excel-path")]
    pub excel_path: PathBuf,
    /// Output folder (defaults to csv_exports_local next to the workbook)
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Comma-separated sheet names (defaults to every sheet)
    #[arg(long, value_delimiter = ',')]
    pub sheets: Vec<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Character encoding of the CSV output
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,
    /// Comma-separated keywords marking date columns
    #[arg(long = "date-keywords", value_delimiter = ',', default_values = ["fecha", "date"])]
    pub date_keywords: Vec<String>,
    /// Keep rows where every cell is empty
    #[arg(long = "keep-empty-rows")]
    pub keep_empty_rows: bool,
}

#[derive(Debug, Args)]
pub struct CsvToSqlArgs {
    /// CSV file or folder of CSV files
    #[arg(long = "source-path")]
    pub source_path: PathBuf,
    /// Output profile: warehouse or generic
    #[arg(long, value_parser = parse_profile, default_value = "warehouse")]
    pub profile: SqlProfile,
    /// Folder for generic scripts (defaults to sql_exports_local next to the source)
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Warehouse script path (defaults to sql_exports_local/warehouse_seed.sql)
    #[arg(long = "output-file")]
    pub output_file: Option<PathBuf>,
    /// Prefix prepended to generic table names
    #[arg(long = "table-prefix", default_value = "")]
    pub table_prefix: String,
    /// Preferred encoding of the CSV input
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,
    /// Rows per INSERT statement in the generic profile
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Do not wrap the warehouse script in BEGIN/COMMIT
    #[arg(long = "no-transaction")]
    pub no_transaction: bool,
    /// YAML warehouse schema to use instead of the built-in one
    #[arg(long)]
    pub schema: Option<PathBuf>,
    /// Print the generation report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Workbook to inspect
    #[arg(long = "excel-path")]
    pub excel_path: PathBuf,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Folder holding the CSV files
    #[arg(long = "folder-path")]
    pub folder_path: PathBuf,
    /// Preferred encoding of the CSV input
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Folder holding the CSV files
    #[arg(long = "folder-path")]
    pub folder_path: PathBuf,
    /// Merged CSV path (defaults to merged_all.csv inside the folder)
    #[arg(long = "output-file")]
    pub output_file: Option<PathBuf>,
    /// Preferred encoding of the CSV input
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,
    /// Do not add the source_file column
    #[arg(long = "no-source-column")]
    pub no_source_column: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_profile(value: &str) -> Result<SqlProfile, String> {
    value.parse::<SqlProfile>().map_err(|err| err.to_string())
}
