pub mod cli;
pub mod error;
pub mod excel;
pub mod header;
pub mod io_utils;
pub mod literal;
pub mod merge;
pub mod model;
pub mod naming;
pub mod projector;
pub mod reader;
pub mod sniff;
pub mod sql;
pub mod table;
pub mod validate;
pub mod warehouse;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    excel::ExcelExportOptions,
    merge::MergeOptions,
    sql::SqlOptions,
    warehouse::WarehouseSchema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("dataforge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::ExcelToCsv(args) => handle_excel_to_csv(&args),
        Commands::CsvToSql(args) => handle_csv_to_sql(&args),
        Commands::Inspect(args) => handle_inspect(&args),
        Commands::Validate(args) => handle_validate(&args),
        Commands::Merge(args) => handle_merge(&args),
        Commands::WarehouseSchema => handle_warehouse_schema(),
    }
}

fn handle_excel_to_csv(args: &cli::ExcelToCsvArgs) -> Result<()> {
    info!(
        "Exporting '{}' with delimiter '{}'",
        args.excel_path.display(),
        printable_delimiter(args.delimiter)
    );
    let options = ExcelExportOptions {
        sheets: clean_list(&args.sheets),
        delimiter: args.delimiter,
        encoding: args.encoding.clone(),
        date_keywords: clean_list(&args.date_keywords),
        drop_empty_rows: !args.keep_empty_rows,
    };
    let exports = excel::convert_excel_to_csv(&args.excel_path, args.output_dir.as_deref(), &options)
        .with_context(|| format!("Exporting sheets from {:?}", args.excel_path))?;
    let (headers, rows) = table::sheet_export_table(&exports);
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_csv_to_sql(args: &cli::CsvToSqlArgs) -> Result<()> {
    let schema = match &args.schema {
        Some(path) => WarehouseSchema::load(path)?,
        None => WarehouseSchema::staging_v2().clone(),
    };
    let options = SqlOptions {
        profile: args.profile,
        output_dir: args.output_dir.clone(),
        output_file: args.output_file.clone(),
        table_prefix: args.table_prefix.clone(),
        encoding: args.encoding.clone(),
        chunk_size: args.chunk_size,
        wrap_transaction: !args.no_transaction,
    };
    info!(
        "Generating {} SQL from '{}'",
        options.profile,
        args.source_path.display()
    );
    let report = sql::csv_to_insert_sql(&args.source_path, &options, &schema)
        .with_context(|| format!("Generating SQL from {:?}", args.source_path))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Serializing SQL report")?;
        println!("{json}");
        return Ok(());
    }
    println!("Output: {}", report.output_path.display());
    let (headers, rows) = table::sql_report_table(&report);
    table::print_table(&headers, &rows);
    for note in &report.notes {
        println!("note: {note}");
    }
    Ok(())
}

fn handle_inspect(args: &cli::InspectArgs) -> Result<()> {
    let sheets = excel::inspect_excel_structure(&args.excel_path)
        .with_context(|| format!("Inspecting {:?}", args.excel_path))?;
    let (headers, rows) = table::structure_table(&sheets);
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let report = validate::validate_csv_folder(&args.folder_path, &args.encoding)
        .with_context(|| format!("Validating CSV files in {:?}", args.folder_path))?;
    let (headers, rows) = table::quality_table(&report);
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_merge(args: &cli::MergeArgs) -> Result<()> {
    let options = MergeOptions {
        output_file: args.output_file.clone(),
        encoding: args.encoding.clone(),
        include_source_column: !args.no_source_column,
    };
    let summary = merge::merge_csv_folder(&args.folder_path, &options)
        .with_context(|| format!("Merging CSV files in {:?}", args.folder_path))?;
    let (headers, rows) = table::merge_summary_table(&summary);
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_warehouse_schema() -> Result<()> {
    print!("{}", WarehouseSchema::staging_v2().to_yaml_string()?);
    Ok(())
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .collect()
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
