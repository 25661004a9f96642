//! Spreadsheet input: sheet grids, adaptive header detection and CSV export.
//!
//! Workbooks are read through `calamine`. Every sheet becomes a [`RawGrid`] whose cell
//! positions match the sheet (leading blank rows and columns included), so detected header
//! rows can be reported as the row numbers a user sees in the workbook.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use log::{debug, info};
use serde::Serialize;

use crate::{
    error::{ToolkitError, ToolkitResult},
    header::{DEFAULT_SCAN_LIMIT, detect_header_row},
    io_utils,
    model::{Cell, NormalizedTable, RawGrid, Row},
    naming::{sanitize_name, unique_column_names},
};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];
pub const CSV_EXPORT_DIR: &str = "csv_exports_local";
pub const DEFAULT_DATE_KEYWORDS: [&str; 2] = ["fecha", "date"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone)]
pub struct ExcelExportOptions {
    /// Sheets to export, in this order. Empty means every sheet in workbook order.
    pub sheets: Vec<String>,
    pub delimiter: u8,
    pub encoding: String,
    /// Columns whose name contains one of these (case-insensitive) are treated as dates.
    pub date_keywords: Vec<String>,
    pub drop_empty_rows: bool,
}

impl Default for ExcelExportOptions {
    fn default() -> Self {
        Self {
            sheets: Vec::new(),
            delimiter: b',',
            encoding: io_utils::DEFAULT_ENCODING.to_string(),
            date_keywords: DEFAULT_DATE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            drop_empty_rows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetExport {
    pub sheet: String,
    pub output_file: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetStructure {
    pub sheet: String,
    pub non_empty_rows: usize,
    pub non_empty_columns: usize,
    /// 1-based, as shown by spreadsheet applications.
    pub header_row: usize,
}

type Workbook = Sheets<BufReader<File>>;

fn open_workbook(path: &Path) -> ToolkitResult<Workbook> {
    if !path.exists() {
        return Err(ToolkitError::not_found(path));
    }
    Ok(open_workbook_auto(path)?)
}

fn ensure_supported_extension(path: &Path) -> ToolkitResult<()> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });
    if supported {
        Ok(())
    } else {
        Err(ToolkitError::unsupported(format!(
            "Unsupported workbook {}. Use .xlsx, .xls or .xlsm",
            path.display()
        )))
    }
}

/// Reads one sheet as a header-less grid with absolute cell positions.
pub fn read_sheet_grid(path: &Path, sheet: &str) -> ToolkitResult<RawGrid> {
    let mut workbook = open_workbook(path)?;
    sheet_grid(&mut workbook, sheet)
}

fn sheet_grid(workbook: &mut Workbook, sheet: &str) -> ToolkitResult<RawGrid> {
    let range = workbook.worksheet_range(sheet)?;
    Ok(range_to_grid(&range))
}

fn range_to_grid(range: &Range<Data>) -> RawGrid {
    let Some((start_row, start_col)) = range.start() else {
        return RawGrid::default();
    };
    let mut rows = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    RawGrid::new(rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(value) => Cell::Int(*value),
        Data::Float(value) => whole_number(*value).map_or(Cell::Float(*value), Cell::Int),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(stamp) if stamp.is_duration() => Cell::Float(stamp.as_f64()),
        Data::DateTime(stamp) => serial_to_datetime(stamp.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Float(stamp.as_f64())),
        Data::DateTimeIso(text) => {
            parse_date_value(text).map_or_else(|| Cell::Text(text.clone()), Cell::DateTime)
        }
        Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Spreadsheet files store every number as a float; whole values read back as integers.
fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// Converts a 1900-system serial day number (fractional part = time of day).
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}

/// Reads a sheet whose header row is not necessarily the first one.
///
/// See [`adaptive_table`] for the shaping rules.
pub fn read_excel_sheet_adaptive(
    path: &Path,
    sheet: &str,
    drop_empty_rows: bool,
) -> ToolkitResult<NormalizedTable> {
    let grid = read_sheet_grid(path, sheet)?;
    adaptive_table(&grid, drop_empty_rows)
}

/// Turns a raw grid into a table: header detected, blank header cells named
/// `columna_<n>` (1-based), names sanitized and deduplicated, fully-empty columns dropped,
/// fully-empty rows dropped when `drop_empty_rows` is set.
///
/// A column counts as empty when no data row holds a value, so a sheet with a header but no
/// data rows yields a table without columns.
pub fn adaptive_table(grid: &RawGrid, drop_empty_rows: bool) -> ToolkitResult<NormalizedTable> {
    if grid.is_empty() {
        return Ok(NormalizedTable::default());
    }

    let header_row = detect_header_row(grid, DEFAULT_SCAN_LIMIT);
    let header_cells = grid.row(header_row).unwrap_or_default();
    let width = grid.width();
    let raw_names = (0..width)
        .map(|idx| {
            header_cells
                .get(idx)
                .and_then(Cell::trimmed_text)
                .unwrap_or_else(|| format!("columna_{}", idx + 1))
        })
        .collect::<Vec<_>>();
    let names = unique_column_names(&raw_names);

    let body = grid.rows()[header_row + 1..]
        .iter()
        .map(|cells| {
            (0..width)
                .map(|idx| {
                    cells
                        .get(idx)
                        .and_then(Cell::to_text)
                        .filter(|text| !text.is_empty())
                })
                .collect::<Row>()
        })
        .collect::<Vec<_>>();

    let populated = (0..width)
        .filter(|&idx| body.iter().any(|row| row[idx].is_some()))
        .map(|idx| names[idx].clone())
        .collect::<Vec<_>>();
    debug!(
        "Header at row {}; keeping {} of {} column(s)",
        header_row + 1,
        populated.len(),
        width
    );

    let table = NormalizedTable::new(names, body)?.select(&populated);
    Ok(if drop_empty_rows {
        table.without_empty_rows()
    } else {
        table
    })
}

fn parse_date_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Rewrites date-like columns as `YYYY-MM-DD`.
///
/// A column qualifies when its name contains one of `keywords` (case-insensitive). When at
/// least one value parses, parsed values are rewritten and the rest become empty; a column
/// where nothing parses is left as it was.
pub fn normalize_date_columns(table: NormalizedTable, keywords: &[String]) -> NormalizedTable {
    let keys = keywords
        .iter()
        .map(|key| key.trim().to_lowercase())
        .filter(|key| !key.is_empty())
        .collect::<Vec<_>>();
    if keys.is_empty() {
        return table;
    }

    let columns = table.columns().to_vec();
    let mut rows = table.into_rows();
    for (idx, column) in columns.iter().enumerate() {
        let name = column.to_lowercase();
        if !keys.iter().any(|key| name.contains(key.as_str())) {
            continue;
        }
        let parsed = rows
            .iter()
            .map(|row| row[idx].as_deref().and_then(parse_date_value))
            .collect::<Vec<_>>();
        if parsed.iter().all(Option::is_none) {
            continue;
        }
        debug!("Normalizing date column '{column}'");
        for (row, stamp) in rows.iter_mut().zip(parsed) {
            row[idx] = stamp.map(|stamp| stamp.format("%Y-%m-%d").to_string());
        }
    }
    NormalizedTable::keep_first_columns(columns, rows)
}

/// Exports sheets of a workbook as delimited files named after the sheets.
///
/// Output goes to `output_dir`, or `csv_exports_local` next to the workbook.
pub fn convert_excel_to_csv(
    excel_path: &Path,
    output_dir: Option<&Path>,
    options: &ExcelExportOptions,
) -> ToolkitResult<Vec<SheetExport>> {
    if !excel_path.exists() {
        return Err(ToolkitError::not_found(excel_path));
    }
    ensure_supported_extension(excel_path)?;
    io_utils::resolve_encoding(&options.encoding)?;

    let mut workbook = open_workbook(excel_path)?;
    let available = workbook.sheet_names();
    let selected = if options.sheets.is_empty() {
        available.clone()
    } else {
        options.sheets.clone()
    };
    let missing = selected
        .iter()
        .filter(|sheet| !available.contains(sheet))
        .cloned()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ToolkitError::unsupported(format!(
            "Sheets not found in workbook: {}",
            missing.join(", ")
        )));
    }

    let output_dir = output_dir.map(Path::to_path_buf).unwrap_or_else(|| {
        excel_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(CSV_EXPORT_DIR)
    });
    std::fs::create_dir_all(&output_dir)?;

    let keywords = if options.date_keywords.is_empty() {
        DEFAULT_DATE_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        options.date_keywords.clone()
    };

    let mut exports = Vec::with_capacity(selected.len());
    for sheet in selected {
        let grid = sheet_grid(&mut workbook, &sheet)?;
        let table = adaptive_table(&grid, options.drop_empty_rows)?;
        let table = normalize_date_columns(table, &keywords);

        let output_file = output_dir.join(format!("{}.csv", sanitize_name(&sheet, "hoja")));
        io_utils::write_normalized_table(&table, &output_file, options.delimiter, &options.encoding)?;
        info!(
            "✓ Sheet '{sheet}': {} row(s) -> {output_file:?}",
            table.row_count()
        );
        exports.push(SheetExport {
            sheet,
            output_file,
            rows: table.row_count(),
        });
    }
    Ok(exports)
}

/// Per-sheet overview used to decide how a workbook should be exported.
pub fn inspect_excel_structure(excel_path: &Path) -> ToolkitResult<Vec<SheetStructure>> {
    let mut workbook = open_workbook(excel_path)?;
    let mut report = Vec::new();
    for sheet in workbook.sheet_names() {
        let grid = sheet_grid(&mut workbook, &sheet)?;
        let header_row = if grid.is_empty() {
            0
        } else {
            detect_header_row(&grid, DEFAULT_SCAN_LIMIT)
        };
        report.push(SheetStructure {
            non_empty_rows: grid.non_empty_row_count(),
            non_empty_columns: grid.non_empty_column_count(),
            header_row: header_row + 1,
            sheet,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn adaptive_table_skips_banner_and_names_blank_headers() {
        let grid = RawGrid::new(vec![
            vec![text("Informe mensual")],
            vec![],
            vec![text("Nombre"), Cell::Empty, text("Monto"), text("Nota")],
            vec![text("Ada"), text("x"), Cell::Int(10), Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
            vec![text("Grace"), Cell::Empty, Cell::Float(2.5), Cell::Empty],
        ]);
        let table = adaptive_table(&grid, true).expect("table");
        assert_eq!(table.columns(), ["nombre", "columna_2", "monto"]);
        assert_eq!(
            table.rows(),
            [
                vec![some("Ada"), some("x"), some("10")],
                vec![some("Grace"), None, some("2.5")],
            ]
        );
    }

    #[test]
    fn keeps_empty_rows_when_asked() {
        let grid = RawGrid::new(vec![
            vec![text("a"), text("b")],
            vec![Cell::Empty, Cell::Empty],
            vec![text("1"), text("2")],
        ]);
        assert_eq!(adaptive_table(&grid, false).unwrap().row_count(), 2);
        assert_eq!(adaptive_table(&grid, true).unwrap().row_count(), 1);
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let grid = RawGrid::new(vec![
            vec![text("Total"), text("total")],
            vec![Cell::Int(1), Cell::Int(2)],
        ]);
        let table = adaptive_table(&grid, true).unwrap();
        assert_eq!(table.columns(), ["total", "total_2"]);
    }

    #[test]
    fn header_named_like_a_suffix_does_not_collide() {
        let grid = RawGrid::new(vec![
            vec![text("Total"), text("Total"), text("Total 2")],
            vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)],
        ]);
        let table = adaptive_table(&grid, true).expect("table");
        assert_eq!(table.columns(), ["total", "total_2", "total_2_2"]);
        assert_eq!(table.rows(), [vec![some("1"), some("2"), some("3")]]);
    }

    #[test]
    fn empty_grid_gives_empty_table() {
        let table = adaptive_table(&RawGrid::default(), true).unwrap();
        assert_eq!(table.column_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn date_columns_are_rewritten_when_something_parses() {
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_opt(8, 30, 0))
            .unwrap();
        let table = NormalizedTable::new(
            vec!["fecha_pago".into(), "update_date".into(), "monto".into()],
            vec![
                vec![
                    Cell::DateTime(stamp).to_text(),
                    some("pending"),
                    some("2024-01-01"),
                ],
                vec![some("not a date"), None, some("12")],
                vec![some("15/03/2024"), some("later"), None],
            ],
        )
        .unwrap();
        let keywords = vec!["FECHA".to_string(), "date".to_string()];
        let table = normalize_date_columns(table, &keywords);
        let rows = table.rows();
        assert_eq!(rows[0][0], some("2024-03-09"));
        assert_eq!(rows[1][0], None);
        assert_eq!(rows[2][0], some("2024-03-15"));
        // nothing parsed: untouched
        assert_eq!(rows[0][1], some("pending"));
        // not a date column
        assert_eq!(rows[0][2], some("2024-01-01"));
    }

    #[test]
    fn blank_keywords_disable_date_handling() {
        let table =
            NormalizedTable::new(vec!["fecha".into()], vec![vec![some("2024-01-02 10:00:00")]])
                .unwrap();
        let same = normalize_date_columns(table.clone(), &[" ".to_string()]);
        assert_eq!(same, table);
    }

    #[test]
    fn serial_numbers_convert_to_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(serial_to_datetime(45292.5), Some(expected));
        assert_eq!(serial_to_datetime(f64::INFINITY), None);
    }

    #[test]
    fn error_cells_read_as_empty() {
        assert_eq!(
            data_to_cell(&Data::Error(calamine::CellErrorType::Div0)),
            Cell::Empty
        );
        assert_eq!(data_to_cell(&Data::Float(1.5)), Cell::Float(1.5));
    }

    #[test]
    fn whole_floats_read_as_integers() {
        assert_eq!(data_to_cell(&Data::Float(12345.0)), Cell::Int(12345));
        assert_eq!(data_to_cell(&Data::Float(-3.0)), Cell::Int(-3));
        assert_eq!(data_to_cell(&Data::Float(1e300)), Cell::Float(1e300));
        assert!(matches!(data_to_cell(&Data::Float(f64::NAN)), Cell::Float(_)));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = ensure_supported_extension(Path::new("book.ods")).unwrap_err();
        assert!(matches!(err, ToolkitError::Unsupported(_)));
        assert!(ensure_supported_extension(Path::new("Book.XLSX")).is_ok());
    }
}
