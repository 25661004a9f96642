//! In-memory table shapes shared by every conversion step.
//!
//! - [`Cell`] is one spreadsheet value as the workbook reader produced it (already evaluated,
//!   lightly typed).
//! - [`RawGrid`] is a header-less grid of cells straight from a sheet.
//! - [`NormalizedTable`] is the all-text, uniquely-named table every writer consumes.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{ToolkitError, ToolkitResult};

pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// True for cells that carry no value at all (blank cells and NaN floats).
    ///
    /// A text cell holding only whitespace is *not* missing; callers that need
    /// "blank after trimming" use [`Cell::trimmed_text`].
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Native textual form of the value, `None` when missing.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => Some(text.clone()),
            Cell::Int(value) => Some(value.to_string()),
            Cell::Float(value) if value.is_nan() => None,
            Cell::Float(value) => Some(render_float(*value)),
            Cell::Bool(true) => Some("True".to_string()),
            Cell::Bool(false) => Some("False".to_string()),
            Cell::DateTime(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Trimmed text form, `None` when missing or blank.
    pub fn trimmed_text(&self) -> Option<String> {
        self.to_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(text) => Cell::Text(text.to_string()),
            None => Cell::Empty,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text().unwrap_or_default())
    }
}

/// Whole floats keep one decimal (`3.0`) so a float column never reads back as integers.
pub fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Header-less grid of cells, rows in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.rows.iter().all(|row| row.iter().all(Cell::is_missing))
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn non_empty_row_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_missing()))
            .count()
    }

    pub fn non_empty_column_count(&self) -> usize {
        (0..self.width())
            .filter(|&col| {
                self.rows
                    .iter()
                    .any(|row| row.get(col).is_some_and(|cell| !cell.is_missing()))
            })
            .count()
    }
}

/// Uniquely named columns plus rows of optional text, every row exactly as wide as the header.
///
/// Transforms consume the table and hand back a new one; nothing edits a table in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl NormalizedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> ToolkitResult<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if name.is_empty() {
                return Err(ToolkitError::InvalidTable(
                    "column names cannot be blank".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ToolkitError::InvalidTable(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ToolkitError::InvalidTable(format!(
                "row {} has {} value(s) but the table has {} column(s)",
                idx + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Builds a table from possibly repeated names, keeping the first column of each name.
    ///
    /// Blank names are dropped as well. Rows are padded or cut to the header width first.
    pub fn keep_first_columns(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut seen = HashSet::with_capacity(headers.len());
        let keep = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty() && seen.insert(name.as_str()))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let columns = keep.iter().map(|&idx| headers[idx].clone()).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                keep.iter()
                    .map(|&idx| row.get(idx).cloned().flatten())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends `target` as a copy of `source` when `source` exists and `target` does not.
    pub fn with_copied_column(mut self, source: &str, target: &str) -> Self {
        if self.has_column(target) || target.is_empty() {
            return self;
        }
        let Some(source_idx) = self.column_index(source) else {
            return self;
        };
        for row in &mut self.rows {
            let value = row[source_idx].clone();
            row.push(value);
        }
        self.columns.push(target.to_string());
        self
    }

    /// Drops rows where every value is absent.
    pub fn without_empty_rows(mut self) -> Self {
        self.rows.retain(|row| row.iter().any(Option::is_some));
        self
    }

    /// Keeps only the named columns, in the order given. Unknown names are skipped.
    pub fn select(self, names: &[String]) -> Self {
        let picks = names
            .iter()
            .filter_map(|name| self.column_index(name).map(|idx| (name.clone(), idx)))
            .collect::<Vec<_>>();
        let columns = picks.iter().map(|(name, _)| name.clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| picks.iter().map(|(_, idx)| row[*idx].clone()).collect())
            .collect();
        Self { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn new_rejects_duplicate_names() {
        let err = NormalizedTable::new(vec!["a".into(), "a".into()], Vec::new()).unwrap_err();
        assert!(err.to_string().contains("duplicate column name 'a'"));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = NormalizedTable::new(vec!["a".into(), "b".into()], vec![vec![text("1")]])
            .unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 value(s)"));
    }

    #[test]
    fn keep_first_columns_drops_later_duplicates() {
        let table = NormalizedTable::keep_first_columns(
            vec!["id".into(), "name".into(), "id".into()],
            vec![vec![text("1"), text("Ada"), text("99")]],
        );
        assert_eq!(table.columns(), ["id", "name"]);
        assert_eq!(table.rows()[0], vec![text("1"), text("Ada")]);
    }

    #[test]
    fn copied_column_never_overwrites() {
        let table = NormalizedTable::new(
            vec!["email".into(), "correo".into()],
            vec![vec![text("a@x.io"), text("b@x.io")]],
        )
        .unwrap()
        .with_copied_column("email", "correo");
        assert_eq!(table.columns(), ["email", "correo"]);
        assert_eq!(table.rows()[0][1], text("b@x.io"));
    }

    #[test]
    fn select_follows_requested_order() {
        let table = NormalizedTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![text("1"), text("2"), text("3")]],
        )
        .unwrap()
        .select(&["c".to_string(), "missing".to_string(), "a".to_string()]);
        assert_eq!(table.columns(), ["c", "a"]);
        assert_eq!(table.rows()[0], vec![text("3"), text("1")]);
    }

    #[test]
    fn cell_text_forms() {
        assert_eq!(Cell::Float(3.0).to_text().as_deref(), Some("3.0"));
        assert_eq!(Cell::Float(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(Cell::Int(42).to_text().as_deref(), Some("42"));
        assert_eq!(Cell::Bool(true).to_text().as_deref(), Some("True"));
        assert_eq!(Cell::Float(f64::NAN).to_text(), None);
        assert_eq!(Cell::Text("   ".into()).trimmed_text(), None);
    }

    #[test]
    fn grid_counts_ignore_blank_cells() {
        let grid = RawGrid::new(vec![
            vec![Cell::Text("Report".into()), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Text("id".into()), Cell::Text("name".into()), Cell::Empty],
        ]);
        assert_eq!(grid.non_empty_row_count(), 2);
        assert_eq!(grid.non_empty_column_count(), 2);
        assert!(!grid.is_empty());
    }
}
