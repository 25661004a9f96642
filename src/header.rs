//! Header row detection for sheets that carry titles, banners or notes above the data.

use std::collections::HashSet;

use log::debug;

use crate::model::RawGrid;

pub const DEFAULT_SCAN_LIMIT: usize = 30;

/// Index (0-based) of the row that most looks like a header among the first `scan_limit` rows.
///
/// Rows with fewer than two non-blank cells are never considered. A row scores its number
/// of non-blank cells, plus twice its share of distinct values, minus its share of plain
/// numbers; the first row reaching the best score wins. Falls back to row 0.
pub fn detect_header_row(grid: &RawGrid, scan_limit: usize) -> usize {
    let mut best_row = 0;
    let mut best_score = f64::NEG_INFINITY;

    for (idx, row) in grid.rows().iter().take(scan_limit).enumerate() {
        let values = row
            .iter()
            .filter_map(|cell| cell.trimmed_text())
            .collect::<Vec<_>>();
        let Some(score) = score_row(&values) else {
            continue;
        };
        if score > best_score {
            best_score = score;
            best_row = idx;
        }
    }

    debug!("Header row detected at index {best_row}");
    best_row
}

fn score_row(values: &[String]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let total = values.len() as f64;
    let unique = values
        .iter()
        .map(|value| value.to_lowercase())
        .collect::<HashSet<_>>()
        .len() as f64;
    let numeric = values.iter().filter(|value| is_plain_number(value)).count() as f64;
    Some(total + 2.0 * (unique / total) - numeric / total)
}

/// Digits with at most one decimal point, e.g. `12`, `3.5`, `.5`. Signs do not count.
fn is_plain_number(value: &str) -> bool {
    let digits = value.replacen('.', "", 1);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn skips_banner_row() {
        let grid = RawGrid::new(vec![
            vec![text("Quarterly report"), Cell::Empty],
            vec![text("name"), text("amount")],
            vec![text("Ada"), Cell::Int(10)],
            vec![text("Grace"), Cell::Int(20)],
            vec![text("Linus"), Cell::Int(30)],
        ]);
        assert_eq!(detect_header_row(&grid, DEFAULT_SCAN_LIMIT), 1);
    }

    #[test]
    fn prefers_text_over_numbers_on_ties() {
        let grid = RawGrid::new(vec![
            vec![Cell::Int(1), Cell::Float(2.5)],
            vec![text("a"), text("b")],
        ]);
        assert_eq!(detect_header_row(&grid, DEFAULT_SCAN_LIMIT), 1);
    }

    #[test]
    fn first_row_wins_exact_ties() {
        let grid = RawGrid::new(vec![
            vec![text("a"), text("b")],
            vec![text("c"), text("d")],
        ]);
        assert_eq!(detect_header_row(&grid, DEFAULT_SCAN_LIMIT), 0);
    }

    #[test]
    fn defaults_to_zero_for_single_column_grids() {
        let grid = RawGrid::new(vec![vec![text("only")], vec![text("one")]]);
        assert_eq!(detect_header_row(&grid, DEFAULT_SCAN_LIMIT), 0);
        assert_eq!(detect_header_row(&RawGrid::default(), DEFAULT_SCAN_LIMIT), 0);
    }

    #[test]
    fn never_picks_sparse_row_when_a_wide_row_exists() {
        let grid = RawGrid::new(vec![
            vec![text("   "), text("title")],
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::Int(1), Cell::Int(2)],
        ]);
        assert_eq!(detect_header_row(&grid, DEFAULT_SCAN_LIMIT), 2);
    }

    #[test]
    fn respects_scan_limit() {
        let mut rows = vec![vec![text("x"), Cell::Empty, Cell::Empty]; 3];
        rows.push(vec![text("a"), text("b"), text("c")]);
        let grid = RawGrid::new(rows);
        assert_eq!(detect_header_row(&grid, 3), 0);
        assert_eq!(detect_header_row(&grid, 4), 3);
    }

    #[test]
    fn plain_number_rules() {
        assert!(is_plain_number("12"));
        assert!(is_plain_number("3.50"));
        assert!(!is_plain_number("1.2.3"));
        assert!(!is_plain_number("-4"));
        assert!(!is_plain_number("."));
    }
}
