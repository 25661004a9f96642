use log::debug;

use crate::{model::NormalizedTable, warehouse::WarehouseSchema};

/// Shapes `table` for `destination`: renames and derivations as column copies, empty rows
/// dropped, then the allow-list intersection in allow-list order.
///
/// Tables without an allow-list keep every column. Returns `None` when no column survives.
/// The input is expected to carry unique names already (duplicates keep their first
/// occurrence when the table is built).
pub fn project(
    table: NormalizedTable,
    destination: &str,
    schema: &WarehouseSchema,
) -> Option<NormalizedTable> {
    let mut shaped = table;
    for rule in schema.renames.iter().chain(&schema.derivations) {
        shaped = shaped.with_copied_column(&rule.source, &rule.target);
    }
    let shaped = shaped.without_empty_rows();

    let final_columns = match schema.allowed_columns(destination) {
        Some(allowed) => allowed
            .iter()
            .filter(|column| shaped.has_column(column))
            .cloned()
            .collect::<Vec<_>>(),
        None => shaped
            .columns()
            .iter()
            .filter(|column| !column.is_empty())
            .cloned()
            .collect(),
    };
    debug!(
        "Projected {} column(s) onto {destination}: {:?}",
        final_columns.len(),
        final_columns
    );

    if final_columns.is_empty() {
        return None;
    }
    Some(shaped.select(&final_columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn table(columns: &[&str], rows: Vec<Vec<Option<String>>>) -> NormalizedTable {
        NormalizedTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
            .expect("valid table")
    }

    #[test]
    fn renames_copy_into_canonical_columns() {
        let input = table(
            &["id", "useremail", "username", "telefono"],
            vec![vec![text("7"), text("a@x.io"), text("Ada"), None]],
        );
        let projected =
            project(input, "stg_profesionales", WarehouseSchema::staging_v2()).expect("columns");
        assert_eq!(
            projected.columns(),
            ["appsheet_row_id", "correo", "telefono", "name"]
        );
        assert_eq!(
            projected.rows()[0],
            vec![text("7"), text("a@x.io"), None, text("Ada")]
        );
    }

    #[test]
    fn existing_target_is_not_overwritten() {
        let input = table(
            &["appsheet_row_id", "id", "organizacion"],
            vec![vec![text("keep"), text("other"), text("ACME")]],
        );
        let projected =
            project(input, "stg_organizaciones", WarehouseSchema::staging_v2()).expect("columns");
        assert_eq!(
            projected.columns(),
            ["appsheet_row_id", "organizacion", "org_name_raw"]
        );
        assert_eq!(
            projected.rows()[0],
            vec![text("keep"), text("ACME"), text("ACME")]
        );
    }

    #[test]
    fn email_derives_correo() {
        let input = table(&["email"], vec![vec![text("b@x.io")]]);
        let projected =
            project(input, "stg_profesionales", WarehouseSchema::staging_v2()).expect("columns");
        assert_eq!(projected.columns(), ["correo", "email"]);
    }

    #[test]
    fn drops_fully_empty_rows_only() {
        let input = table(
            &["fecha", "monto", "extra"],
            vec![
                vec![None, None, None],
                vec![None, None, text("only extra")],
                vec![text("2024-01-02"), text("10"), None],
            ],
        );
        let projected =
            project(input, "stg_viaticos", WarehouseSchema::staging_v2()).expect("columns");
        assert_eq!(projected.columns(), ["fecha", "monto"]);
        assert_eq!(projected.row_count(), 2);
        assert_eq!(projected.rows()[0], vec![None, None]);
    }

    #[test]
    fn no_allow_list_keeps_all_columns() {
        let input = table(&["b", "a"], vec![vec![text("1"), text("2")]]);
        let projected = project(input, "stg_report", WarehouseSchema::staging_v2()).expect("columns");
        assert_eq!(projected.columns(), ["b", "a"]);
    }

    #[test]
    fn empty_intersection_yields_none() {
        let input = table(&["foo", "bar"], vec![vec![text("1"), text("2")]]);
        assert!(project(input, "stg_chat", WarehouseSchema::staging_v2()).is_none());
    }
}
