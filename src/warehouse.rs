//! Destination schema for the warehouse SQL profile.
//!
//! A [`WarehouseSchema`] bundles everything needed to route a delimited file to a staging
//! table and shape its columns: the ordered routing table, per-table allow-lists, rename
//! rules, derived copies and the keywords of files that are skipped without a warning.
//! The built-in "staging v2" schema is static data; an equivalent YAML document can be
//! loaded instead. Routing entries are a YAML sequence so their order is preserved, which
//! matters for the substring fallback.

use std::{fs, path::Path, sync::LazyLock};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::naming::normalize_column_name;

const STAGING_V2_ROUTES: &[(&str, &str)] = &[
    ("terapia", "stg_terapias"),
    ("consejeria", "stg_terapias"),
    ("consejeria_por_llamada", "stg_terapias"),
    ("bloques", "stg_chat"),
    ("capacitacion", "stg_capacitaciones"),
    ("viaticos", "stg_viaticos"),
    ("contabilidad", "stg_viaticos"),
    ("organizaciones", "stg_organizaciones"),
    ("usuarioterapia", "stg_profesionales"),
    ("users", "stg_profesionales"),
    ("report", "stg_report"),
    ("terapias", "stg_terapias"),
    ("chat", "stg_chat"),
    ("capacitaciones", "stg_capacitaciones"),
    ("profesionales", "stg_profesionales"),
];

const STAGING_V2_ALLOWED: &[(&str, &[&str])] = &[
    (
        "stg_terapias",
        &[
            "appsheet_row_id",
            "fecha",
            "mes",
            "organizacion",
            "tipo",
            "profesional",
            "paciente",
            "servicio",
            "modalidad",
            "idioma",
            "pareja",
            "motivo_consulta",
            "motivo_consulta_otro",
            "honorarios",
            "precio",
            "sesiones",
            "estado",
            "moneda",
            "observaciones",
            "fec",
            "usuarix",
            "usuariochatname",
            "tipoconsulta",
            "tipollamada",
            "tipoterapia",
            "tipopda",
            "horario",
            "propietario",
            "comentario",
            "comentarios",
            "duracion",
            "org_name_raw",
        ],
    ),
    (
        "stg_chat",
        &[
            "appsheet_row_id",
            "fecha",
            "mes",
            "organizacion",
            "tipo",
            "profesional",
            "paciente",
            "servicio",
            "modalidad",
            "idioma",
            "motivo_consulta",
            "honorarios",
            "precio",
            "bloques_horas",
            "estado",
            "moneda",
            "observaciones",
            "org_name_raw",
        ],
    ),
    (
        "stg_capacitaciones",
        &[
            "appsheet_row_id",
            "fecha",
            "mes",
            "organizacion",
            "servicio",
            "modalidad",
            "participantes",
            "precio",
            "estado",
            "observaciones",
            "org_name_raw",
        ],
    ),
    (
        "stg_viaticos",
        &[
            "appsheet_row_id",
            "fecha",
            "organizacion",
            "tipo",
            "profesional",
            "concepto",
            "monto",
            "moneda",
            "estado",
            "receipt_url",
            "observaciones",
            "ordenpagoid",
            "fechapago",
            "fechadeposito",
            "total",
            "org_name_raw",
            "comprobantedeposito",
        ],
    ),
    (
        "stg_organizaciones",
        &[
            "appsheet_row_id",
            "organizacion",
            "tipo",
            "canal",
            "nameorg",
            "org_name_raw",
        ],
    ),
    (
        "stg_profesionales",
        &[
            "appsheet_row_id",
            "profesional",
            "correo",
            "telefono",
            "usuarix",
            "name",
            "email",
            "propietario",
        ],
    ),
];

// Source names as exported upstream; they are normalized before matching, which is why
// the mis-decoded "organizaciÃ³n" header appears here verbatim.
const STAGING_V2_RENAMES: &[(&str, &str)] = &[
    ("id", "appsheet_row_id"),
    ("userid", "appsheet_row_id"),
    ("_row_number", "appsheet_row_id"),
    ("ordenpagoid", "appsheet_row_id"),
    ("organizaciÃ³n", "org_name_raw"),
    ("nameorg", "org_name_raw"),
    ("date", "fecha"),
    ("fecservicio", "fecha"),
    ("useremail", "correo"),
    ("username", "name"),
];

const STAGING_V2_DERIVATIONS: &[(&str, &str)] =
    &[("organizacion", "org_name_raw"), ("email", "correo")];

const STAGING_V2_IGNORE: &[&str] = &["grafica", "filtro", "documents", "mettings"];

static STAGING_V2: LazyLock<WarehouseSchema> = LazyLock::new(|| {
    WarehouseSchema {
        name: "staging_v2".to_string(),
        routes: STAGING_V2_ROUTES
            .iter()
            .map(|(source, table)| RouteEntry::new(source, table))
            .collect(),
        allowed_columns: STAGING_V2_ALLOWED
            .iter()
            .map(|(table, columns)| AllowedColumns {
                table: table.to_string(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
            })
            .collect(),
        renames: STAGING_V2_RENAMES
            .iter()
            .map(|(source, target)| ColumnCopy::new(source, target))
            .collect(),
        derivations: STAGING_V2_DERIVATIONS
            .iter()
            .map(|(source, target)| ColumnCopy::new(source, target))
            .collect(),
        ignore_keywords: STAGING_V2_IGNORE.iter().map(|k| k.to_string()).collect(),
    }
    .normalized()
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteEntry {
    /// Sanitized file-name fragment.
    pub source: String,
    pub table: String,
}

impl RouteEntry {
    fn new(source: &str, table: &str) -> Self {
        Self {
            source: source.to_string(),
            table: table.to_string(),
        }
    }
}

/// Ordered allow-list for one destination table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowedColumns {
    pub table: String,
    pub columns: Vec<String>,
}

/// Copies `source` into `target` when the table has the former and lacks the latter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnCopy {
    pub source: String,
    pub target: String,
}

impl ColumnCopy {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseSchema {
    pub name: String,
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub allowed_columns: Vec<AllowedColumns>,
    #[serde(default)]
    pub renames: Vec<ColumnCopy>,
    #[serde(default)]
    pub derivations: Vec<ColumnCopy>,
    #[serde(default)]
    pub ignore_keywords: Vec<String>,
}

impl WarehouseSchema {
    pub fn staging_v2() -> &'static WarehouseSchema {
        &STAGING_V2
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening warehouse schema {path:?}"))?;
        let schema: WarehouseSchema = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing warehouse schema {path:?}"))?;
        schema.ensure_valid()?;
        Ok(schema.normalized())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing warehouse schema")
    }

    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(
            !self.routes.is_empty(),
            "Warehouse schema '{}' defines no routes",
            self.name
        );
        for route in &self.routes {
            ensure!(
                !route.source.trim().is_empty() && !route.table.trim().is_empty(),
                "Warehouse schema '{}' has a route with a blank source or table",
                self.name
            );
        }
        for allowed in &self.allowed_columns {
            ensure!(
                !allowed.columns.is_empty(),
                "Allow-list for table '{}' is empty",
                allowed.table
            );
        }
        Ok(())
    }

    /// Rename and derivation sources are matched against normalized column names.
    fn normalized(mut self) -> Self {
        for rule in self.renames.iter_mut().chain(self.derivations.iter_mut()) {
            rule.source = normalize_column_name(&rule.source);
        }
        self
    }

    /// Exact key match first, then the first route (in declaration order) whose key occurs
    /// inside `base_name`.
    pub fn resolve_target_table(&self, base_name: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.source == base_name)
            .or_else(|| {
                self.routes
                    .iter()
                    .find(|route| base_name.contains(route.source.as_str()))
            })
            .map(|route| route.table.as_str())
    }

    /// Unmapped files whose name contains an ignore keyword are skipped silently.
    pub fn is_ignored(&self, base_name: &str) -> bool {
        self.ignore_keywords
            .iter()
            .any(|keyword| base_name.contains(keyword.as_str()))
    }

    pub fn allowed_columns(&self, table: &str) -> Option<&[String]> {
        self.allowed_columns
            .iter()
            .find(|allowed| allowed.table == table)
            .map(|allowed| allowed.columns.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn exact_match_wins() {
        let schema = WarehouseSchema::staging_v2();
        assert_eq!(schema.resolve_target_table("users"), Some("stg_profesionales"));
        assert_eq!(schema.resolve_target_table("chat"), Some("stg_chat"));
    }

    #[test]
    fn substring_fallback_uses_declaration_order() {
        let schema = WarehouseSchema::staging_v2();
        // "terapia" is declared before "terapias" and "usuarioterapia".
        assert_eq!(
            schema.resolve_target_table("export_terapias_2024"),
            Some("stg_terapias")
        );
        assert_eq!(
            schema.resolve_target_table("usuarioterapia_list"),
            Some("stg_terapias")
        );
        assert_eq!(
            schema.resolve_target_table("bloques_chat"),
            Some("stg_chat")
        );
    }

    #[test]
    fn unmapped_and_ignored() {
        let schema = WarehouseSchema::staging_v2();
        assert_eq!(schema.resolve_target_table("random_unmapped_thing"), None);
        assert!(!schema.is_ignored("random_unmapped_thing"));
        assert!(schema.is_ignored("grafica_mensual"));
    }

    #[test]
    fn rename_sources_are_normalized() {
        let schema = WarehouseSchema::staging_v2();
        assert!(
            schema
                .renames
                .iter()
                .any(|rule| rule.source == "organizaci_n" && rule.target == "org_name_raw")
        );
        assert!(schema.renames.iter().any(|rule| rule.source == "row_number"));
    }

    #[test]
    fn report_table_has_no_allow_list() {
        let schema = WarehouseSchema::staging_v2();
        assert!(schema.allowed_columns("stg_report").is_none());
        assert_eq!(
            schema.allowed_columns("stg_organizaciones").map(<[String]>::len),
            Some(6)
        );
    }

    #[test]
    fn yaml_round_trip_preserves_route_order() {
        let yaml = WarehouseSchema::staging_v2()
            .to_yaml_string()
            .expect("serialize");
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).unwrap();
        let loaded = WarehouseSchema::load(file.path()).expect("load");
        assert_eq!(&loaded, WarehouseSchema::staging_v2());
    }

    #[test]
    fn load_rejects_schema_without_routes() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "name: empty\nroutes: []").unwrap();
        let err = WarehouseSchema::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("defines no routes"));
    }
}
