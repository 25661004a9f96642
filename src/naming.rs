//! Identifier sanitizing for table, file, sheet and column names.
//!
//! Every name that reaches a SQL statement or an output file name passes through
//! [`sanitize_name`], so the result is always lowercase `[a-z0-9_]`, never starts or ends
//! with an underscore, and never repeats one.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

pub const COLUMN_FALLBACK: &str = "columna";

static NON_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9_]+").expect("identifier character class is a valid regex")
});
static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("underscore run is a valid regex"));

/// Lowercase snake_case form of `value`, or `fallback` when nothing survives.
pub fn sanitize_name(value: &str, fallback: &str) -> String {
    let lowered = value.trim().to_lowercase().replace(char::is_whitespace, "_");
    let replaced = NON_IDENTIFIER.replace_all(&lowered, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    let cleaned = collapsed.trim_matches('_');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Sanitizes every name and suffixes repeats with `_2`, `_3`, ... in order of appearance.
///
/// The first occurrence keeps the bare name, so reordering the input changes which
/// column receives which suffix. A suffixed candidate that is already in use (a header
/// literally named `total_2`) is skipped for the next free number.
pub fn unique_column_names<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(columns.len());
    for name in columns {
        let base = sanitize_name(name.as_ref(), COLUMN_FALLBACK);
        let unique = if used.contains(&base) {
            let suffix = next_suffix.entry(base.clone()).or_insert(2);
            loop {
                let candidate = format!("{base}_{suffix}");
                *suffix += 1;
                if !used.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            base
        };
        used.insert(unique.clone());
        result.push(unique);
    }
    result
}

/// Column-name normalisation used when matching files against the warehouse schema.
///
/// Dots are removed outright (`e.mail` becomes `email`) and slashes and hyphens become
/// underscores before the regular sanitizing rules apply.
pub fn normalize_column_name(value: &str) -> String {
    let prepared = value
        .trim()
        .to_lowercase()
        .replace('/', "_")
        .replace('.', "")
        .replace('-', "_");
    sanitize_name(&prepared, COLUMN_FALLBACK)
}
