//! Reading delimited text whose encoding and separator are not known up front.
//!
//! [`read_delimited_flexible`] sniffs the separator, then walks an ordered candidate
//! list of encodings. A candidate that cannot decode the bytes is skipped; the first one
//! that can wins, even when the decoded text turns out to hold no table at all (an empty
//! file is an answer, not a reason to keep trying).

use std::{fs, path::Path};

use log::debug;

use crate::{
    error::{ToolkitError, ToolkitResult},
    io_utils,
    model::Row,
    sniff,
};

pub const FALLBACK_ENCODINGS: [&str; 3] = ["utf-8-sig", "utf-8", "latin-1"];

/// Field values that read back as absent, matched exactly.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Header plus rows as found in the file. Header names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl DelimitedTable {
    /// No header at all: the file had no parseable content.
    pub fn is_blank(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug, Clone)]
pub struct FlexibleRead {
    pub table: DelimitedTable,
    pub encoding: String,
    pub delimiter: u8,
}

impl FlexibleRead {
    pub fn used_fallback(&self, requested: &str) -> bool {
        !io_utils::same_label(&self.encoding, requested)
    }
}

/// `preferred` followed by the fallbacks, without repeats.
pub fn encoding_candidates(preferred: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(FALLBACK_ENCODINGS.len() + 1);
    for label in std::iter::once(preferred.trim()).chain(FALLBACK_ENCODINGS) {
        if !candidates
            .iter()
            .any(|existing| io_utils::same_label(existing, label))
        {
            candidates.push(label.to_string());
        }
    }
    candidates
}

pub fn read_delimited_flexible(path: &Path, preferred: &str) -> ToolkitResult<FlexibleRead> {
    let delimiter = sniff::detect_delimiter(path);
    let bytes = fs::read(path)?;
    let (text, encoding) = decode_flexible(&bytes, &io_utils::file_name(path), preferred)?;
    let table = parse_delimited(&text, delimiter)?;
    debug!(
        "Read {:?}: {} column(s), {} row(s), encoding {}, delimiter '{}'",
        path,
        table.column_count(),
        table.row_count(),
        encoding,
        crate::printable_delimiter(delimiter)
    );
    Ok(FlexibleRead {
        table,
        encoding,
        delimiter,
    })
}

/// Decodes with the first candidate that accepts the bytes. Returns the text and the label used.
pub fn decode_flexible(
    bytes: &[u8],
    file_label: &str,
    preferred: &str,
) -> ToolkitResult<(String, String)> {
    let candidates = encoding_candidates(preferred);
    for candidate in &candidates {
        match io_utils::decode_strict(bytes, candidate)? {
            Some(text) => return Ok((text, candidate.clone())),
            None => debug!("{file_label}: not valid {candidate}, trying next encoding"),
        }
    }
    Err(ToolkitError::Decode {
        file: file_label.to_string(),
        attempted: candidates,
    })
}

/// Parses decoded text: blank lines skipped, first record is the header.
pub fn parse_delimited(text: &str, delimiter: u8) -> ToolkitResult<DelimitedTable> {
    if text.trim().is_empty() {
        return Ok(DelimitedTable::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .double_quote(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut truncated = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1 {
            continue;
        }
        if headers.is_none() {
            headers = Some(header_names(&record));
            continue;
        }
        let width = headers.as_ref().map_or(0, Vec::len);
        if record.len() > width {
            truncated += 1;
        }
        rows.push(
            (0..width)
                .map(|idx| record.get(idx).and_then(field_value))
                .collect(),
        );
    }
    if truncated > 0 {
        debug!("Dropped trailing extra fields from {truncated} row(s)");
    }

    Ok(DelimitedTable {
        headers: headers.unwrap_or_default(),
        rows,
    })
}

fn header_names(record: &csv::StringRecord) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn field_value(raw: &str) -> Option<String> {
    if NA_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}
