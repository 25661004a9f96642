//! I/O utilities for encodings, delimited output and folder listings.
//!
//! All file I/O outside the workbook reader flows through this module:
//!
//! - **Encoding labels**: WHATWG labels via `encoding_rs`, plus the two spellings the
//!   toolkit has always accepted, `utf-8-sig` (UTF-8 with a byte order mark) and
//!   `latin-1`.
//! - **Strict decoding**: a decode either succeeds without a single replacement
//!   character or reports failure so the caller can try the next candidate.
//! - **Delimited output**: RFC 4180 quoting on demand, transcoded to the caller's
//!   encoding in one pass.
//! - **Folder listings**: delimited files in lexical file-name order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use itertools::Itertools;

use crate::{
    error::{ToolkitError, ToolkitResult},
    model::NormalizedTable,
};

pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DELIMITED_EXTENSION: &str = "csv";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEncoding {
    pub encoding: &'static Encoding,
    /// `utf-8-sig`: strip a leading BOM when reading, write one when writing.
    pub bom: bool,
}

pub fn resolve_encoding(label: &str) -> ToolkitResult<ResolvedEncoding> {
    let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
    let resolved = match normalized.as_str() {
        "utf-8-sig" | "utf8-sig" => ResolvedEncoding {
            encoding: UTF_8,
            bom: true,
        },
        "latin-1" | "latin1" | "iso-8859-1" => ResolvedEncoding {
            encoding: WINDOWS_1252,
            bom: false,
        },
        other => ResolvedEncoding {
            encoding: Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                ToolkitError::unsupported(format!("Unknown encoding '{}'", label.trim()))
            })?,
            bom: false,
        },
    };
    Ok(resolved)
}

/// Two labels name the same candidate when they match ignoring case and surrounding space.
pub fn same_label(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Decodes `bytes` under `label`, returning `Ok(None)` when the bytes are not valid in it.
pub fn decode_strict(bytes: &[u8], label: &str) -> ToolkitResult<Option<String>> {
    let resolved = resolve_encoding(label)?;
    let body = if resolved.bom {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    Ok(resolved
        .encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned()))
}

/// Encodes `text` under `label`, failing when a character has no representation in it.
pub fn encode_strict(text: &str, label: &str) -> ToolkitResult<Vec<u8>> {
    let resolved = resolve_encoding(label)?;
    let mut output = Vec::with_capacity(text.len() + UTF8_BOM.len());
    if resolved.bom {
        output.extend_from_slice(UTF8_BOM);
    }
    if resolved.encoding == UTF_8 {
        output.extend_from_slice(text.as_bytes());
        return Ok(output);
    }
    let (encoded, _, had_errors) = resolved.encoding.encode(text);
    if had_errors {
        return Err(ToolkitError::unsupported(format!(
            "Text contains characters that cannot be encoded as {}",
            label.trim()
        )));
    }
    output.extend_from_slice(&encoded);
    Ok(output)
}

pub fn csv_writer_builder(delimiter: u8) -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder
}

/// Renders `table` as delimited text: header first, absent values as empty fields.
pub fn render_delimited(table: &NormalizedTable, delimiter: u8) -> ToolkitResult<String> {
    let mut writer = csv_writer_builder(delimiter).from_writer(Vec::new());
    if table.column_count() > 0 {
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ToolkitError::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|err| {
        ToolkitError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}

/// Writes `table` to `path` with the given delimiter and output encoding.
pub fn write_normalized_table(
    table: &NormalizedTable,
    path: &Path,
    delimiter: u8,
    encoding: &str,
) -> ToolkitResult<()> {
    let text = render_delimited(table, delimiter)?;
    let bytes = encode_strict(&text, encoding)?;
    ensure_parent_dir(path)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> ToolkitResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Delimited files directly inside `folder`, sorted by file name.
pub fn list_delimited_files(folder: &Path) -> ToolkitResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_delimited = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DELIMITED_EXTENSION));
        if is_delimited && path.is_file() {
            files.push(path);
        }
    }
    Ok(files
        .into_iter()
        .sorted_by(|left, right| left.file_name().cmp(&right.file_name()))
        .collect())
}

/// A file itself, or the delimited files of a folder. Missing paths fail before any output.
pub fn resolve_sources(source: &Path) -> ToolkitResult<Vec<PathBuf>> {
    if !source.exists() {
        return Err(ToolkitError::not_found(source));
    }
    let files = if source.is_file() {
        vec![source.to_path_buf()]
    } else {
        list_delimited_files(source)?
    };
    if files.is_empty() {
        return Err(ToolkitError::unsupported(format!(
            "No CSV files found in {}",
            source.display()
        )));
    }
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
