use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for toolkit operations.
pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Fatal errors raised by the conversion operations.
///
/// Conditions that only affect a single file inside a batch (empty input, unmapped
/// file, no surviving columns) are not errors: they are recorded as report notes.
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// The input path handed to an operation does not exist.
    #[error("path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    /// Wrong file extension, unknown profile or encoding, missing sheets, no matching files.
    #[error("{0}")]
    Unsupported(String),

    /// None of the candidate encodings could decode the file.
    #[error("could not decode {file} with encodings: {}", attempted.join(", "))]
    Decode { file: String, attempted: Vec<String> },

    /// A table was assembled with duplicate or blank column names, or ragged rows.
    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),
}

impl ToolkitError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ToolkitError::NotFound { path: path.into() }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ToolkitError::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_file_and_attempts() {
        let err = ToolkitError::Decode {
            file: "users.csv".to_string(),
            attempted: vec!["shift_jis".to_string(), "utf-8".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "could not decode users.csv with encodings: shift_jis, utf-8"
        );
    }

    #[test]
    fn not_found_displays_path() {
        let err = ToolkitError::not_found("/tmp/missing.csv");
        assert_eq!(err.to_string(), "path does not exist: /tmp/missing.csv");
    }
}
