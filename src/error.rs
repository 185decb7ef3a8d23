//! Error types for the cleaning step

use std::path::PathBuf;

use thiserror::Error;

/// Every failure is fatal to the run; there is no partial-success path.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("cannot parse {path} as tabular data: {message}")]
    DataFormat { path: PathBuf, message: String },

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("data row {row}, column '{column}': cannot interpret '{value}' as {target}")]
    TypeConversion {
        row: usize,
        column: String,
        value: String,
        target: &'static str,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CleanError {
    pub(crate) fn data_format(path: &std::path::Path, message: impl ToString) -> Self {
        CleanError::DataFormat {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for cleaning operations
pub type Result<T> = std::result::Result<T, CleanError>;
