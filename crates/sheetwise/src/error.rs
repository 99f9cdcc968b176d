//! Error types for the mapping engine

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole import or export run.
///
/// Per-row problems never show up here: they are collected as
/// [`ValidationFailure`](crate::ValidationFailure)s and move the row to the
/// invalid partition instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A record layout is malformed (blank header, negative or duplicate
    /// index, clashing sheets within one run, ...)
    #[error("Invalid layout for {record}: {message}")]
    Configuration { record: String, message: String },

    /// The header row of an imported sheet differs from the layout
    #[error("Header mismatch in sheet '{sheet}' at column {column}: found '{actual}', expected '{expected}'")]
    HeaderMismatch {
        sheet: String,
        column: String,
        expected: String,
        actual: String,
    },

    /// No row handler is registered for a record key, or it was registered
    /// for a different record type
    #[error("No row handler registered for {0}")]
    MissingHandler(String),

    /// The source workbook has no sheet at the configured position
    #[error("Workbook has no sheet at index {index} (expected '{name}')")]
    MissingSheet { name: String, index: usize },

    /// Input rows supplied as data (rather than cells) could not be converted
    #[error("Invalid data for sheet '{sheet}', row {row}, field '{field}': {message}")]
    Data {
        sheet: String,
        row: usize,
        field: String,
        message: String,
    },

    /// A JSON schema definition or data file could not be parsed
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the workbook model
    #[error(transparent)]
    Document(#[from] sheetwise_core::Error),

    /// Error reading or writing XLSX
    #[error(transparent)]
    Xlsx(#[from] sheetwise_xlsx::XlsxError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration(record: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            record: record.into(),
            message: message.into(),
        }
    }
}
