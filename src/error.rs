use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while
/// workbooks are analysed, consolidated, or written.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a report fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A workbook could not be opened or its sheets could not be listed.
    #[error("failed to open workbook '{file}': {message}")]
    Open { file: String, message: String },

    /// A specific sheet could not be read from an otherwise readable workbook.
    #[error("failed to read sheet '{sheet}' from '{file}': {message}")]
    Read {
        file: String,
        sheet: String,
        message: String,
    },

    /// Consolidation was requested without any selected sheet.
    #[error("no sheets selected for consolidation")]
    EmptySelection,

    /// None of the selected keys matched a sheet, leaving nothing to write.
    #[error("no consolidated sheets to write: no workbook contains the selected sheets")]
    NothingToWrite,

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a selection key supplied on the command line cannot be parsed.
    #[error("invalid selection key '{0}'")]
    InvalidSelection(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
