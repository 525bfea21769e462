use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, ToolError};

/// A spreadsheet file taking part in a consolidation batch.
///
/// Workbook names are display labels only; two workbooks in the same batch may
/// share a name and are still treated as distinct inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workbook {
    /// Display name, usually the file name.
    pub name: String,
    /// Location of the workbook on disk.
    pub path: PathBuf,
}

impl Workbook {
    /// Creates a workbook named after the final component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A single cell value carried from the source sheet to the output sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    Empty,
    String(String),
    Number(f64),
    Boolean(bool),
    /// Excel serial date-time.
    DateTime(f64),
    /// Error literal such as `#DIV/0!`, kept as text.
    Error(String),
}

impl CellValue {
    /// Renders the value as text, used for headers and previews.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(value) | CellValue::Error(value) => value.clone(),
            CellValue::Number(value) | CellValue::DateTime(value) => value.to_string(),
            CellValue::Boolean(value) => value.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

/// Tabular content of one sheet: a header row of named columns followed by
/// data rows. Rows may be shorter than the header; missing cells are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A table that will be materialised as a named sheet in the output workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetTable {
    pub sheet_name: String,
    pub table: Table,
}

/// Strategy used to match sheets across workbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationMode {
    /// Sheets sharing the same 1-based position are merged.
    ByPosition,
    /// Sheets sharing the same exact name are merged.
    ByName,
}

impl fmt::Display for ConsolidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsolidationMode::ByPosition => write!(f, "position"),
            ConsolidationMode::ByName => write!(f, "name"),
        }
    }
}

/// Identifies one consolidation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum SelectionKey {
    /// 1-based sheet position.
    Position(u32),
    /// Exact sheet name.
    Name(String),
}

impl SelectionKey {
    /// Parses user input into a key appropriate for `mode`.
    pub fn parse(mode: ConsolidationMode, text: &str) -> Result<Self> {
        match mode {
            ConsolidationMode::ByPosition => match text.trim().parse::<u32>() {
                Ok(position) if position >= 1 => Ok(SelectionKey::Position(position)),
                _ => Err(ToolError::InvalidSelection(text.to_string())),
            },
            ConsolidationMode::ByName => {
                if text.is_empty() {
                    Err(ToolError::InvalidSelection(text.to_string()))
                } else {
                    Ok(SelectionKey::Name(text.to_string()))
                }
            }
        }
    }

    pub fn mode(&self) -> ConsolidationMode {
        match self {
            SelectionKey::Position(_) => ConsolidationMode::ByPosition,
            SelectionKey::Name(_) => ConsolidationMode::ByName,
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::Position(position) => write!(f, "{position}"),
            SelectionKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A recoverable per-file or per-sheet failure recorded during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    /// Sheet that failed to read, absent when the whole workbook failed to open.
    pub sheet: Option<String>,
    pub message: String,
}

impl FileFailure {
    /// Records `error` against `file`, keeping the sheet when the error has one.
    pub fn from_error(file: &str, error: &ToolError) -> Self {
        match error {
            ToolError::Open { message, .. } => Self {
                file: file.to_string(),
                sheet: None,
                message: message.clone(),
            },
            ToolError::Read { sheet, message, .. } => Self {
                file: file.to_string(),
                sheet: Some(sheet.clone()),
                message: message.clone(),
            },
            other => Self {
                file: file.to_string(),
                sheet: None,
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{} [{}]: {}", self.file, sheet, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}
