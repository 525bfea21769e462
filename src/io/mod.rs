//! Spreadsheet IO adapters.
//!
//! Reading goes through the [`SheetSource`] seam so the analysis and
//! consolidation stages never touch `calamine` directly. Each call to
//! [`SheetSource::open`] acquires a fresh handle which is released when the
//! caller drops it, so a workbook can be re-opened safely between stages.

pub mod excel_read;
pub mod excel_write;

use crate::error::Result;
use crate::model::{Table, Workbook};

pub use excel_read::CalamineSource;

/// Source of workbook contents.
pub trait SheetSource {
    type Handle: WorkbookHandle;

    /// Opens `workbook`, failing with [`ToolError::Open`](crate::ToolError::Open)
    /// when the file cannot be parsed.
    fn open(&self, workbook: &Workbook) -> Result<Self::Handle>;
}

/// An open workbook. Dropping the handle releases the underlying file.
pub trait WorkbookHandle {
    /// Sheet names in on-disk order.
    fn sheet_names(&self) -> Vec<String>;

    /// Reads a sheet into a table, failing with
    /// [`ToolError::Read`](crate::ToolError::Read) when it is missing or unreadable.
    fn read_sheet(&mut self, sheet: &str) -> Result<Table>;
}
