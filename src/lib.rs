//! Core library for the sheet-consolidator command line application.
//!
//! A batch of workbooks flows through three stages: [`analyze`] builds a
//! structural report of the sheets each workbook holds, [`select`] turns that
//! report into selectable targets for a [`ConsolidationMode`], and
//! [`consolidate`] stacks the selected sheets across workbooks into a single
//! output workbook. [`session::SessionContext`] threads the state between the
//! stages. Spreadsheet IO lives under [`io`].

pub mod analyze;
pub mod consolidate;
pub mod error;
pub mod io;
pub mod model;
pub mod select;
pub mod session;

pub use error::{Result, ToolError};
pub use model::{ConsolidationMode, SelectionKey, Workbook};
