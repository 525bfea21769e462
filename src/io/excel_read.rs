use std::fs::File;
use std::io::BufReader;

use calamine::{DataType, Range, Reader, Sheets, open_workbook_auto};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::{SheetSource, WorkbookHandle};
use crate::model::{CellValue, Table, Workbook};

/// Reads workbooks from disk with `calamine`, detecting the format from the
/// file extension (`xlsx`, `xlsm`, `xlsb`, `xls`, `ods`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineSource;

impl CalamineSource {
    pub fn new() -> Self {
        Self
    }
}

/// An open workbook backed by a buffered file handle.
pub struct CalamineWorkbook {
    file: String,
    sheets: Sheets<BufReader<File>>,
}

impl SheetSource for CalamineSource {
    type Handle = CalamineWorkbook;

    fn open(&self, workbook: &Workbook) -> Result<CalamineWorkbook> {
        let sheets = open_workbook_auto(workbook.path()).map_err(|err| ToolError::Open {
            file: workbook.name.clone(),
            message: err.to_string(),
        })?;
        debug!(file = %workbook.name, "opened workbook");
        Ok(CalamineWorkbook {
            file: workbook.name.clone(),
            sheets,
        })
    }
}

impl WorkbookHandle for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<Table> {
        let range = self
            .sheets
            .worksheet_range(sheet)
            .ok_or_else(|| ToolError::Read {
                file: self.file.clone(),
                sheet: sheet.to_string(),
                message: "sheet not found".to_string(),
            })?
            .map_err(|err| ToolError::Read {
                file: self.file.clone(),
                sheet: sheet.to_string(),
                message: err.to_string(),
            })?;
        Ok(range_to_table(&range))
    }
}

/// Converts a worksheet range into a table, treating the first row as the
/// header row. Blank headers are named `Unnamed: <index>`.
pub fn range_to_table(range: &Range<DataType>) -> Table {
    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let name = cell_to_value(cell).as_text();
                if name.trim().is_empty() {
                    format!("Unnamed: {idx}")
                } else {
                    name
                }
            })
            .collect(),
        None => return Table::default(),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Table::new(columns, rows)
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::String(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Boolean(*value),
        DataType::DateTime(value) => CellValue::DateTime(*value),
        DataType::Error(error) => CellValue::Error(error.to_string()),
        DataType::Empty => CellValue::Empty,
        other => CellValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_becomes_header() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), DataType::String("Produto".into()));
        range.set_value((0, 1), DataType::String("Qtd".into()));
        range.set_value((1, 0), DataType::String("Caneta".into()));
        range.set_value((1, 1), DataType::Int(3));
        range.set_value((2, 0), DataType::String("Lápis".into()));
        range.set_value((2, 1), DataType::Float(1.5));

        let table = range_to_table(&range);

        assert_eq!(table.columns, vec!["Produto", "Qtd"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][1], CellValue::Number(3.0));
        assert_eq!(table.rows[1][1], CellValue::Number(1.5));
    }

    #[test]
    fn blank_headers_are_named_by_index() {
        let mut range = Range::new((0, 0), (0, 1));
        range.set_value((0, 0), DataType::String("a".into()));

        let table = range_to_table(&range);

        assert_eq!(table.columns, vec!["a", "Unnamed: 1"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn empty_range_yields_empty_table() {
        let range: Range<DataType> = Range::empty();
        assert_eq!(range_to_table(&range), Table::default());
    }
}
