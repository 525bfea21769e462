use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::Result;
use crate::model::{CellValue, SheetTable};

const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Serialises the tables into an in-memory xlsx workbook, one sheet per table
/// in the given order.
pub fn write_workbook_to_buffer(tables: &[SheetTable]) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(tables)?;
    Ok(workbook.save_to_buffer()?)
}

/// Writes the tables to the given path.
pub fn write_workbook(path: &Path, tables: &[SheetTable]) -> Result<()> {
    let mut workbook = build_workbook(tables)?;
    workbook.save(path)?;
    Ok(())
}

fn build_workbook(tables: &[SheetTable]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_TIME_FORMAT);

    for sheet in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.sheet_name)?;

        for (col_idx, header) in sheet.table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in sheet.table.rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate().take(sheet.table.columns.len()) {
                write_cell(worksheet, row_num, col_idx as u16, cell, &date_format)?;
            }
        }

        if !sheet.table.columns.is_empty() {
            let col_end = (sheet.table.columns.len() as u16).saturating_sub(1);
            worksheet.autofilter(0, 0, sheet.table.rows.len() as u32, col_end)?;
        }
    }

    Ok(workbook)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    date_format: &Format,
) -> Result<()> {
    match cell {
        CellValue::Empty => {}
        CellValue::String(value) | CellValue::Error(value) => {
            worksheet.write_string(row, col, value)?;
        }
        CellValue::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        CellValue::Boolean(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        CellValue::DateTime(value) => {
            worksheet.write_number_with_format(row, col, *value, date_format)?;
        }
    }
    Ok(())
}
