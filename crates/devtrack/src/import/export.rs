use std::io::Write;

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::cell::CellValue;
use super::columns::{Column, COLUMNS};
use super::sheet::Sheet;
use crate::portfolio::Development;

const WORKSHEET_NAME: &str = "Units";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export: {0}")]
    Io(#[from] std::io::Error),
}

/// Every unit of every development as rows in column order.
pub fn export_rows(developments: &[Development]) -> Vec<Vec<CellValue>> {
    developments
        .iter()
        .flat_map(|development| {
            development.units.iter().map(move |unit| {
                COLUMNS
                    .iter()
                    .map(|column| column.extract(development, unit))
                    .collect()
            })
        })
        .collect()
}

/// The export as an in-memory sheet, identical to what a re-upload would decode.
pub fn export_sheet(developments: &[Development]) -> Sheet {
    let mut sheet = Sheet::new(Column::header_labels());
    for row in export_rows(developments) {
        sheet.push_row(row);
    }
    sheet
}

pub fn export_xlsx(developments: &[Development]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (index, column) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, index as u16, column.label(), &header_format)?;
    }

    for (row_index, row) in export_rows(developments).iter().enumerate() {
        let row_number = (row_index + 1) as u32;
        for (column_index, cell) in row.iter().enumerate() {
            let column_number = column_index as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Number(value) => {
                    worksheet.write_number(row_number, column_number, *value)?;
                }
                CellValue::Bool(_) | CellValue::Text(_) => {
                    worksheet.write_string(row_number, column_number, cell.to_string())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn export_csv<W: Write>(developments: &[Development], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(Column::header_labels())?;
    for row in export_rows(developments) {
        csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}
