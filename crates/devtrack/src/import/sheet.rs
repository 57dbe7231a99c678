use std::collections::HashMap;
use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::cell::CellValue;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Failures decoding a spreadsheet before any row is looked at.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook contains no worksheets")]
    NoWorksheet,
    #[error("worksheet has no header row")]
    MissingHeader,
}

/// One data row, addressed by header label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: HashMap<String, CellValue>,
}

impl SheetRow {
    /// Exact header match first, then a case-insensitive scan.
    pub fn get(&self, header: &str) -> &CellValue {
        let wanted = header.trim();
        self.cells
            .get(wanted)
            .or_else(|| {
                self.cells
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                    .map(|(_, value)| value)
            })
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn set(&mut self, header: &str, value: CellValue) {
        self.cells.insert(header.trim().to_string(), value);
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_empty)
    }
}

/// The first worksheet of an upload: a header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|header| header.as_ref().trim().to_string())
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    /// Append a row positionally; fully blank rows are dropped the way
    /// spreadsheet-to-record conversion usually does.
    pub fn push_row<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = CellValue>,
    {
        let mut row = SheetRow::default();
        for (header, value) in self.headers.iter().zip(values) {
            if !header.is_empty() {
                row.set(header, value);
            }
        }
        if !row.is_blank() {
            self.rows.push(row);
        }
    }

    /// Headers from `required` that the sheet lacks, compared case-insensitively.
    pub fn missing_headers<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|wanted| {
                !self
                    .headers
                    .iter()
                    .any(|header| header.eq_ignore_ascii_case(wanted.trim()))
            })
            .collect()
    }

    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self, SheetError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SheetError::NoWorksheet)??;

        let mut rows = range.rows();
        let header_row = rows.next().ok_or(SheetError::MissingHeader)?;
        let mut sheet = Sheet::new(
            header_row
                .iter()
                .map(|cell| cell_from_data(cell).as_trimmed_text()),
        );

        for row in rows {
            sheet.push_row(row.iter().map(cell_from_data));
        }

        Ok(sheet)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SheetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.iter().all(|header| header.trim().is_empty()) {
            return Err(SheetError::MissingHeader);
        }
        let mut sheet = Sheet::new(headers.iter().map(|header| header.replace('\u{feff}', "")));

        for record in csv_reader.records() {
            let record = record?;
            sheet.push_row(
                record
                    .iter()
                    .map(|value| CellValue::from_optional_text(Some(value))),
            );
        }

        Ok(sheet)
    }
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(value) => CellValue::from_optional_text(Some(value.as_str())),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => CellValue::Number(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => {
            CellValue::from_optional_text(Some(value.as_str()))
        }
    }
}
