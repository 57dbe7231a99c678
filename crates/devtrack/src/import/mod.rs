//! Spreadsheet import: decoding, field comparison, validation, reconciliation.
//!
//! The entry points never fail outright. A file that cannot be read or lacks
//! required columns comes back as an [`ImportResult`] with a single row-0 error,
//! so callers can render every problem the same way.

pub mod cell;
pub mod columns;
pub mod compare;
pub mod export;
pub mod reconcile;
pub mod session;
pub mod sheet;
pub mod validate;

use std::io::Read;

use tracing::warn;

use crate::portfolio::Development;

pub use cell::CellValue;
pub use columns::{Column, ColumnKind, FieldValue, COLUMNS};
pub use compare::values_differ;
pub use export::{export_csv, export_rows, export_sheet, export_xlsx, ExportError};
pub use reconcile::{
    ImportChange, ImportError, ImportOptions, ImportResult, ImportRow, ImportSummary, Reconciler,
};
pub use session::{ImportSession, ImportStage, SessionError};
pub use sheet::{Sheet, SheetError, SheetRow};
pub use validate::{parse_date, parse_field, validate_date, validate_enum, FieldIssue};

pub fn import_units_from_excel(
    bytes: &[u8],
    developments: &[Development],
    options: &ImportOptions,
) -> ImportResult {
    reconcile_decoded(Sheet::from_xlsx_bytes(bytes), developments, options)
}

pub fn import_units_from_csv<R: Read>(
    reader: R,
    developments: &[Development],
    options: &ImportOptions,
) -> ImportResult {
    reconcile_decoded(Sheet::from_csv_reader(reader), developments, options)
}

fn reconcile_decoded(
    decoded: Result<Sheet, SheetError>,
    developments: &[Development],
    options: &ImportOptions,
) -> ImportResult {
    match decoded {
        Ok(sheet) => Reconciler::new(options.clone()).reconcile(&sheet, developments),
        Err(err) => {
            warn!(error = %err, "spreadsheet could not be decoded");
            ImportResult::rejected(0, format!("Unable to read spreadsheet: {err}"))
        }
    }
}
