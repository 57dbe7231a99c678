mod common;

use common::{edited_sheet, harbour_view};
use devtrack::import::{
    export_csv, export_xlsx, import_units_from_csv, import_units_from_excel, CellValue, Column,
    ImportOptions, Reconciler,
};

#[test]
fn xlsx_round_trip_without_edits_reports_nothing() {
    let developments = vec![harbour_view()];
    let workbook = export_xlsx(&developments).expect("workbook exports");

    let result = import_units_from_excel(&workbook, &developments, &ImportOptions::default());

    assert_eq!(result.summary.total, 5);
    assert_eq!(result.summary.changed, 0);
    assert_eq!(result.summary.errors, 0);
    assert_eq!(result.summary.unchanged, 5);
    assert!(result.valid.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn csv_round_trip_without_edits_reports_nothing() {
    let developments = vec![harbour_view()];
    let mut buffer = Vec::new();
    export_csv(&developments, &mut buffer).expect("csv exports");

    let result = import_units_from_csv(&buffer[..], &developments, &ImportOptions::default());

    assert_eq!(result.summary.changed, 0);
    assert_eq!(result.summary.errors, 0);
    assert_eq!(result.summary.unchanged, 5);
}

#[test]
fn loosely_typed_cells_matching_stored_values_are_unchanged() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[
            (0, Column::PartV, CellValue::text("yes")),
            (0, Column::ListPrice, CellValue::text("€395,000")),
            (0, Column::Bedrooms, CellValue::text("3")),
            (0, Column::SalesStatus, CellValue::text("contracted")),
            (0, Column::SaleAgreedDate, CellValue::text("2025-01-15")),
            (1, Column::PurchaserName, CellValue::text("   ")),
        ],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert_eq!(result.summary.changed, 0, "{:?}", result.valid);
    assert_eq!(result.summary.unchanged, 5);
}

#[test]
fn edited_rows_carry_only_their_changes_and_merged_unit() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[
            (2, Column::SalesStatus, CellValue::text("Under Offer")),
            (2, Column::PurchaserName, CellValue::text("J. Walsh")),
            (4, Column::ConstructionStatus, CellValue::text("Complete")),
        ],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert_eq!(result.summary.changed, 2);
    assert_eq!(result.summary.unchanged, 3);
    let third = &result.valid[0];
    assert_eq!(third.row, 4);
    assert_eq!(third.unit_number, "3");
    let fields: Vec<_> = third.changes.iter().map(|change| change.field.as_str()).collect();
    assert_eq!(fields, vec!["Sales Status", "Purchaser Name"]);
    assert_eq!(third.unit.purchaser.name.as_deref(), Some("J. Walsh"));
    assert_eq!(third.unit.address, "3 Quay Road");
}

#[test]
fn construction_status_outside_whitelist_rejects_row() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[(1, Column::ConstructionStatus, CellValue::text("Ongoing"))],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert!(result.valid.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 3);
    assert!(result.errors[0].message.contains("'Ongoing'"));
    assert!(result.errors[0]
        .message
        .contains("Not Started, In Progress, Complete"));
    assert_eq!(result.summary.errors, result.errors.len());
}

#[test]
fn thirty_percent_price_rise_warns_but_stays_valid() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[(0, Column::PriceExVat, CellValue::Number(130_000.0))],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert_eq!(result.valid.len(), 1);
    let row = &result.valid[0];
    assert!(row
        .changes
        .iter()
        .any(|change| change.field == "Price Ex VAT"
            && change.new_value == CellValue::Number(130_000.0)));
    assert!(row.warnings.iter().any(|warning| warning.contains(">20%")));
    assert_eq!(row.unit.pricing.price_ex_vat, Some(130_000.0));
}

#[test]
fn a_stricter_ratio_is_honoured() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[(0, Column::PriceExVat, CellValue::Number(110_000.0))],
    );

    let lenient = Reconciler::default().reconcile(&sheet, &developments);
    assert!(lenient.valid[0].warnings.is_empty());

    let strict = Reconciler::new(ImportOptions {
        price_warning_ratio: 0.05,
    })
    .reconcile(&sheet, &developments);
    assert!(strict.valid[0].warnings[0].contains("(>5%)"));
}

#[test]
fn unparseable_dates_are_warnings_not_silent_drops() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[
            (0, Column::SaleAgreedDate, CellValue::text("mid January")),
            (0, Column::PurchaserPhone, CellValue::text("087 123 4567")),
        ],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    let row = &result.valid[0];
    assert_eq!(row.changes.len(), 1, "only the phone number changes");
    assert!(row
        .warnings
        .iter()
        .any(|warning| warning.contains("Sale Agreed Date") && warning.contains("mid January")));
    assert_eq!(
        row.unit.key_dates.sale_agreed,
        chrono::NaiveDate::from_ymd_opt(2025, 1, 15)
    );
}

#[test]
fn a_lone_unparseable_date_still_reaches_the_caller() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(
        &developments,
        &[(0, Column::SaleAgreedDate, CellValue::text("mid January"))],
    );

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert!(result.valid.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.summary.unchanged, 5);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].row, 2);
    assert!(result.warnings[0].message.contains("Sale Agreed Date"));
    assert!(result.warnings[0].message.contains("mid January"));
    assert_eq!(result.warning_count(), 1);
}

#[test]
fn blanking_a_required_field_alone_is_reported() {
    let developments = vec![harbour_view()];
    let sheet = edited_sheet(&developments, &[(3, Column::SalesStatus, CellValue::Empty)]);

    let result = Reconciler::default().reconcile(&sheet, &developments);

    assert!(result.valid.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].row, 5);
    assert!(result.warnings[0]
        .message
        .starts_with("Sales Status cannot be blank"));
}

#[test]
fn missing_required_columns_abort_the_import() {
    let developments = vec![harbour_view()];
    let csv = "Development,Unit Number,Construction Status\nHarbour View,1,Complete\n";

    let result = import_units_from_csv(csv.as_bytes(), &developments, &ImportOptions::default());

    assert!(result.valid.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 0);
    assert!(result.errors[0]
        .message
        .starts_with("Missing required columns: "));
    assert!(result.errors[0].message.contains("Sales Status"));
    assert!(!result.errors[0].message.contains("Construction Status"));
    assert_eq!(result.summary.errors, 1);
}

#[test]
fn unreadable_files_are_a_single_top_level_error() {
    let developments = vec![harbour_view()];
    let result =
        import_units_from_excel(b"not a workbook", &developments, &ImportOptions::default());

    assert!(result.is_rejected());
    assert!(result.errors[0].message.starts_with("Unable to read spreadsheet"));
}
