#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use devtrack::apply::ChangeApplier;
use devtrack::audit::{AuditLog, MemoryAuditStore};
use devtrack::import::{export_rows, CellValue, Column, Sheet, COLUMNS};
use devtrack::portfolio::{
    Actor, ConstructionStatus, Development, DevelopmentId, DevelopmentStatus, MemoryOverrideStore,
    Milestone, OverlayPortfolio, PurchaserType, SalesStatus, Unit,
};

pub type Portfolio = OverlayPortfolio<MemoryOverrideStore>;

pub fn harbour_view() -> Development {
    let units = (1..=5)
        .map(|number| {
            let mut unit = Unit::new(number.to_string(), "Semi-Detached");
            unit.address = format!("{number} Quay Road");
            unit.bedrooms = Some(3);
            unit.size_sq_m = Some(112.5);
            unit.construction_status = ConstructionStatus::InProgress;
            unit.sales_status = SalesStatus::ForSale;
            unit.pricing.list_price = Some(395_000.0);
            unit.pricing.price_ex_vat = Some(100_000.0 * f64::from(number));
            unit
        })
        .collect::<Vec<_>>();

    let mut development = Development {
        id: DevelopmentId::new("dev-harbour"),
        name: "Harbour View".to_string(),
        project_number: "HV-01".to_string(),
        status: DevelopmentStatus::Active,
        units,
    };

    let sold = &mut development.units[0];
    sold.sales_status = SalesStatus::Contracted;
    sold.purchaser.purchaser_type = Some(PurchaserType::Private);
    sold.purchaser.name = Some("A. Byrne".to_string());
    sold.part_v = true;
    sold.key_dates.sale_agreed = NaiveDate::from_ymd_opt(2025, 1, 15);
    sold.documentation.contract_signed = Milestone {
        complete: true,
        date: NaiveDate::from_ymd_opt(2025, 2, 14),
    };

    development
}

pub fn portfolio() -> Portfolio {
    OverlayPortfolio::load(vec![harbour_view()], Arc::new(MemoryOverrideStore::default()))
        .expect("portfolio loads")
}

pub fn applier() -> ChangeApplier<Portfolio, MemoryAuditStore> {
    ChangeApplier::new(
        Arc::new(portfolio()),
        AuditLog::new(Arc::new(MemoryAuditStore::default())),
    )
}

pub fn actor() -> Actor {
    Actor::new("u-1", "sam@example.com", "Sam Walsh")
}

/// The export of `developments` with the given cells overwritten.
/// Rows are zero-based over the exported units.
pub fn edited_sheet(developments: &[Development], edits: &[(usize, Column, CellValue)]) -> Sheet {
    let mut rows = export_rows(developments);
    for (row, column, value) in edits {
        let index = COLUMNS
            .iter()
            .position(|candidate| candidate == column)
            .expect("column exported");
        rows[*row][index] = value.clone();
    }

    let mut sheet = Sheet::new(Column::header_labels());
    for row in rows {
        sheet.push_row(row);
    }
    sheet
}
