//! The fixed column layout shared by the exporter and the importer.

use chrono::NaiveDate;

use super::cell::CellValue;
use crate::portfolio::{
    ConstructionStatus, Development, LabeledEnum, MilestoneKind, PurchaserType, SalesStatus, Unit,
};

/// How a column's cells are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identity,
    Text { required: bool },
    Count,
    Number,
    Price,
    Flag,
    Date,
    Construction,
    Sales,
    Purchaser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Development,
    ProjectNumber,
    UnitNumber,
    UnitType,
    Address,
    Bedrooms,
    Size,
    ConstructionStatus,
    SalesStatus,
    ListPrice,
    SoldPrice,
    PriceExVat,
    PriceIncVat,
    PurchaserType,
    PurchaserName,
    PurchaserPhone,
    PurchaserEmail,
    PartV,
    SaleAgreedDate,
    DepositDate,
    PlannedCloseDate,
    SnagDate,
    MilestoneFlag(MilestoneKind),
    MilestoneDate(MilestoneKind),
    IncentiveScheme,
    IncentiveAmount,
}

/// Export order. The importer requires every one of these headers.
pub const COLUMNS: [Column; 38] = [
    Column::Development,
    Column::ProjectNumber,
    Column::UnitNumber,
    Column::UnitType,
    Column::Address,
    Column::Bedrooms,
    Column::Size,
    Column::ConstructionStatus,
    Column::SalesStatus,
    Column::ListPrice,
    Column::SoldPrice,
    Column::PriceExVat,
    Column::PriceIncVat,
    Column::PurchaserType,
    Column::PurchaserName,
    Column::PurchaserPhone,
    Column::PurchaserEmail,
    Column::PartV,
    Column::SaleAgreedDate,
    Column::DepositDate,
    Column::PlannedCloseDate,
    Column::SnagDate,
    Column::MilestoneFlag(MilestoneKind::BcmsSubmitted),
    Column::MilestoneDate(MilestoneKind::BcmsSubmitted),
    Column::MilestoneFlag(MilestoneKind::LandRegistryApproved),
    Column::MilestoneDate(MilestoneKind::LandRegistryApproved),
    Column::MilestoneFlag(MilestoneKind::HomebondReceived),
    Column::MilestoneDate(MilestoneKind::HomebondReceived),
    Column::MilestoneFlag(MilestoneKind::SanApproved),
    Column::MilestoneDate(MilestoneKind::SanApproved),
    Column::MilestoneFlag(MilestoneKind::ContractIssued),
    Column::MilestoneDate(MilestoneKind::ContractIssued),
    Column::MilestoneFlag(MilestoneKind::ContractSigned),
    Column::MilestoneDate(MilestoneKind::ContractSigned),
    Column::MilestoneFlag(MilestoneKind::SaleClosed),
    Column::MilestoneDate(MilestoneKind::SaleClosed),
    Column::IncentiveScheme,
    Column::IncentiveAmount,
];

impl Column {
    pub fn header_labels() -> Vec<&'static str> {
        COLUMNS.iter().map(|column| column.label()).collect()
    }

    /// Columns an operator may change through import or bulk update.
    pub fn tracked() -> impl Iterator<Item = Column> {
        COLUMNS
            .into_iter()
            .filter(|column| column.kind() != ColumnKind::Identity)
    }

    pub fn from_label(label: &str) -> Option<Column> {
        let wanted = label.trim();
        COLUMNS
            .into_iter()
            .find(|column| column.label().eq_ignore_ascii_case(wanted))
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Development => "Development",
            Column::ProjectNumber => "Project Number",
            Column::UnitNumber => "Unit Number",
            Column::UnitType => "Unit Type",
            Column::Address => "Address",
            Column::Bedrooms => "Bedrooms",
            Column::Size => "Size (sq m)",
            Column::ConstructionStatus => "Construction Status",
            Column::SalesStatus => "Sales Status",
            Column::ListPrice => "List Price",
            Column::SoldPrice => "Sold Price",
            Column::PriceExVat => "Price Ex VAT",
            Column::PriceIncVat => "Price Inc VAT",
            Column::PurchaserType => "Purchaser Type",
            Column::PurchaserName => "Purchaser Name",
            Column::PurchaserPhone => "Purchaser Phone",
            Column::PurchaserEmail => "Purchaser Email",
            Column::PartV => "Part V",
            Column::SaleAgreedDate => "Sale Agreed Date",
            Column::DepositDate => "Deposit Date",
            Column::PlannedCloseDate => "Planned Close Date",
            Column::SnagDate => "Snag Date",
            Column::MilestoneFlag(kind) => kind.label(),
            Column::MilestoneDate(kind) => match kind {
                MilestoneKind::BcmsSubmitted => "BCMS Submitted Date",
                MilestoneKind::LandRegistryApproved => "Land Registry Approved Date",
                MilestoneKind::HomebondReceived => "Homebond Received Date",
                MilestoneKind::SanApproved => "SAN Approved Date",
                MilestoneKind::ContractIssued => "Contract Issued Date",
                MilestoneKind::ContractSigned => "Contract Signed Date",
                MilestoneKind::SaleClosed => "Sale Closed Date",
            },
            Column::IncentiveScheme => "Incentive Scheme",
            Column::IncentiveAmount => "Incentive Amount",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Development | Column::ProjectNumber | Column::UnitNumber => {
                ColumnKind::Identity
            }
            Column::UnitType | Column::Address => ColumnKind::Text { required: true },
            Column::PurchaserName
            | Column::PurchaserPhone
            | Column::PurchaserEmail
            | Column::IncentiveScheme => ColumnKind::Text { required: false },
            Column::Bedrooms => ColumnKind::Count,
            Column::Size | Column::IncentiveAmount => ColumnKind::Number,
            Column::ListPrice | Column::SoldPrice | Column::PriceExVat | Column::PriceIncVat => {
                ColumnKind::Price
            }
            Column::PartV | Column::MilestoneFlag(_) => ColumnKind::Flag,
            Column::SaleAgreedDate
            | Column::DepositDate
            | Column::PlannedCloseDate
            | Column::SnagDate
            | Column::MilestoneDate(_) => ColumnKind::Date,
            Column::ConstructionStatus => ColumnKind::Construction,
            Column::SalesStatus => ColumnKind::Sales,
            Column::PurchaserType => ColumnKind::Purchaser,
        }
    }

    /// Read the column's value from a unit, in the shape the exporter writes.
    pub fn extract(self, development: &Development, unit: &Unit) -> CellValue {
        match self {
            Column::Development => CellValue::text(development.name.clone()),
            Column::ProjectNumber => {
                CellValue::from_optional_text(Some(development.project_number.as_str()))
            }
            Column::UnitNumber => CellValue::text(unit.unit_number.clone()),
            Column::UnitType => CellValue::from_optional_text(Some(unit.unit_type.as_str())),
            Column::Address => CellValue::from_optional_text(Some(unit.address.as_str())),
            Column::Bedrooms => CellValue::from_optional_number(unit.bedrooms.map(f64::from)),
            Column::Size => CellValue::from_optional_number(unit.size_sq_m),
            Column::ConstructionStatus => CellValue::text(unit.construction_status.label()),
            Column::SalesStatus => CellValue::text(unit.sales_status.label()),
            Column::ListPrice => CellValue::from_optional_number(unit.pricing.list_price),
            Column::SoldPrice => CellValue::from_optional_number(unit.pricing.sold_price),
            Column::PriceExVat => CellValue::from_optional_number(unit.pricing.price_ex_vat),
            Column::PriceIncVat => CellValue::from_optional_number(unit.pricing.price_inc_vat),
            Column::PurchaserType => unit
                .purchaser
                .purchaser_type
                .map(|value| CellValue::text(value.label()))
                .unwrap_or_default(),
            Column::PurchaserName => CellValue::from_optional_text(unit.purchaser.name.as_deref()),
            Column::PurchaserPhone => {
                CellValue::from_optional_text(unit.purchaser.phone.as_deref())
            }
            Column::PurchaserEmail => {
                CellValue::from_optional_text(unit.purchaser.email.as_deref())
            }
            Column::PartV => CellValue::Bool(unit.part_v),
            Column::SaleAgreedDate => date_cell(unit.key_dates.sale_agreed),
            Column::DepositDate => date_cell(unit.key_dates.deposit_paid),
            Column::PlannedCloseDate => date_cell(unit.key_dates.planned_close),
            Column::SnagDate => date_cell(unit.key_dates.snag),
            Column::MilestoneFlag(kind) => {
                CellValue::Bool(unit.documentation.milestone(kind).is_complete())
            }
            Column::MilestoneDate(kind) => date_cell(unit.documentation.milestone(kind).date),
            Column::IncentiveScheme => {
                CellValue::from_optional_text(unit.incentive.scheme.as_deref())
            }
            Column::IncentiveAmount => CellValue::from_optional_number(unit.incentive.amount),
        }
    }

    /// Write a validated value onto the unit. Identity columns are never assigned.
    pub fn assign(self, unit: &mut Unit, value: FieldValue) {
        match self {
            Column::Development | Column::ProjectNumber | Column::UnitNumber => {}
            Column::UnitType => {
                if let Some(text) = value.into_text() {
                    unit.unit_type = text;
                }
            }
            Column::Address => {
                if let Some(text) = value.into_text() {
                    unit.address = text;
                }
            }
            Column::Bedrooms => unit.bedrooms = value.as_count(),
            Column::Size => unit.size_sq_m = value.as_number(),
            Column::ConstructionStatus => {
                if let FieldValue::Construction(status) = value {
                    unit.construction_status = status;
                }
            }
            Column::SalesStatus => {
                if let FieldValue::Sales(status) = value {
                    unit.sales_status = status;
                }
            }
            Column::ListPrice => unit.pricing.list_price = value.as_number(),
            Column::SoldPrice => unit.pricing.sold_price = value.as_number(),
            Column::PriceExVat => unit.pricing.price_ex_vat = value.as_number(),
            Column::PriceIncVat => unit.pricing.price_inc_vat = value.as_number(),
            Column::PurchaserType => {
                unit.purchaser.purchaser_type = match value {
                    FieldValue::Purchaser(kind) => Some(kind),
                    _ => None,
                }
            }
            Column::PurchaserName => unit.purchaser.name = value.into_text(),
            Column::PurchaserPhone => unit.purchaser.phone = value.into_text(),
            Column::PurchaserEmail => unit.purchaser.email = value.into_text(),
            Column::PartV => unit.part_v = value.as_flag(),
            Column::SaleAgreedDate => unit.key_dates.sale_agreed = value.as_date(),
            Column::DepositDate => unit.key_dates.deposit_paid = value.as_date(),
            Column::PlannedCloseDate => unit.key_dates.planned_close = value.as_date(),
            Column::SnagDate => unit.key_dates.snag = value.as_date(),
            Column::MilestoneFlag(kind) => {
                unit.documentation.milestone_mut(kind).complete = value.as_flag()
            }
            Column::MilestoneDate(kind) => {
                unit.documentation.milestone_mut(kind).date = value.as_date()
            }
            Column::IncentiveScheme => unit.incentive.scheme = value.into_text(),
            Column::IncentiveAmount => unit.incentive.amount = value.as_number(),
        }
    }
}

/// A cell after validation against its column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Count(u32),
    Number(f64),
    Flag(bool),
    Date(NaiveDate),
    Construction(ConstructionStatus),
    Sales(SalesStatus),
    Purchaser(PurchaserType),
}

impl FieldValue {
    /// The value as the exporter would have written it.
    pub fn to_cell(&self) -> CellValue {
        match self {
            FieldValue::Empty => CellValue::Empty,
            FieldValue::Text(text) => CellValue::Text(text.clone()),
            FieldValue::Count(count) => CellValue::Number(f64::from(*count)),
            FieldValue::Number(number) => CellValue::Number(*number),
            FieldValue::Flag(flag) => CellValue::Bool(*flag),
            FieldValue::Date(date) => date_cell(Some(*date)),
            FieldValue::Construction(status) => CellValue::text(status.label()),
            FieldValue::Sales(status) => CellValue::text(status.label()),
            FieldValue::Purchaser(kind) => CellValue::text(kind.label()),
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    fn as_count(&self) -> Option<u32> {
        match self {
            FieldValue::Count(count) => Some(*count),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            FieldValue::Count(count) => Some(f64::from(*count)),
            _ => None,
        }
    }

    fn as_flag(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            _ => None,
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn date_cell(date: Option<NaiveDate>) -> CellValue {
    date.map(|value| CellValue::Text(format_date(value)))
        .unwrap_or_default()
}
