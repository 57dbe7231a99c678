use chrono::{Duration, NaiveDate};

use super::cell::CellValue;
use super::columns::{Column, ColumnKind, FieldValue};
use crate::portfolio::{ConstructionStatus, LabeledEnum, PurchaserType, SalesStatus};

/// Largest serial Excel can represent (31/12/9999).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Reasons a single cell cannot be taken as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldIssue {
    #[error("Invalid {field} '{value}'. Valid options: {options}")]
    InvalidOption {
        field: &'static str,
        value: String,
        options: String,
    },
    #[error("Invalid {field} '{value}': expected a number")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Could not parse {field} '{value}' as a date (expected DD/MM/YYYY or YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field} cannot be blank")]
    Required { field: &'static str },
}

impl FieldIssue {
    /// Issues that downgrade to a warning on the spreadsheet path.
    pub fn is_soft(&self) -> bool {
        matches!(self, FieldIssue::InvalidDate { .. } | FieldIssue::Required { .. })
    }
}

/// Match a cell against an enum whitelist; `None` signals an invalid value.
pub fn validate_enum<E: LabeledEnum>(value: &CellValue) -> Option<E> {
    E::from_label(&value.as_trimmed_text())
}

pub fn validate_date(value: &CellValue) -> bool {
    parse_date(value).is_some()
}

/// Accepts Excel serials, `DD/MM/YYYY`, and anything starting with an ISO date.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Number(serial) => from_excel_serial(*serial),
        CellValue::Text(text) => parse_date_text(text),
        CellValue::Bool(_) | CellValue::Empty => None,
    }
}

pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Some(date);
    }

    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Validate a cell against its column and convert it into a typed value.
pub fn parse_field(column: Column, cell: &CellValue) -> Result<FieldValue, FieldIssue> {
    let field = column.label();
    let raw = || cell.as_trimmed_text();

    match column.kind() {
        ColumnKind::Identity => Ok(FieldValue::Text(raw())),
        ColumnKind::Text { required } => {
            if cell.is_empty() {
                if required {
                    Err(FieldIssue::Required { field })
                } else {
                    Ok(FieldValue::Empty)
                }
            } else {
                Ok(FieldValue::Text(raw()))
            }
        }
        ColumnKind::Count => {
            if cell.is_empty() {
                return Ok(FieldValue::Empty);
            }
            cell.as_number()
                .filter(|number| *number >= 0.0 && number.fract() == 0.0)
                .filter(|number| *number <= f64::from(u32::MAX))
                .map(|number| FieldValue::Count(number as u32))
                .ok_or_else(|| FieldIssue::InvalidNumber {
                    field,
                    value: raw(),
                })
        }
        ColumnKind::Number | ColumnKind::Price => {
            if cell.is_empty() {
                return Ok(FieldValue::Empty);
            }
            let allow_negative = column.kind() == ColumnKind::Number;
            cell.as_number()
                .filter(|number| allow_negative || *number >= 0.0)
                .map(FieldValue::Number)
                .ok_or_else(|| FieldIssue::InvalidNumber {
                    field,
                    value: raw(),
                })
        }
        ColumnKind::Flag => Ok(FieldValue::Flag(cell.as_flag())),
        ColumnKind::Date => {
            if cell.is_empty() {
                return Ok(FieldValue::Empty);
            }
            parse_date(cell)
                .map(FieldValue::Date)
                .ok_or_else(|| FieldIssue::InvalidDate {
                    field,
                    value: raw(),
                })
        }
        ColumnKind::Construction => {
            required_enum::<ConstructionStatus>(field, cell).map(FieldValue::Construction)
        }
        ColumnKind::Sales => required_enum::<SalesStatus>(field, cell).map(FieldValue::Sales),
        ColumnKind::Purchaser => {
            if cell.is_empty() {
                return Ok(FieldValue::Empty);
            }
            validate_enum::<PurchaserType>(cell)
                .map(FieldValue::Purchaser)
                .ok_or_else(|| invalid_option::<PurchaserType>(field, cell))
        }
    }
}

fn required_enum<E: LabeledEnum>(field: &'static str, cell: &CellValue) -> Result<E, FieldIssue> {
    if cell.is_empty() {
        return Err(FieldIssue::Required { field });
    }
    validate_enum::<E>(cell).ok_or_else(|| invalid_option::<E>(field, cell))
}

fn invalid_option<E: LabeledEnum>(field: &'static str, cell: &CellValue) -> FieldIssue {
    FieldIssue::InvalidOption {
        field,
        value: cell.as_trimmed_text(),
        options: E::options(),
    }
}

/// Soft guard against fat-fingered prices; never blocks the row.
pub fn price_change_warning(field: &str, old: f64, new: f64, ratio: f64) -> Option<String> {
    if old <= 0.0 {
        return None;
    }
    let change = (new - old).abs() / old;
    if change > ratio {
        Some(format!(
            "{field} changed by {:.0}% (>{:.0}%): {} -> {}",
            change * 100.0,
            ratio * 100.0,
            CellValue::Number(old),
            CellValue::Number(new),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::MilestoneKind;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn dates_parse_from_serials_and_strings() {
        assert_eq!(parse_date(&CellValue::Number(45658.0)), Some(date(2025, 1, 1)));
        assert_eq!(parse_date(&CellValue::text("03/02/2025")), Some(date(2025, 2, 3)));
        assert_eq!(parse_date(&CellValue::text("3/2/2025")), Some(date(2025, 2, 3)));
        assert_eq!(
            parse_date(&CellValue::text("2025-02-03T09:30:00Z")),
            Some(date(2025, 2, 3))
        );
        assert!(!validate_date(&CellValue::text("next Tuesday")));
        assert!(!validate_date(&CellValue::Number(-4.0)));
    }

    #[test]
    fn unknown_enum_values_list_the_valid_options() {
        let issue = parse_field(Column::ConstructionStatus, &CellValue::text("Ongoing"))
            .expect_err("invalid status");

        assert!(!issue.is_soft());
        let message = issue.to_string();
        assert!(message.contains("Ongoing"));
        assert!(message.contains("Not Started, In Progress, Complete"));
    }

    #[test]
    fn blank_required_fields_are_soft_issues() {
        let issue = parse_field(Column::SalesStatus, &CellValue::Empty).expect_err("blank");
        assert_eq!(issue, FieldIssue::Required { field: "Sales Status" });
        assert!(issue.is_soft());

        assert_eq!(
            parse_field(Column::PurchaserType, &CellValue::Empty),
            Ok(FieldValue::Empty)
        );
    }

    #[test]
    fn numeric_columns_reject_text_and_fractions_where_needed() {
        assert_eq!(
            parse_field(Column::Bedrooms, &CellValue::text("3")),
            Ok(FieldValue::Count(3))
        );
        assert!(parse_field(Column::Bedrooms, &CellValue::Number(2.5)).is_err());
        assert!(parse_field(Column::PriceExVat, &CellValue::Number(-1.0)).is_err());
        assert_eq!(
            parse_field(Column::PriceExVat, &CellValue::text("€250,000")),
            Ok(FieldValue::Number(250_000.0))
        );
    }

    #[test]
    fn flags_and_dates_parse_per_column() {
        let flag = Column::MilestoneFlag(MilestoneKind::SanApproved);
        assert_eq!(
            parse_field(flag, &CellValue::text("Yes")),
            Ok(FieldValue::Flag(true))
        );

        let issue = parse_field(Column::SnagDate, &CellValue::text("soon")).expect_err("bad date");
        assert!(issue.is_soft());
    }

    #[test]
    fn price_warning_only_beyond_tolerance() {
        let warning = price_change_warning("Price Ex VAT", 100_000.0, 130_000.0, 0.2)
            .expect("30% triggers warning");
        assert!(warning.contains(">20%"));
        assert!(warning.contains("30%"));

        assert!(price_change_warning("Price Ex VAT", 100_000.0, 110_000.0, 0.2).is_none());
        assert!(price_change_warning("Price Ex VAT", 0.0, 110_000.0, 0.2).is_none());
    }
}
