use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cell::CellValue;
use super::columns::{Column, ColumnKind};
use super::compare::values_differ;
use super::sheet::{Sheet, SheetRow};
use super::validate::{parse_field, price_change_warning};
use crate::portfolio::{Development, DevelopmentId, MilestoneKind, Unit};

/// Spreadsheet header rows take one line, and rows are 1-indexed.
const HEADER_OFFSET: usize = 2;

/// Tunables for a reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Relative price change above which a row carries a warning.
    pub price_warning_ratio: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            price_warning_ratio: 0.20,
        }
    }
}

/// One field delta between the stored unit and the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportChange {
    pub field: String,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

/// A spreadsheet row with at least one change, ready for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub row: usize,
    pub development_id: DevelopmentId,
    pub development_name: String,
    pub unit_number: String,
    pub changes: Vec<ImportChange>,
    /// The stored unit with every change merged in.
    pub unit: Unit,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    /// Spreadsheet row number; `0` marks a whole-file failure.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub valid: Vec<ImportRow>,
    pub errors: Vec<ImportError>,
    /// Warnings on rows that ended up with nothing to apply, such as a row
    /// whose only edit was an unreadable date.
    #[serde(default)]
    pub warnings: Vec<ImportError>,
    pub summary: ImportSummary,
}

impl ImportResult {
    /// A result carrying a single file-level error and no rows.
    pub fn rejected(total: usize, message: impl Into<String>) -> Self {
        Self {
            valid: Vec::new(),
            errors: vec![ImportError {
                row: 0,
                message: message.into(),
            }],
            warnings: Vec::new(),
            summary: ImportSummary {
                total,
                changed: 0,
                unchanged: 0,
                errors: 1,
            },
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.valid.is_empty() && self.errors.iter().any(|error| error.row == 0)
    }

    pub fn warning_count(&self) -> usize {
        let per_row: usize = self.valid.iter().map(|row| row.warnings.len()).sum();
        per_row + self.warnings.len()
    }
}

enum RowOutcome {
    Changed(ImportRow),
    Unchanged(Vec<String>),
    Rejected(String),
}

/// Diffs spreadsheet rows against stored units. Pure: no I/O, no logging side effects
/// beyond tracing.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ImportOptions,
}

impl Reconciler {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub fn reconcile(&self, sheet: &Sheet, developments: &[Development]) -> ImportResult {
        let total = sheet.rows().len();
        let missing = sheet.missing_headers(&Column::header_labels());
        if !missing.is_empty() {
            info!(missing = missing.len(), "import rejected: missing columns");
            return ImportResult::rejected(
                total,
                format!("Missing required columns: {}", missing.join(", ")),
            );
        }

        let mut result = ImportResult {
            summary: ImportSummary {
                total,
                ..ImportSummary::default()
            },
            ..ImportResult::default()
        };

        for (index, row) in sheet.rows().iter().enumerate() {
            let row_number = index + HEADER_OFFSET;
            match self.reconcile_row(row_number, row, developments) {
                RowOutcome::Changed(import_row) => {
                    result.summary.changed += 1;
                    result.valid.push(import_row);
                }
                RowOutcome::Unchanged(warnings) => {
                    result.summary.unchanged += 1;
                    for message in warnings {
                        result.warnings.push(ImportError {
                            row: row_number,
                            message,
                        });
                    }
                }
                RowOutcome::Rejected(message) => {
                    debug!(row = row_number, %message, "import row rejected");
                    result.summary.errors += 1;
                    result.errors.push(ImportError {
                        row: row_number,
                        message,
                    });
                }
            }
        }

        info!(
            total = result.summary.total,
            changed = result.summary.changed,
            unchanged = result.summary.unchanged,
            errors = result.summary.errors,
            warnings = result.warning_count(),
            "spreadsheet reconciled"
        );

        result
    }

    fn reconcile_row(
        &self,
        row_number: usize,
        row: &SheetRow,
        developments: &[Development],
    ) -> RowOutcome {
        let development_name = row.get(Column::Development.label()).as_trimmed_text();
        let unit_number = row.get(Column::UnitNumber.label()).as_trimmed_text();

        if development_name.is_empty() {
            return RowOutcome::Rejected("Missing development name".to_string());
        }
        if unit_number.is_empty() {
            return RowOutcome::Rejected("Missing unit number".to_string());
        }

        let Some(development) = developments
            .iter()
            .find(|development| development.matches_name(&development_name))
        else {
            return RowOutcome::Rejected(format!("Development '{development_name}' not found"));
        };

        let Some(unit) = development.unit(&unit_number) else {
            return RowOutcome::Rejected(format!(
                "Unit {unit_number} not found in development {}",
                development.name
            ));
        };

        let mut candidate = unit.clone();
        let mut changes = Vec::new();
        let mut warnings = Vec::new();
        let mut issues = Vec::new();

        for column in Column::tracked() {
            let incoming = row.get(column.label());
            let current = column.extract(development, unit);
            if !values_differ(&current, incoming) {
                continue;
            }

            let value = match parse_field(column, incoming) {
                Ok(value) => value,
                Err(issue) if issue.is_soft() => {
                    warnings.push(format!("{issue}; kept {}", describe(&current)));
                    continue;
                }
                Err(issue) => {
                    issues.push(issue.to_string());
                    continue;
                }
            };

            let canonical = value.to_cell();
            if !values_differ(&current, &canonical) {
                continue;
            }

            if column.kind() == ColumnKind::Price {
                if let (Some(old), Some(new)) = (current.as_number(), canonical.as_number()) {
                    warnings.extend(price_change_warning(
                        column.label(),
                        old,
                        new,
                        self.options.price_warning_ratio,
                    ));
                }
            }

            column.assign(&mut candidate, value);
            changes.push(ImportChange {
                field: column.label().to_string(),
                old_value: current,
                new_value: canonical,
            });
        }

        if !issues.is_empty() {
            return RowOutcome::Rejected(issues.join("; "));
        }

        if changes.is_empty() {
            return RowOutcome::Unchanged(warnings);
        }

        warnings.extend(documentation_warnings(&candidate, &changes));

        RowOutcome::Changed(ImportRow {
            row: row_number,
            development_id: development.id.clone(),
            development_name: development.name.clone(),
            unit_number: unit.unit_number.clone(),
            changes,
            unit: candidate,
            warnings,
        })
    }
}

fn describe(value: &CellValue) -> String {
    if value.is_empty() {
        "blank".to_string()
    } else {
        format!("'{value}'")
    }
}

/// Flag/date pairs the row touched that now disagree.
fn documentation_warnings(unit: &Unit, changes: &[ImportChange]) -> Vec<String> {
    MilestoneKind::ordered()
        .into_iter()
        .filter(|kind| unit.documentation.milestone(*kind).is_inconsistent())
        .filter(|kind| {
            let flag = Column::MilestoneFlag(*kind).label();
            let date = Column::MilestoneDate(*kind).label();
            changes
                .iter()
                .any(|change| change.field == flag || change.field == date)
        })
        .map(|kind| {
            format!(
                "{} is marked No but {} is set",
                kind.label(),
                Column::MilestoneDate(kind).label()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::export::export_sheet;
    use crate::portfolio::{
        ConstructionStatus, DevelopmentStatus, Milestone, PurchaserType, SalesStatus,
    };
    use chrono::NaiveDate;

    fn developments() -> Vec<Development> {
        let mut first = Unit::new("1", "Semi-Detached");
        first.address = "1 Quay Road".to_string();
        first.bedrooms = Some(3);
        first.construction_status = ConstructionStatus::InProgress;
        first.sales_status = SalesStatus::ForSale;
        first.pricing.price_ex_vat = Some(100_000.0);
        first.part_v = true;

        let mut second = Unit::new("2", "Apartment");
        second.address = "2 Quay Road".to_string();
        second.purchaser.purchaser_type = Some(PurchaserType::Council);
        second.documentation.contract_signed = Milestone {
            complete: true,
            date: NaiveDate::from_ymd_opt(2025, 2, 14),
        };

        vec![Development {
            id: DevelopmentId::new("dev-1"),
            name: "Harbour View".to_string(),
            project_number: "P-100".to_string(),
            status: DevelopmentStatus::Active,
            units: vec![first, second],
        }]
    }

    fn edit(sheet: &mut Sheet, row: usize, column: Column, value: CellValue) {
        let mut rows: Vec<SheetRow> = sheet.rows().to_vec();
        rows[row].set(column.label(), value);
        let mut rebuilt = Sheet::new(sheet.headers().to_vec());
        for edited in rows {
            rebuilt.push_row(
                sheet
                    .headers()
                    .iter()
                    .map(|header| edited.get(header).clone())
                    .collect::<Vec<_>>(),
            );
        }
        *sheet = rebuilt;
    }

    #[test]
    fn unedited_export_reconciles_to_no_changes() {
        let developments = developments();
        let sheet = export_sheet(&developments);

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert!(result.valid.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.unchanged, 2);
    }

    #[test]
    fn coercion_edge_cases_are_not_changes() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(&mut sheet, 0, Column::Bedrooms, CellValue::text("3"));
        edit(&mut sheet, 0, Column::PartV, CellValue::text("yes"));
        edit(&mut sheet, 0, Column::ConstructionStatus, CellValue::text("in progress"));
        edit(&mut sheet, 1, Column::PurchaserName, CellValue::text(""));
        edit(
            &mut sheet,
            1,
            Column::MilestoneDate(MilestoneKind::ContractSigned),
            CellValue::text("2025-02-14"),
        );

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert_eq!(result.summary.unchanged, 2, "{result:?}");
        assert_eq!(result.summary.changed, 0);
    }

    #[test]
    fn changes_list_exactly_the_edited_fields() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(&mut sheet, 0, Column::SalesStatus, CellValue::text("Under Offer"));
        edit(&mut sheet, 0, Column::Bedrooms, CellValue::Number(4.0));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert_eq!(result.summary.changed, 1);
        assert_eq!(result.summary.unchanged, 1);
        let row = &result.valid[0];
        assert_eq!(row.row, 2);
        let fields: Vec<_> = row.changes.iter().map(|change| change.field.as_str()).collect();
        assert_eq!(fields, vec!["Bedrooms", "Sales Status"]);
        assert_eq!(row.unit.sales_status, SalesStatus::UnderOffer);
        assert_eq!(row.unit.bedrooms, Some(4));
        assert_eq!(row.changes[1].old_value, CellValue::text("For Sale"));
    }

    #[test]
    fn invalid_enum_rejects_the_row() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(&mut sheet, 1, Column::ConstructionStatus, CellValue::text("Ongoing"));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert!(result.valid.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 3);
        assert!(result.errors[0].message.contains("'Ongoing'"));
        assert!(result.errors[0].message.contains("Not Started, In Progress, Complete"));
        assert_eq!(result.summary.errors, 1);
        assert_eq!(result.summary.unchanged, 1);
    }

    #[test]
    fn large_price_moves_warn_without_blocking() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(&mut sheet, 0, Column::PriceExVat, CellValue::Number(130_000.0));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        let row = &result.valid[0];
        assert_eq!(row.changes.len(), 1);
        assert_eq!(row.changes[0].field, "Price Ex VAT");
        assert!(row.warnings.iter().any(|warning| warning.contains(">20%")));
        assert_eq!(row.unit.pricing.price_ex_vat, Some(130_000.0));
    }

    #[test]
    fn unparseable_dates_warn_and_keep_stored_value() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        let column = Column::MilestoneDate(MilestoneKind::ContractSigned);
        edit(&mut sheet, 1, column, CellValue::text("mid-February"));
        edit(&mut sheet, 1, Column::UnitType, CellValue::text("Penthouse"));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        let row = &result.valid[0];
        assert_eq!(row.changes.len(), 1);
        assert!(row.warnings[0].contains("mid-February"));
        assert_eq!(
            row.unit.documentation.contract_signed.date,
            NaiveDate::from_ymd_opt(2025, 2, 14)
        );
    }

    #[test]
    fn warnings_on_rows_without_changes_are_kept() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        let column = Column::MilestoneDate(MilestoneKind::ContractSigned);
        edit(&mut sheet, 1, column, CellValue::text("mid-February"));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert!(result.valid.is_empty());
        assert_eq!(result.summary.unchanged, 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].row, 3);
        assert!(result.warnings[0].message.contains("mid-February"));
        assert!(result.warnings[0].message.ends_with("kept '14/02/2025'"));
    }

    #[test]
    fn unknown_units_and_developments_are_row_errors() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(&mut sheet, 0, Column::UnitNumber, CellValue::text("99"));
        edit(&mut sheet, 1, Column::Development, CellValue::text("Nowhere Park"));

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert_eq!(result.summary.errors, 2);
        assert!(result.errors[0].message.contains("Unit 99 not found"));
        assert!(result.errors[1].message.contains("Nowhere Park"));
    }

    #[test]
    fn missing_columns_abort_before_any_row() {
        let developments = developments();
        let full = export_sheet(&developments);
        let headers: Vec<_> = full
            .headers()
            .iter()
            .filter(|header| header.as_str() != "Sales Status")
            .cloned()
            .collect();
        let mut sheet = Sheet::new(headers.clone());
        for row in full.rows() {
            sheet.push_row(
                headers
                    .iter()
                    .map(|header| row.get(header).clone())
                    .collect::<Vec<_>>(),
            );
        }

        let result = Reconciler::default().reconcile(&sheet, &developments);

        assert!(result.valid.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 0);
        assert!(result.errors[0].message.contains("Sales Status"));
        assert!(result.is_rejected());
    }

    #[test]
    fn flag_cleared_with_date_present_warns() {
        let developments = developments();
        let mut sheet = export_sheet(&developments);
        edit(
            &mut sheet,
            1,
            Column::MilestoneFlag(MilestoneKind::ContractSigned),
            CellValue::text("No"),
        );

        let result = Reconciler::default().reconcile(&sheet, &developments);

        let row = &result.valid[0];
        assert!(row
            .warnings
            .iter()
            .any(|warning| warning.contains("Contract Signed is marked No")));
    }
}
