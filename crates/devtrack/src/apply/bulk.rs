use serde::{Deserialize, Serialize};

use crate::import::{parse_field, CellValue, Column, ColumnKind, FieldValue};
use crate::portfolio::DevelopmentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRef {
    pub development_id: DevelopmentId,
    pub unit_number: String,
}

/// One field to set on every targeted unit. `field` is a column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFieldChange {
    pub field: String,
    #[serde(default)]
    pub value: CellValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    pub targets: Vec<UnitRef>,
    pub changes: Vec<BulkFieldChange>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BulkUpdateError {
    #[error("bulk update needs at least one target unit and one field change")]
    Empty,
    #[error("bulk update rejected: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Validate every requested change before any unit is touched.
///
/// Unlike the spreadsheet path nothing is downgraded to a warning: a bad
/// date or a blank required field rejects the whole batch.
pub(crate) fn validate_changes(
    request: &BulkUpdateRequest,
) -> Result<Vec<(Column, FieldValue)>, BulkUpdateError> {
    if request.targets.is_empty() || request.changes.is_empty() {
        return Err(BulkUpdateError::Empty);
    }

    let mut validated = Vec::with_capacity(request.changes.len());
    let mut problems = Vec::new();

    for change in &request.changes {
        let Some(column) = Column::from_label(&change.field) else {
            problems.push(format!("Unknown field '{}'", change.field.trim()));
            continue;
        };
        if column.kind() == ColumnKind::Identity {
            problems.push(format!("{} cannot be bulk updated", column.label()));
            continue;
        }
        if validated.iter().any(|(seen, _)| *seen == column) {
            problems.push(format!("{} is listed more than once", column.label()));
            continue;
        }

        match parse_field(column, &change.value) {
            Ok(value) => validated.push((column, value)),
            Err(issue) => problems.push(issue.to_string()),
        }
    }

    if problems.is_empty() {
        Ok(validated)
    } else {
        Err(BulkUpdateError::Validation(problems))
    }
}
