use std::sync::Arc;

use tracing::{info, warn};

use super::bulk::{validate_changes, BulkUpdateError, BulkUpdateRequest};
use super::ApplyResult;
use crate::audit::{AuditAction, AuditChange, AuditLog, AuditStore, EntityType, NewAuditEntry};
use crate::import::{values_differ, CellValue, ImportRow};
use crate::portfolio::{
    Actor, Development, DevelopmentId, PortfolioRepository, RepositoryError, Unit, UnitOverride,
};

pub const EXCEL_IMPORT_PROVENANCE: &str = "via Excel import";
pub const BULK_UPDATE_PROVENANCE: &str = "via bulk update";

const BATCH_FIELD: &str = "Batch";

/// A unit ready to be written, with the field deltas that describe it.
struct PendingCommit<'a> {
    development_id: &'a DevelopmentId,
    development_name: &'a str,
    unit_number: &'a str,
    unit: Unit,
    changes: Vec<AuditChange>,
}

/// Writes units through the repository and records every write in the audit log.
pub struct ChangeApplier<P, S> {
    repository: Arc<P>,
    audit: AuditLog<S>,
}

impl<P, S> ChangeApplier<P, S>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    pub fn new(repository: Arc<P>, audit: AuditLog<S>) -> Self {
        Self { repository, audit }
    }

    pub fn repository(&self) -> &Arc<P> {
        &self.repository
    }

    pub fn audit(&self) -> &AuditLog<S> {
        &self.audit
    }

    /// Commit the selected import rows in order.
    ///
    /// Each row writes its fully merged candidate unit, so applying the same rows
    /// twice leaves the same final state.
    pub fn apply(&self, rows: &[ImportRow], actor: &Actor) -> ApplyResult {
        let intended = rows
            .iter()
            .flat_map(|row| {
                row.changes.iter().map(move |change| {
                    AuditChange::new(
                        format!(
                            "{} / Unit {}: {}",
                            row.development_name, row.unit_number, change.field
                        ),
                        change.old_value.clone(),
                        change.new_value.clone(),
                    )
                })
            })
            .collect();
        let started = format!("Starting Excel import of {} units", rows.len());
        self.log_batch(actor, "excel-import", &started, None, intended);

        let mut result = ApplyResult::default();
        for row in rows {
            let changes = row
                .changes
                .iter()
                .map(|change| {
                    AuditChange::new(
                        with_provenance(&change.field, EXCEL_IMPORT_PROVENANCE),
                        change.old_value.clone(),
                        change.new_value.clone(),
                    )
                })
                .collect();

            let outcome = self
                .ensure_unit(&row.development_id, &row.development_name, &row.unit_number)
                .and_then(|()| {
                    self.commit(
                        PendingCommit {
                            development_id: &row.development_id,
                            development_name: &row.development_name,
                            unit_number: &row.unit_number,
                            unit: row.unit.clone(),
                            changes,
                        },
                        actor,
                    )
                });

            match outcome {
                Ok(()) => result.record_success(),
                Err(message) => {
                    warn!(
                        row = row.row,
                        unit = %row.unit_number,
                        %message,
                        "import row not applied"
                    );
                    result.record_failure(message);
                }
            }
        }

        self.log_batch(actor, "excel-import", &started, Some(&result), Vec::new());
        info!(
            success = result.success,
            failed = result.failed,
            "excel import applied"
        );
        result
    }

    /// Set the same field values on many units after validating the whole batch.
    pub fn bulk_update(
        &self,
        request: &BulkUpdateRequest,
        actor: &Actor,
    ) -> Result<ApplyResult, BulkUpdateError> {
        let validated = match validate_changes(request) {
            Ok(validated) => validated,
            Err(err) => {
                info!(error = %err, "bulk update rejected before commit");
                return Err(err);
            }
        };

        let intended = validated
            .iter()
            .map(|(column, value)| {
                AuditChange::new(column.label(), CellValue::Empty, value.to_cell())
            })
            .collect();
        let started = format!("Starting bulk update of {} units", request.targets.len());
        self.log_batch(actor, "bulk-update", &started, None, intended);

        let mut result = ApplyResult::default();
        for target in &request.targets {
            let development = match self.lookup_development(&target.development_id) {
                Ok(development) => development,
                Err(message) => {
                    result.record_failure(message);
                    continue;
                }
            };
            let Some(stored) = development.unit(&target.unit_number) else {
                result.record_failure(unit_not_found(&target.unit_number, &development.name));
                continue;
            };

            let mut candidate = stored.clone();
            let mut changes = Vec::new();
            for (column, value) in &validated {
                let current = column.extract(&development, stored);
                let next = value.to_cell();
                if values_differ(&current, &next) {
                    column.assign(&mut candidate, value.clone());
                    changes.push(AuditChange::new(
                        with_provenance(column.label(), BULK_UPDATE_PROVENANCE),
                        current,
                        next,
                    ));
                }
            }

            if changes.is_empty() {
                result.record_success();
                continue;
            }

            let outcome = self.commit(
                PendingCommit {
                    development_id: &development.id,
                    development_name: &development.name,
                    unit_number: &stored.unit_number,
                    unit: candidate,
                    changes,
                },
                actor,
            );
            match outcome {
                Ok(()) => result.record_success(),
                Err(message) => {
                    warn!(unit = %target.unit_number, %message, "bulk update skipped unit");
                    result.record_failure(message);
                }
            }
        }

        self.log_batch(actor, "bulk-update", &started, Some(&result), Vec::new());
        info!(
            success = result.success,
            failed = result.failed,
            "bulk update applied"
        );
        Ok(result)
    }

    fn lookup_development(&self, id: &DevelopmentId) -> Result<Development, String> {
        match self.repository.development(id) {
            Ok(Some(development)) => Ok(development),
            Ok(None) => Err(format!("Development '{id}' not found")),
            Err(err) => Err(format!("Failed to load development {id}: {err}")),
        }
    }

    fn ensure_unit(
        &self,
        development_id: &DevelopmentId,
        development_name: &str,
        unit_number: &str,
    ) -> Result<(), String> {
        match self.repository.development(development_id) {
            Ok(Some(development)) if development.unit(unit_number).is_some() => Ok(()),
            Ok(_) => Err(unit_not_found(unit_number, development_name)),
            Err(err) => Err(format!("Failed to load unit {unit_number}: {err}")),
        }
    }

    fn commit(&self, pending: PendingCommit<'_>, actor: &Actor) -> Result<(), String> {
        let record = UnitOverride {
            development_id: pending.development_id.clone(),
            unit_number: pending.unit_number.to_string(),
            unit: pending.unit,
        };

        self.repository
            .apply_override(record)
            .map_err(|err| match err {
                RepositoryError::UnitNotFound { .. } | RepositoryError::DevelopmentNotFound(_) => {
                    unit_not_found(pending.unit_number, pending.development_name)
                }
                other => format!("Failed to save unit {}: {other}", pending.unit_number),
            })?;

        self.audit.log(
            NewAuditEntry::new(
                actor,
                AuditAction::Update,
                EntityType::Unit,
                format!("{}:{}", pending.development_id, pending.unit_number),
            )
            .for_development(pending.development_id, pending.development_name)
            .for_unit(pending.unit_number)
            .with_changes(pending.changes),
        );
        Ok(())
    }

    /// Bracket a batch with a "starting" and a "completed" entry so a crash
    /// mid-batch still leaves a trace.
    fn log_batch(
        &self,
        actor: &Actor,
        entity_id: &str,
        started: &str,
        outcome: Option<&ApplyResult>,
        intended: Vec<AuditChange>,
    ) {
        let status = match outcome {
            None => AuditChange::new(BATCH_FIELD, CellValue::Empty, CellValue::text(started)),
            Some(result) => AuditChange::new(
                BATCH_FIELD,
                CellValue::text(started),
                CellValue::text(format!(
                    "Completed: {} succeeded, {} failed",
                    result.success, result.failed
                )),
            ),
        };

        let mut changes = Vec::with_capacity(intended.len() + 1);
        changes.push(status);
        changes.extend(intended);

        self.audit.log(
            NewAuditEntry::new(actor, AuditAction::BulkUpdate, EntityType::Unit, entity_id)
                .with_changes(changes),
        );
    }
}

fn with_provenance(field: &str, provenance: &str) -> String {
    format!("{field} ({provenance})")
}

fn unit_not_found(unit_number: &str, development_name: &str) -> String {
    format!("Unit {unit_number} not found in development {development_name}")
}
