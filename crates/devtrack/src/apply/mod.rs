//! Committing reconciled rows and bulk edits to the portfolio.
//!
//! Commits are best-effort per unit: one failed unit is reported in
//! [`ApplyResult`] and never rolls back or blocks the others.

pub mod bulk;
pub mod service;

use serde::{Deserialize, Serialize};

pub use bulk::{BulkFieldChange, BulkUpdateError, BulkUpdateRequest, UnitRef};
pub use service::{ChangeApplier, BULK_UPDATE_PROVENANCE, EXCEL_IMPORT_PROVENANCE};

/// Outcome of a batch commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ApplyResult {
    pub(crate) fn record_success(&mut self) {
        self.success += 1;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}
