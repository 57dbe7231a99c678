use std::collections::BTreeSet;

use serde::Serialize;

use super::reconcile::{ImportResult, ImportRow};
use crate::apply::ApplyResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Upload,
    Preview,
    Applying,
    Complete,
}

impl ImportStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Preview => "preview",
            Self::Applying => "applying",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot move import from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("select at least one row before applying")]
    NothingSelected,
    #[error("row index {0} is outside the preview")]
    RowOutOfRange(usize),
}

/// Linear upload → preview → applying → complete flow for one spreadsheet.
#[derive(Debug, Clone)]
pub struct ImportSession {
    stage: ImportStage,
    preview: Option<ImportResult>,
    selected: BTreeSet<usize>,
    outcome: Option<ApplyResult>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            stage: ImportStage::Upload,
            preview: None,
            selected: BTreeSet::new(),
            outcome: None,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn preview(&self) -> Option<&ImportResult> {
        self.preview.as_ref()
    }

    pub fn outcome(&self) -> Option<&ApplyResult> {
        self.outcome.as_ref()
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// Enter preview with every valid row selected.
    pub fn load_preview(&mut self, result: ImportResult) -> Result<(), SessionError> {
        self.expect_stage(ImportStage::Upload, ImportStage::Preview)?;
        self.selected = (0..result.valid.len()).collect();
        self.preview = Some(result);
        self.stage = ImportStage::Preview;
        Ok(())
    }

    pub fn toggle(&mut self, index: usize) -> Result<bool, SessionError> {
        self.expect_stage(ImportStage::Preview, ImportStage::Preview)?;
        self.ensure_in_range(index)?;
        if self.selected.remove(&index) {
            Ok(false)
        } else {
            self.selected.insert(index);
            Ok(true)
        }
    }

    pub fn select_only(&mut self, indices: &[usize]) -> Result<(), SessionError> {
        self.expect_stage(ImportStage::Preview, ImportStage::Preview)?;
        for index in indices {
            self.ensure_in_range(*index)?;
        }
        self.selected = indices.iter().copied().collect();
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), SessionError> {
        self.expect_stage(ImportStage::Preview, ImportStage::Preview)?;
        self.selected = (0..self.row_count()).collect();
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), SessionError> {
        self.expect_stage(ImportStage::Preview, ImportStage::Preview)?;
        self.selected.clear();
        Ok(())
    }

    /// Move to applying and hand back the selected rows in spreadsheet order.
    pub fn begin_apply(&mut self) -> Result<Vec<ImportRow>, SessionError> {
        self.expect_stage(ImportStage::Preview, ImportStage::Applying)?;
        if self.selected.is_empty() {
            return Err(SessionError::NothingSelected);
        }

        let rows = self
            .preview
            .as_ref()
            .map(|preview| {
                self.selected
                    .iter()
                    .filter_map(|index| preview.valid.get(*index).cloned())
                    .collect()
            })
            .unwrap_or_default();

        self.stage = ImportStage::Applying;
        Ok(rows)
    }

    pub fn complete(&mut self, outcome: ApplyResult) -> Result<(), SessionError> {
        self.expect_stage(ImportStage::Applying, ImportStage::Complete)?;
        self.outcome = Some(outcome);
        self.stage = ImportStage::Complete;
        Ok(())
    }

    /// The only backward transition: drop everything and wait for a new upload.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn row_count(&self) -> usize {
        self.preview
            .as_ref()
            .map(|preview| preview.valid.len())
            .unwrap_or(0)
    }

    fn ensure_in_range(&self, index: usize) -> Result<(), SessionError> {
        if index < self.row_count() {
            Ok(())
        } else {
            Err(SessionError::RowOutOfRange(index))
        }
    }

    fn expect_stage(&self, required: ImportStage, target: ImportStage) -> Result<(), SessionError> {
        if self.stage == required {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.stage.label(),
                to: target.label(),
            })
        }
    }
}
