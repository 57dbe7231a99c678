use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::import::CellValue;
use crate::portfolio::{Actor, DevelopmentId, LabeledEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    BulkUpdate,
    NoteAdded,
    NoteEdited,
    NoteDeleted,
}

impl LabeledEnum for AuditAction {
    const ALL: &'static [Self] = &[
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::BulkUpdate,
        Self::NoteAdded,
        Self::NoteEdited,
        Self::NoteDeleted,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::BulkUpdate => "Bulk Update",
            Self::NoteAdded => "Note Added",
            Self::NoteEdited => "Note Edited",
            Self::NoteDeleted => "Note Deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Unit,
    Development,
    Note,
}

impl EntityType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unit => "Unit",
            Self::Development => "Development",
            Self::Note => "Note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChange {
    pub field: String,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

impl AuditChange {
    pub fn new(field: impl Into<String>, old_value: CellValue, new_value: CellValue) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }
}

/// An entry before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub changes: Vec<AuditChange>,
    pub development_id: Option<DevelopmentId>,
    pub development_name: Option<String>,
    pub unit_number: Option<String>,
}

impl NewAuditEntry {
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.clone(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            changes: Vec::new(),
            development_id: None,
            development_name: None,
            unit_number: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_changes(mut self, changes: Vec<AuditChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn for_development(mut self, id: &DevelopmentId, name: &str) -> Self {
        self.development_id = Some(id.clone());
        self.development_name = Some(name.to_string());
        self
    }

    pub fn for_unit(mut self, unit_number: &str) -> Self {
        self.unit_number = Some(unit_number.to_string());
        self
    }
}

/// Immutable, append-only history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub changes: Vec<AuditChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_id: Option<DevelopmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<String>,
}

impl AuditLogEntry {
    pub fn from_new(id: String, entry: NewAuditEntry) -> Self {
        let NewAuditEntry {
            timestamp,
            actor,
            action,
            entity_type,
            entity_id,
            changes,
            development_id,
            development_name,
            unit_number,
        } = entry;

        Self {
            id,
            timestamp,
            user_id: actor.user_id,
            user_email: actor.user_email,
            user_name: actor.user_name,
            action,
            entity_type,
            entity_id,
            changes,
            development_id,
            development_name,
            unit_number,
        }
    }

    pub fn user_display(&self) -> &str {
        if self.user_name.trim().is_empty() {
            &self.user_email
        } else {
            &self.user_name
        }
    }
}

/// Optional, AND-combined constraints on a log query. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub development_id: Option<DevelopmentId>,
    pub action: Option<AuditAction>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
            && self
                .user_id
                .as_ref()
                .map_or(true, |user_id| &entry.user_id == user_id)
            && self
                .development_id
                .as_ref()
                .map_or(true, |id| entry.development_id.as_ref() == Some(id))
            && self.action.map_or(true, |action| entry.action == action)
    }
}
