use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::entry::{AuditFilter, AuditLogEntry, NewAuditEntry};

/// Append-only storage for audit entries with cursor pagination.
pub trait AuditStore: Send + Sync {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError>;
    fn query(
        &self,
        filter: &AuditFilter,
        page_size: usize,
        continuation: Option<&ContinuationToken>,
    ) -> Result<AuditPage, AuditError>;
}

/// Opaque cursor handed back to callers between pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(pub String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub continuation_token: Option<ContinuationToken>,
    pub has_more: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid continuation token '{0}'")]
    InvalidToken(String),
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to render audit export: {0}")]
    Export(#[from] csv::Error),
}

#[derive(Debug, Default)]
struct Ledger {
    next_sequence: u64,
    entries: Vec<(u64, AuditLogEntry)>,
}

/// In-memory store. Entries are kept in append order; pages walk it backwards
/// so the newest entry comes first.
#[derive(Clone, Default)]
pub struct MemoryAuditStore {
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryAuditStore {
    pub fn len(&self) -> usize {
        self.ledger
            .lock()
            .map(|ledger| ledger.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Ledger>, AuditError> {
        self.ledger
            .lock()
            .map_err(|_| AuditError::Unavailable("audit ledger lock poisoned".to_string()))
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError> {
        let mut ledger = self.lock()?;
        ledger.next_sequence += 1;
        let sequence = ledger.next_sequence;

        let stored = AuditLogEntry::from_new(format!("audit-{sequence:08}"), entry);
        ledger.entries.push((sequence, stored.clone()));
        Ok(stored)
    }

    fn query(
        &self,
        filter: &AuditFilter,
        page_size: usize,
        continuation: Option<&ContinuationToken>,
    ) -> Result<AuditPage, AuditError> {
        let before = continuation.map(decode_cursor).transpose()?;
        let ledger = self.lock()?;

        let mut matching = ledger
            .entries
            .iter()
            .rev()
            .filter(|(sequence, _)| before.map_or(true, |cursor| *sequence < cursor))
            .filter(|(_, entry)| filter.matches(entry));

        let page: Vec<&(u64, AuditLogEntry)> = matching.by_ref().take(page_size).collect();
        let has_more = page.len() == page_size && matching.next().is_some();

        let continuation_token = if has_more {
            page.last().map(|(sequence, _)| encode_cursor(*sequence))
        } else {
            None
        };

        Ok(AuditPage {
            entries: page.into_iter().map(|(_, entry)| entry.clone()).collect(),
            continuation_token,
            has_more,
        })
    }
}

fn encode_cursor(sequence: u64) -> ContinuationToken {
    ContinuationToken(format!("c{sequence:x}"))
}

fn decode_cursor(token: &ContinuationToken) -> Result<u64, AuditError> {
    token
        .as_str()
        .strip_prefix('c')
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .ok_or_else(|| AuditError::InvalidToken(token.as_str().to_string()))
}
