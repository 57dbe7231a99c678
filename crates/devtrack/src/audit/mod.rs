//! Append-only history of who changed what, and when.

pub mod entry;
pub mod log;
pub mod store;

pub use entry::{AuditAction, AuditChange, AuditFilter, AuditLogEntry, EntityType, NewAuditEntry};
pub use log::{AuditLog, MAX_PAGE_SIZE};
pub use store::{AuditError, AuditPage, AuditStore, ContinuationToken, MemoryAuditStore};
