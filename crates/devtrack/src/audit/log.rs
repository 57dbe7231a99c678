use std::sync::Arc;

use csv::{QuoteStyle, WriterBuilder};
use tracing::{debug, warn};

use super::entry::{AuditFilter, AuditLogEntry, NewAuditEntry};
use super::store::{AuditError, AuditPage, AuditStore, ContinuationToken};
use crate::portfolio::LabeledEnum;

pub const MAX_PAGE_SIZE: usize = 500;

const EXPORT_HEADER: [&str; 9] = [
    "Date/Time",
    "User",
    "Action",
    "Entity Type",
    "Development",
    "Unit",
    "Field",
    "Old Value",
    "New Value",
];

const PLACEHOLDER: &str = "-";

/// Writer and reader over an [`AuditStore`].
pub struct AuditLog<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AuditLog<S>
where
    S: AuditStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record an entry. Failures are logged and swallowed so auditing never
    /// blocks the change it describes.
    pub fn log(&self, entry: NewAuditEntry) -> Option<String> {
        let action = entry.action;
        match self.store.append(entry) {
            Ok(stored) => {
                debug!(id = %stored.id, action = action.label(), "audit entry recorded");
                Some(stored.id)
            }
            Err(err) => {
                warn!(error = %err, action = action.label(), "failed to record audit entry");
                None
            }
        }
    }

    pub fn get_logs(
        &self,
        filter: &AuditFilter,
        page_size: usize,
        continuation: Option<&ContinuationToken>,
    ) -> Result<AuditPage, AuditError> {
        self.store
            .query(filter, page_size.clamp(1, MAX_PAGE_SIZE), continuation)
    }

    /// Walk every page matching the filter, newest first.
    pub fn collect_all(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut entries = Vec::new();
        let mut token = None;
        loop {
            let page = self.get_logs(filter, MAX_PAGE_SIZE, token.as_ref())?;
            entries.extend(page.entries);
            match page.continuation_token {
                Some(next) if page.has_more => token = Some(next),
                _ => break,
            }
        }
        Ok(entries)
    }

    pub fn export_csv(entries: &[AuditLogEntry]) -> Result<String, AuditError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(Vec::new());
        writer.write_record(EXPORT_HEADER)?;

        for entry in entries {
            let prefix = [
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.user_display().to_string(),
                entry.action.label().to_string(),
                entry.entity_type.label().to_string(),
                entry.development_name.clone().unwrap_or_default(),
                entry.unit_number.clone().unwrap_or_default(),
            ];

            if entry.changes.is_empty() {
                writer.write_record(
                    prefix
                        .iter()
                        .map(String::as_str)
                        .chain([PLACEHOLDER, PLACEHOLDER, PLACEHOLDER]),
                )?;
                continue;
            }

            for change in &entry.changes {
                let old_value = change.old_value.to_string();
                let new_value = change.new_value.to_string();
                writer.write_record(prefix.iter().map(String::as_str).chain([
                    change.field.as_str(),
                    old_value.as_str(),
                    new_value.as_str(),
                ]))?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| AuditError::Export(err.into_error().into()))?;
        String::from_utf8(bytes)
            .map_err(|err| AuditError::Unavailable(format!("export was not valid UTF-8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{AuditAction, AuditChange, EntityType};
    use crate::audit::store::MemoryAuditStore;
    use crate::import::CellValue;
    use crate::portfolio::{Actor, DevelopmentId};
    use chrono::{TimeZone, Utc};

    struct FailingStore;

    impl AuditStore for FailingStore {
        fn append(&self, _entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError> {
            Err(AuditError::Unavailable("offline".to_string()))
        }

        fn query(
            &self,
            _filter: &AuditFilter,
            _page_size: usize,
            _continuation: Option<&ContinuationToken>,
        ) -> Result<AuditPage, AuditError> {
            Err(AuditError::Unavailable("offline".to_string()))
        }
    }

    fn actor() -> Actor {
        Actor::new("u-1", "sam@example.com", "Sam \"The Builder\"")
    }

    #[test]
    fn log_swallows_store_failures() {
        let log = AuditLog::new(Arc::new(FailingStore));
        let id = log.log(NewAuditEntry::new(
            &actor(),
            AuditAction::Update,
            EntityType::Unit,
            "unit-1",
        ));
        assert!(id.is_none());
    }

    #[test]
    fn page_size_is_clamped() {
        let log = AuditLog::new(Arc::new(MemoryAuditStore::default()));
        for index in 0..3 {
            log.log(NewAuditEntry::new(
                &actor(),
                AuditAction::Update,
                EntityType::Unit,
                format!("unit-{index}"),
            ));
        }

        let page = log
            .get_logs(&AuditFilter::default(), 0, None)
            .expect("query");
        assert_eq!(page.entries.len(), 1);
        assert!(page.has_more);

        let all = log.collect_all(&AuditFilter::default()).expect("collect");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn export_flattens_changes_and_uses_placeholders() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let with_changes = AuditLogEntry::from_new(
            "audit-1".to_string(),
            NewAuditEntry::new(&actor(), AuditAction::Update, EntityType::Unit, "unit-7")
                .at(timestamp)
                .for_development(&DevelopmentId::new("dev-1"), "Harbour View")
                .for_unit("7")
                .with_changes(vec![
                    AuditChange::new(
                        "Sales Status (via Excel import)",
                        CellValue::text("For Sale"),
                        CellValue::text("Contracted"),
                    ),
                    AuditChange::new(
                        "List Price (via Excel import)",
                        CellValue::Number(395000.0),
                        CellValue::Number(410000.0),
                    ),
                ]),
        );
        let bare = AuditLogEntry::from_new(
            "audit-2".to_string(),
            NewAuditEntry::new(&actor(), AuditAction::BulkUpdate, EntityType::Unit, "batch")
                .at(timestamp),
        );

        let csv = AuditLog::<MemoryAuditStore>::export_csv(&[with_changes, bare]).expect("csv");
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "\"Date/Time\",\"User\",\"Action\",\"Entity Type\",\"Development\",\"Unit\",\"Field\",\"Old Value\",\"New Value\""
        );
        assert!(lines[1].contains("\"Sam \"\"The Builder\"\"\""));
        assert!(lines[1].contains("\"For Sale\",\"Contracted\""));
        assert!(lines[2].contains("\"395000\",\"410000\""));
        assert!(lines[3].ends_with("\"-\",\"-\",\"-\""));
        assert!(lines[3].contains("\"Bulk Update\""));
    }
}
