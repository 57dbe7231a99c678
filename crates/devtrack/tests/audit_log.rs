use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use devtrack::audit::{
    AuditAction, AuditChange, AuditFilter, AuditLog, EntityType, MemoryAuditStore, NewAuditEntry,
};
use devtrack::import::CellValue;
use devtrack::portfolio::{Actor, DevelopmentId};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn sam() -> Actor {
    Actor::new("u-1", "sam@example.com", "Sam Walsh")
}

fn ria() -> Actor {
    Actor::new("u-2", "ria@example.com", "")
}

/// Nine entries across two users, two developments and three days.
fn seeded_log() -> AuditLog<MemoryAuditStore> {
    let log = AuditLog::new(Arc::new(MemoryAuditStore::default()));
    let harbour = DevelopmentId::new("dev-harbour");
    let millbrook = DevelopmentId::new("dev-millbrook");

    for (index, day) in [1, 1, 2, 2, 2, 3, 3, 3, 3].into_iter().enumerate() {
        let actor = if index % 3 == 0 { ria() } else { sam() };
        let (development, name) = if index % 2 == 0 {
            (&harbour, "Harbour View")
        } else {
            (&millbrook, "Millbrook")
        };
        let unit = (index + 1).to_string();
        log.log(
            NewAuditEntry::new(
                &actor,
                AuditAction::Update,
                EntityType::Unit,
                format!("{development}:{unit}"),
            )
            .at(at(day, 9 + index as u32))
            .for_development(development, name)
            .for_unit(&unit)
            .with_changes(vec![AuditChange::new(
                "Sales Status (via bulk update)",
                CellValue::text("For Sale"),
                CellValue::text("Under Offer"),
            )]),
        )
        .expect("entry stored");
    }

    log.log(
        NewAuditEntry::new(&sam(), AuditAction::BulkUpdate, EntityType::Unit, "bulk-update")
            .at(at(3, 20)),
    )
    .expect("entry stored");
    log
}

#[test]
fn filters_combine_with_and() {
    let log = seeded_log();

    let by_user = log
        .collect_all(&AuditFilter {
            user_id: Some("u-2".to_string()),
            ..AuditFilter::default()
        })
        .expect("query");
    assert_eq!(by_user.len(), 3);
    assert!(by_user.iter().all(|entry| entry.user_display() == "ria@example.com"));

    let narrowed = log
        .collect_all(&AuditFilter {
            from: Some(at(2, 0)),
            to: Some(at(2, 23)),
            development_id: Some(DevelopmentId::new("dev-harbour")),
            action: Some(AuditAction::Update),
            ..AuditFilter::default()
        })
        .expect("query");
    let units: Vec<_> = narrowed
        .iter()
        .filter_map(|entry| entry.unit_number.as_deref())
        .collect();
    assert_eq!(units, vec!["5", "3"]);

    let batches = log
        .collect_all(&AuditFilter {
            action: Some(AuditAction::BulkUpdate),
            ..AuditFilter::default()
        })
        .expect("query");
    assert_eq!(batches.len(), 1);
    assert!(batches[0].development_id.is_none());
}

#[test]
fn pages_walk_newest_first_without_gaps() {
    let log = seeded_log();
    let filter = AuditFilter::default();

    let mut seen = Vec::new();
    let mut token = None;
    let mut pages = 0;
    loop {
        let page = log.get_logs(&filter, 4, token.as_ref()).expect("page");
        pages += 1;
        assert!(page.entries.len() <= 4);
        seen.extend(page.entries.into_iter().map(|entry| entry.id));
        if !page.has_more {
            break;
        }
        token = page.continuation_token;
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 10);
    let mut sorted = seen.clone();
    sorted.sort();
    sorted.reverse();
    assert_eq!(seen, sorted, "ids arrive newest first");
    sorted.dedup();
    assert_eq!(sorted.len(), 10);
}

#[test]
fn page_size_is_clamped() {
    let log = seeded_log();
    let page = log.get_logs(&AuditFilter::default(), 0, None).expect("page");
    assert_eq!(page.entries.len(), 1);
    assert!(page.has_more);
}

#[test]
fn csv_export_flattens_filtered_entries() {
    let log = seeded_log();
    let entries = log
        .collect_all(&AuditFilter {
            development_id: Some(DevelopmentId::new("dev-millbrook")),
            ..AuditFilter::default()
        })
        .expect("query");
    assert_eq!(entries.len(), 4);

    let csv = AuditLog::<MemoryAuditStore>::export_csv(&entries).expect("csv renders");
    let lines: Vec<_> = csv.lines().collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "\"Date/Time\",\"User\",\"Action\",\"Entity Type\",\"Development\",\"Unit\",\"Field\",\"Old Value\",\"New Value\""
    );
    assert!(lines[1].starts_with("\"2025-03-03 16:00:00\",\"Sam Walsh\",\"Update\""));
    assert!(lines[1].ends_with(
        "\"Millbrook\",\"8\",\"Sales Status (via bulk update)\",\"For Sale\",\"Under Offer\""
    ));
}
