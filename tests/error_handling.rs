//! Error handling and edge case tests.

use chrono::{NaiveDate, TimeZone, Utc};
use park_journal::{
    ActionCategory, ActionData, CompanionData, Journal, JournalConfig, JournalError, LandArea,
    MemoryBackend, ParkType, RecordId, StorageBackend, VisitData, VisitPatch, WriteBatch,
};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Memory backend whose commits can be made to fail.
struct FlakyBackend {
    inner: MemoryBackend,
    fail: Arc<AtomicBool>,
}

impl StorageBackend for FlakyBackend {
    fn read(&self, key: &str) -> park_journal::Result<Option<Vec<u8>>> {
        self.inner.read(key)
    }

    fn commit(&self, batch: WriteBatch) -> park_journal::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.commit(batch)
    }

    fn keys(&self) -> park_journal::Result<Vec<String>> {
        self.inner.keys()
    }
}

fn flaky_journal() -> (Journal, Arc<AtomicBool>) {
    let fail = Arc::new(AtomicBool::new(false));
    let backend = FlakyBackend {
        inner: MemoryBackend::new(),
        fail: fail.clone(),
    };
    (Journal::with_backend(backend), fail)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

// --- Storage Failures ---

#[test]
fn test_failed_cascade_leaves_store_unchanged() {
    let (journal, fail) = flaky_journal();

    let c = journal.create_companion(CompanionData::new("C")).unwrap();
    let v = journal
        .create_visit(VisitData::new(date(), ParkType::Land).with_companions(vec![c.id]))
        .unwrap();
    let a = journal
        .create_action(ActionData::new(
            v.id,
            ActionCategory::Attraction,
            LandArea::Adventureland,
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        ))
        .unwrap();

    fail.store(true, Ordering::SeqCst);
    let err = journal.delete_visit(v.id).unwrap_err();
    assert!(err.is_storage());
    assert!(!err.is_not_found());

    fail.store(false, Ordering::SeqCst);
    assert!(journal.get_visit(v.id).unwrap().is_some());
    assert_eq!(journal.get_actions_by_visit(v.id).unwrap(), vec![a]);
    assert_eq!(
        journal.get_companion(c.id).unwrap().unwrap().visit_ids,
        vec![v.id]
    );

    assert!(journal.delete_visit(v.id).unwrap());
}

#[test]
fn test_failed_link_update_leaves_store_unchanged() {
    let (journal, fail) = flaky_journal();
    let a = journal.create_companion(CompanionData::new("A")).unwrap();
    let b = journal.create_companion(CompanionData::new("B")).unwrap();
    let v = journal
        .create_visit(VisitData::new(date(), ParkType::Sea).with_companions(vec![a.id]))
        .unwrap();

    fail.store(true, Ordering::SeqCst);
    let result = journal.update_visit(
        v.id,
        VisitPatch {
            companion_ids: Some(vec![b.id]),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(JournalError::Io(_))));

    fail.store(false, Ordering::SeqCst);
    assert_eq!(journal.get_companion(a.id).unwrap().unwrap().visit_ids, vec![v.id]);
    assert!(journal.get_companion(b.id).unwrap().unwrap().visit_ids.is_empty());
}

#[test]
fn test_failed_create_does_not_spend_id() {
    let (journal, fail) = flaky_journal();
    let first = journal.create_companion(CompanionData::new("A")).unwrap();

    fail.store(true, Ordering::SeqCst);
    assert!(journal.create_companion(CompanionData::new("B")).is_err());

    fail.store(false, Ordering::SeqCst);
    let next = journal.create_companion(CompanionData::new("B")).unwrap();
    assert_eq!(next.id, RecordId(first.id.0 + 1));
}

#[test]
fn test_failed_cascade_on_disk_leaves_journal_unchanged() {
    let dir = TempDir::new().unwrap();
    let config = JournalConfig {
        path: dir.path().join("journal"),
        ..Default::default()
    };

    let (c, v, a) = {
        let journal = Journal::open(config.clone()).unwrap();
        let c = journal.create_companion(CompanionData::new("C")).unwrap();
        let v = journal
            .create_visit(VisitData::new(date(), ParkType::Land).with_companions(vec![c.id]))
            .unwrap();
        let a = journal
            .create_action(ActionData::new(
                v.id,
                ActionCategory::Attraction,
                LandArea::Adventureland,
                Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
            ))
            .unwrap();

        // The actions file is written after visits and companions in a cascade
        let blocker = config.path.join("data").join("actions.tmp");
        fs::create_dir(&blocker).unwrap();

        let err = journal.delete_visit(v.id).unwrap_err();
        assert!(err.is_storage());

        assert!(journal.get_visit(v.id).unwrap().is_some());
        assert_eq!(journal.get_actions_by_visit(v.id).unwrap(), vec![a.clone()]);
        assert_eq!(
            journal.get_companion(c.id).unwrap().unwrap().visit_ids,
            vec![v.id]
        );

        // Later commits do not discard anything
        journal.create_companion(CompanionData::new("D")).unwrap();
        fs::remove_dir(&blocker).unwrap();
        (c, v, a)
    };

    let journal = Journal::open(config).unwrap();
    assert!(journal.get_visit(v.id).unwrap().is_some());
    assert_eq!(journal.get_actions_by_visit(v.id).unwrap(), vec![a]);
    assert_eq!(journal.list_companions().unwrap().len(), 2);

    assert!(journal.delete_visit(v.id).unwrap());
    assert!(journal.list_actions().unwrap().is_empty());
    assert!(journal.get_companion(c.id).unwrap().unwrap().visit_ids.is_empty());
}

// --- Missing Records ---

#[test]
fn test_missing_records_are_not_errors() {
    let journal = Journal::in_memory();

    assert!(journal.get_visit(RecordId(1)).unwrap().is_none());
    assert!(journal.update_visit(RecordId(1), VisitPatch::default()).unwrap().is_none());
    assert!(!journal.delete_visit(RecordId(1)).unwrap());
    assert!(!journal.delete_companion(RecordId(1)).unwrap());
    assert!(!journal.delete_action(RecordId(1)).unwrap());
    assert!(journal.get_actions_by_visit(RecordId(1)).unwrap().is_empty());
}

#[test]
fn test_double_delete_keeps_other_data() {
    let journal = Journal::in_memory();
    let keep = journal.create_companion(CompanionData::new("Keep")).unwrap();
    let gone = journal.create_companion(CompanionData::new("Gone")).unwrap();
    let v = journal
        .create_visit(VisitData::new(date(), ParkType::Land).with_companions(vec![keep.id, gone.id]))
        .unwrap();

    assert!(journal.delete_companion(gone.id).unwrap());
    assert!(!journal.delete_companion(gone.id).unwrap());

    assert_eq!(journal.get_visit(v.id).unwrap().unwrap().companion_ids, vec![keep.id]);
    assert_eq!(journal.list_companions().unwrap().len(), 1);
}

#[test]
fn test_store_update_missing_is_not_found() {
    let journal = Journal::in_memory();
    let result = journal
        .store()
        .update::<CompanionData, _>(RecordId(8), &serde_json::json!({"name": "x"}));

    let err = result.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_storage());
}

// --- Corruption ---

#[test]
fn test_corrupt_collection_reads_empty() {
    let backend = MemoryBackend::new().with_entry("visits", b"[{\"id\": \"nope\"}]".to_vec());
    let journal = Journal::with_backend(backend);

    assert!(journal.list_visits().unwrap().is_empty());
    assert_eq!(journal.get_visit_statistics(None).unwrap().total_visits, 0);

    let result = journal.create_visit(VisitData::new(date(), ParkType::Land));
    assert!(result.unwrap_err().is_storage());
}

#[test]
fn test_reorder_unknown_visit_is_invalid() {
    let journal = Journal::in_memory();
    let result = journal.reorder_actions(RecordId(4), 0, 0);
    assert!(matches!(result, Err(JournalError::InvalidOperation(_))));
}
