use shared::{domain::Record, persisted::PersistedRecord};
use storage::{FileStore, KeyValueStore, LoadOutcome, StateStore, STORAGE_KEY};

#[test]
fn browser_written_blob_is_restored_from_disk() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backend = FileStore::new(temp.path());
    backend
        .set(
            STORAGE_KEY,
            r#"{"version":3,"month":"April","ssRate":10000,
                "workers":[{"name":"A","expenses":0},{"name":"B","expenses":0}],
                "companies":["A","B"],
                "hours":{"0":{"0":100,"1":0},"1":{"0":0,"1":50}}}"#,
        )
        .expect("seed");

    let store = StateStore::new(backend);
    let loaded = store.load_with_outcome();
    assert_eq!(loaded.outcome, LoadOutcome::Restored);
    assert_eq!(loaded.record.worker_count(), 2);
    assert_eq!(loaded.record.hours(0, 0), 100.0);
    assert_eq!(loaded.record.hours(1, 1), 50.0);

    let persisted = PersistedRecord::from(&loaded.record);
    assert_eq!(persisted.version, Some(3));
    assert_eq!(persisted.hours[&1][&1], 50.0);
}

#[test]
fn outdated_blob_on_disk_is_replaced_by_defaults_after_next_save() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backend = FileStore::new(temp.path());
    backend
        .set(STORAGE_KEY, r#"{"version":1,"workers":[{"name":"stale"}]}"#)
        .expect("seed");

    let store = StateStore::new(backend.clone());
    let record = store.load();
    assert_eq!(record, Record::default());
    assert_eq!(backend.get(STORAGE_KEY).expect("get"), None);

    store.save(&record).expect("save");
    assert_eq!(store.load_with_outcome().outcome, LoadOutcome::Restored);
}
