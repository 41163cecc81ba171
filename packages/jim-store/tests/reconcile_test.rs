//! Orphan repair and file persistence
//!
//! Drift is injected through a second raw connection on the same database
//! file, the way an external tool or a crashed writer would leave it.

mod common;

use common::{exported_ids, fixture_store, insert, raw_connection, tag, FIXTURE_JSON};
use jim_store::{EntryRepository, MetaRepository, SqliteInventoryStore};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn file_store() -> (TempDir, std::path::PathBuf, SqliteInventoryStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("jim.db");
    let store = SqliteInventoryStore::new(&db_path).unwrap();
    (temp_dir, db_path, store)
}

#[test]
fn test_consistent_forest_has_no_orphans() {
    let store = fixture_store();

    let first = store.reconcile().unwrap();
    let second = store.reconcile().unwrap();
    assert_eq!(first.removed, 0);
    assert_eq!(second.removed, 0);
    assert!(first.reported.is_empty());
    assert_eq!(store.count_entries().unwrap(), 4);
}

#[test]
fn test_dangling_parent_is_removed() {
    let (_dir, db_path, store) = file_store();
    store.import_json(FIXTURE_JSON.as_bytes(), false).unwrap();
    insert(&store, "I0002", Some("B001"));
    tag(&store, "I0002", "lost");

    raw_connection(&db_path)
        .execute(
            "UPDATE t_entry SET parent_id = 'B404' WHERE entry_id = 'I0002'",
            [],
        )
        .unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.reported.len(), 1);
    assert_eq!(report.reported[0].entry_id, "I0002");
    assert_eq!(report.reported[0].parent_entry_id.as_deref(), Some("B404"));

    assert!(!store.exists_by_id("I0002").unwrap());
    assert!(store.list_by_entry("I0002").unwrap().is_empty());
    assert_eq!(store.count_metadata().unwrap(), 2);
    assert_eq!(exported_ids(&store), vec!["L0001", "B001", "B002", "I0001"]);

    assert_eq!(store.reconcile().unwrap().removed, 0);
}

#[test]
fn test_non_canonical_orphan_leaves_live_twin_alone() {
    let (_dir, db_path, store) = file_store();
    insert(&store, "L1", None);
    insert(&store, "B1", Some("L1"));
    tag(&store, "B1", "keep_me");

    let raw = raw_connection(&db_path);
    raw.execute(
        "INSERT INTO t_entry (entry_id, entry_type, parent_id, entry_name, note)
         VALUES ('b1', 'BOX', 'GONE', 'stray box', '')",
        [],
    )
    .unwrap();
    raw.execute(
        "INSERT INTO t_metadata (entry_id, meta_name, meta_type, meta_value)
         VALUES ('b1', 'stray', 'TAG', '')",
        [],
    )
    .unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.reported.len(), 1);
    assert_eq!(report.reported[0].entry_id, "b1");
    assert_eq!(report.reported[0].parent_entry_id.as_deref(), Some("GONE"));

    let live = store.list_by_entry("B1").unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].name, "keep_me");
    let stray: i64 = raw
        .query_row(
            "SELECT COUNT(*) FROM t_metadata WHERE entry_id = 'b1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stray, 0);
    assert_eq!(exported_ids(&store), vec!["L1", "B1"]);
}

#[test]
fn test_non_canonical_root_keeps_its_children() {
    let (_dir, db_path, store) = file_store();
    insert(&store, "L1", None);

    let raw = raw_connection(&db_path);
    raw.execute(
        "INSERT INTO t_entry (entry_id, entry_type, parent_id, entry_name, note)
         VALUES ('l2', 'LOCATION', NULL, 'shed', ''),
                ('B9', 'BOX', 'l2', 'crate', '')",
        [],
    )
    .unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(store.count_entries().unwrap(), 3);
}

#[test]
fn test_dangling_subtree_is_removed_whole() {
    let (_dir, db_path, store) = file_store();
    insert(&store, "L1", None);
    insert(&store, "B1", Some("L1"));
    insert(&store, "I1", Some("B1"));
    tag(&store, "B1", "fragile");

    raw_connection(&db_path)
        .execute("DELETE FROM t_entry WHERE entry_id = 'L1'", [])
        .unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(report.removed, 2);
    let reported: Vec<_> = report.reported.iter().map(|e| e.entry_id.as_str()).collect();
    assert_eq!(reported, vec!["B1", "I1"]);
    assert_eq!(store.count_entries().unwrap(), 0);
    assert_eq!(store.count_metadata().unwrap(), 0);
}

#[test]
fn test_cycle_is_removed() {
    let (_dir, db_path, store) = file_store();
    insert(&store, "L1", None);
    insert(&store, "B1", Some("L1"));
    insert(&store, "B2", Some("L1"));
    insert(&store, "I1", Some("B2"));
    insert(&store, "I9", Some("L1"));

    let raw = raw_connection(&db_path);
    raw.execute("UPDATE t_entry SET parent_id = 'B2' WHERE entry_id = 'B1'", [])
        .unwrap();
    raw.execute("UPDATE t_entry SET parent_id = 'B1' WHERE entry_id = 'B2'", [])
        .unwrap();

    let report = store.reconcile().unwrap();
    assert_eq!(report.removed, 3);
    let reported: Vec<_> = report.reported.iter().map(|e| e.entry_id.as_str()).collect();
    assert_eq!(reported, vec!["B1", "B2", "I1"]);
    assert_eq!(exported_ids(&store), vec!["L1", "I9"]);
}

#[test]
fn test_purge_detaches_surviving_children() {
    let store = SqliteInventoryStore::in_memory().unwrap();
    insert(&store, "L1", None);
    insert(&store, "B1", Some("L1"));
    insert(&store, "I1", Some("B1"));

    assert_eq!(store.purge_entries(&["B1".to_string()]).unwrap(), 1);
    assert_eq!(store.get_by_id("I1").unwrap().unwrap().parent_entry_id, None);
}

#[test]
fn test_file_store_persists_across_reopen() {
    let (_dir, db_path, store) = file_store();
    store.import_json(FIXTURE_JSON.as_bytes(), false).unwrap();
    drop(store);

    let reopened = SqliteInventoryStore::new(&db_path).unwrap();
    assert_eq!(exported_ids(&reopened), vec!["L0001", "B001", "B002", "I0001"]);
    assert_eq!(reopened.count_metadata().unwrap(), 2);
}

#[test]
fn test_open_from_config_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = jim_store::DatabaseConfig {
        path: temp_dir.path().join("nested").join("dir").join("app.db"),
        busy_timeout_ms: 1000,
    };

    let store = SqliteInventoryStore::open(&config).unwrap();
    insert(&store, "L1", None);
    assert!(config.path.exists());
}
