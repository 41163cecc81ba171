//! Shared fixtures for integration tests

#![allow(dead_code)]

use jim_store::{EntryRepository, MetaRepository, NewEntry, NewMeta, SqliteInventoryStore};
use std::path::Path;

/// Four-entry forest: L0001 ⊃ {B001, B002}, B002 ⊃ I0001; TEXT meta on B001, TAG meta on I0001
pub const FIXTURE_JSON: &str = r#"[
  {
    "entryId": "L0001",
    "type": "LOCATION",
    "parentEntryId": null,
    "name": "test location",
    "note": "something for this location\r\nof course\r\n\r\nwith multiple lines!",
    "metadata": []
  },
  {
    "entryId": "B001",
    "type": "BOX",
    "parentEntryId": "L0001",
    "name": "test box #1",
    "note": "something simple",
    "metadata": [
      {
        "name": "a_note",
        "type": "TEXT",
        "value": "A loooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooong note\r\n\r\n\r\nwith\r\n\r\nmul\r\n\r\ntiple\r\n\r\nlines!!!!!"
      }
    ]
  },
  {
    "entryId": "B002",
    "type": "BOX",
    "parentEntryId": "L0001",
    "name": "test box #2",
    "note": "",
    "metadata": []
  },
  {
    "entryId": "I0001",
    "type": "ITEM",
    "parentEntryId": "B002",
    "name": "An item",
    "note": "LOL",
    "metadata": [
      {
        "name": "a_tag",
        "type": "TAG",
        "value": ""
      }
    ]
  }
]"#;

pub fn fixture_store() -> SqliteInventoryStore {
    let store = SqliteInventoryStore::in_memory().unwrap();
    store.import_json(FIXTURE_JSON.as_bytes(), false).unwrap();
    store
}

pub fn export_string(store: &SqliteInventoryStore) -> String {
    let mut out = Vec::new();
    store.export_json(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

pub fn exported_ids(store: &SqliteInventoryStore) -> Vec<String> {
    store
        .export_forest()
        .map(|record| record.unwrap().entry_id)
        .collect()
}

pub fn insert(store: &SqliteInventoryStore, entry_id: &str, parent: Option<&str>) {
    let mut request = NewEntry::new(entry_id).name(format!("{} name", entry_id));
    request.parent_entry_id = parent.map(str::to_string);
    store.insert_entry(request).unwrap();
}

pub fn tag(store: &SqliteInventoryStore, entry_id: &str, name: &str) {
    store.insert_meta(NewMeta::tag(entry_id, name)).unwrap();
}

/// Second connection on the same file, bypassing every store rule
pub fn raw_connection(db_path: &Path) -> rusqlite::Connection {
    rusqlite::Connection::open(db_path).unwrap()
}
