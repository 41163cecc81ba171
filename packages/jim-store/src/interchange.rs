//! JSON interchange for forest export/import
//!
//! The file is one array of records:
//!
//! ```json
//! [
//!   {
//!     "entryId": "B001",
//!     "type": "BOX",
//!     "parentEntryId": "L0001",
//!     "name": "test box #1",
//!     "note": "",
//!     "metadata": [
//!       {
//!         "name": "a_note",
//!         "type": "TEXT",
//!         "value": "..."
//!       }
//!     ]
//!   }
//! ]
//! ```
//!
//! Export streams records as they are produced; nothing is buffered beyond
//! the writer itself.

use serde::ser::{Error as _, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use tracing::info;

use crate::domain::models::{ExportStatistics, ForestRecord};
use crate::error::{Result, StorageError};

/// Serialize `records` as a pretty-printed (two-space) JSON array
///
/// The first record error stops the export and is returned as-is.
pub fn write_forest_json<I, W>(records: I, mut writer: W) -> Result<ExportStatistics>
where
    I: IntoIterator<Item = Result<ForestRecord>>,
    W: Write,
{
    let forest = ForestSeq::new(records.into_iter());

    if let Err(e) = serde_json::to_writer_pretty(&mut writer, &forest) {
        return Err(match forest.error.take() {
            Some(source) => source,
            None => e.into(),
        });
    }
    writer.flush()?;

    let stats = forest.stats.get();
    info!(entries = stats.entries, metadata = stats.metadata, "forest exported");
    Ok(stats)
}

/// Read a whole JSON array of records, in file order
pub fn read_forest_json<R: Read>(reader: R) -> Result<Vec<ForestRecord>> {
    let records: Vec<ForestRecord> = serde_json::from_reader(reader)?;
    Ok(records)
}

/// Adapts a fallible record iterator to `Serialize`
struct ForestSeq<I> {
    records: RefCell<Option<I>>,
    error: RefCell<Option<StorageError>>,
    stats: Cell<ExportStatistics>,
}

impl<I> ForestSeq<I> {
    fn new(records: I) -> Self {
        Self {
            records: RefCell::new(Some(records)),
            error: RefCell::new(None),
            stats: Cell::new(ExportStatistics::default()),
        }
    }
}

impl<I> Serialize for ForestSeq<I>
where
    I: Iterator<Item = Result<ForestRecord>>,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let records = self
            .records
            .borrow_mut()
            .take()
            .ok_or_else(|| S::Error::custom("forest records already consumed"))?;

        let mut seq = serializer.serialize_seq(None)?;
        let mut stats = ExportStatistics::default();
        for record in records {
            match record {
                Ok(record) => {
                    seq.serialize_element(&record)?;
                    stats.entries += 1;
                    stats.metadata += record.metadata.len() as u64;
                }
                Err(e) => {
                    let message = e.to_string();
                    *self.error.borrow_mut() = Some(e);
                    return Err(S::Error::custom(message));
                }
            }
        }
        self.stats.set(stats);
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EntryType, MetaRecord, MetaType};
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn record(entry_id: &str, entry_type: EntryType, parent: Option<&str>) -> ForestRecord {
        ForestRecord {
            entry_id: entry_id.to_string(),
            entry_type: Some(entry_type),
            parent_entry_id: parent.map(str::to_string),
            name: format!("name of {}", entry_id),
            note: String::new(),
            metadata: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Export
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_export_shape() {
        let mut item = record("I1", EntryType::Item, Some("L1"));
        item.metadata.push(MetaRecord {
            name: "fragile".to_string(),
            meta_type: MetaType::Tag,
            value: String::new(),
        });
        let records: Vec<Result<ForestRecord>> =
            vec![Ok(record("L1", EntryType::Location, None)), Ok(item)];

        let mut out = Vec::new();
        let stats = write_forest_json(records, &mut out).unwrap();

        let expected = r#"[
  {
    "entryId": "L1",
    "type": "LOCATION",
    "parentEntryId": null,
    "name": "name of L1",
    "note": "",
    "metadata": []
  },
  {
    "entryId": "I1",
    "type": "ITEM",
    "parentEntryId": "L1",
    "name": "name of I1",
    "note": "",
    "metadata": [
      {
        "name": "fragile",
        "type": "TAG",
        "value": ""
      }
    ]
  }
]"#;
        assert_eq!(String::from_utf8(out).unwrap(), expected);
        assert_eq!(stats, ExportStatistics { entries: 2, metadata: 1 });
    }

    #[test]
    fn test_export_empty_forest() {
        let mut out = Vec::new();
        let stats = write_forest_json(Vec::<Result<ForestRecord>>::new(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]");
        assert_eq!(stats, ExportStatistics::default());
    }

    #[test]
    fn test_export_surfaces_record_error() {
        let records = vec![
            Ok(record("L1", EntryType::Location, None)),
            Err(StorageError::database("disk went away")),
            Ok(record("L2", EntryType::Location, None)),
        ];

        let err = write_forest_json(records, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
        assert!(err.message.contains("disk went away"));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Import
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_read_minimal_records() {
        let json = r#"[
            {"entryId": "b7", "parentEntryId": null, "name": "box"},
            {"entryId": "I9", "type": "ITEM", "parentEntryId": "B7",
             "metadata": [{"name": "t", "type": "TAG"}]}
        ]"#;

        let records = read_forest_json(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entry_type, None);
        assert_eq!(records[0].note, "");
        assert_eq!(records[1].parent_entry_id.as_deref(), Some("B7"));
        assert_eq!(records[1].metadata[0].value, "");
    }

    #[test]
    fn test_read_rejects_unknown_type() {
        let json = r#"[{"entryId": "X1", "type": "SHELF"}]"#;
        let err = read_forest_json(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
