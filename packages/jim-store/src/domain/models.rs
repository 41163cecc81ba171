//! Inventory Domain Models
//!
//! Two record families:
//! - Stored records (`Entry`, `Meta`) returned by reads
//! - Mutation requests (`NewEntry`, `EntryPatch`, `NewMeta`, `MetaPatch`)
//!
//! Reads never hand out something that can be written back by accident;
//! every write goes through an explicit request type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

/// Entry ID, normally the barcode on the thing (e.g. `"L0001"`, `"B002"`)
pub type EntryId = String;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Enumerations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Kind of a hierarchy node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// A physical place (house, room, shelf)
    Location,
    /// A container holding other boxes or items
    Box,
    /// The smallest unit
    Item,
}

impl EntryType {
    pub const ALL: [EntryType; 3] = [EntryType::Location, EntryType::Box, EntryType::Item];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Location => "LOCATION",
            EntryType::Box => "BOX",
            EntryType::Item => "ITEM",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOCATION" => Ok(EntryType::Location),
            "BOX" => Ok(EntryType::Box),
            "ITEM" => Ok(EntryType::Item),
            other => Err(StorageError::validation(format!(
                "Unknown entry type: {}",
                other
            ))),
        }
    }
}

/// Type of a metadata value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaType {
    /// Presence-only attribute (`fragile`, `lithium_battery`); value is ignored
    Tag,
    /// Free text
    Text,
}

impl MetaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaType::Tag => "TAG",
            MetaType::Text => "TEXT",
        }
    }

    /// Whether the value column carries information for this type
    pub fn needs_value(&self) -> bool {
        match self {
            MetaType::Tag => false,
            MetaType::Text => true,
        }
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetaType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TAG" => Ok(MetaType::Tag),
            "TEXT" => Ok(MetaType::Text),
            other => Err(StorageError::validation(format!(
                "Unknown metadata type: {}",
                other
            ))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stored records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Entry Entity (location, box or item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Canonical (uppercase) ID, primary key
    pub entry_id: EntryId,

    pub entry_type: EntryType,

    /// Parent entry, `None` for roots
    pub parent_entry_id: Option<EntryId>,

    /// Short name, at most 2048 chars
    pub name: String,

    /// Detailed description
    pub note: String,
}

/// Meta Entity, keyed by `(entry_id, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Owning entry
    pub entry_id: EntryId,

    pub name: String,

    pub meta_type: MetaType,

    /// Always empty when `meta_type` does not need a value
    pub value: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mutation requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Full entry write request (insert, or full replace on update)
///
/// IDs may be given in any case; they are normalized at the store boundary.
/// When `entry_type` is `None` it is inferred from the first character of the ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub entry_id: String,
    pub entry_type: Option<EntryType>,
    pub parent_entry_id: Option<String>,
    pub name: String,
    pub note: String,
}

impl NewEntry {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            ..Default::default()
        }
    }

    pub fn entry_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn parent(mut self, parent_entry_id: impl Into<String>) -> Self {
        self.parent_entry_id = Some(parent_entry_id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

impl From<Entry> for NewEntry {
    fn from(entry: Entry) -> Self {
        Self {
            entry_id: entry.entry_id,
            entry_type: Some(entry.entry_type),
            parent_entry_id: entry.parent_entry_id,
            name: entry.name,
            note: entry.note,
        }
    }
}

/// Partial entry update: only `Some` fields are written
///
/// `parent_entry_id: Some(None)` detaches the entry to the root level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub entry_type: Option<EntryType>,
    pub parent_entry_id: Option<Option<String>>,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.entry_type.is_none()
            && self.parent_entry_id.is_none()
            && self.name.is_none()
            && self.note.is_none()
    }

    /// Merge onto a stored record, producing a full write request
    pub fn apply_to(self, stored: Entry) -> NewEntry {
        NewEntry {
            entry_id: stored.entry_id,
            entry_type: Some(self.entry_type.unwrap_or(stored.entry_type)),
            parent_entry_id: self.parent_entry_id.unwrap_or(stored.parent_entry_id),
            name: self.name.unwrap_or(stored.name),
            note: self.note.unwrap_or(stored.note),
        }
    }
}

/// Full metadata write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeta {
    pub entry_id: String,
    pub name: String,
    pub meta_type: MetaType,
    pub value: String,
}

impl NewMeta {
    pub fn tag(entry_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            name: name.into(),
            meta_type: MetaType::Tag,
            value: String::new(),
        }
    }

    pub fn text(
        entry_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            name: name.into(),
            meta_type: MetaType::Text,
            value: value.into(),
        }
    }
}

impl From<Meta> for NewMeta {
    fn from(meta: Meta) -> Self {
        Self {
            entry_id: meta.entry_id,
            name: meta.name,
            meta_type: meta.meta_type,
            value: meta.value,
        }
    }
}

/// Partial metadata update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaPatch {
    pub meta_type: Option<MetaType>,
    pub value: Option<String>,
}

impl MetaPatch {
    pub fn apply_to(self, stored: Meta) -> NewMeta {
        NewMeta {
            entry_id: stored.entry_id,
            name: stored.name,
            meta_type: self.meta_type.unwrap_or(stored.meta_type),
            value: self.value.unwrap_or(stored.value),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interchange records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One serialized forest record: an entry plus its metadata
///
/// Shape: `{entryId, type, parentEntryId, name, note, metadata: [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestRecord {
    pub entry_id: String,

    /// Optional on input; inferred from `entry_id` when absent
    #[serde(rename = "type", default)]
    pub entry_type: Option<EntryType>,

    #[serde(default)]
    pub parent_entry_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub note: String,

    #[serde(default)]
    pub metadata: Vec<MetaRecord>,
}

/// Metadata inside a [`ForestRecord`]; the owner is the enclosing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub meta_type: MetaType,

    #[serde(default)]
    pub value: String,
}

impl ForestRecord {
    pub fn from_parts(entry: Entry, metadata: Vec<Meta>) -> Self {
        Self {
            entry_id: entry.entry_id,
            entry_type: Some(entry.entry_type),
            parent_entry_id: entry.parent_entry_id,
            name: entry.name,
            note: entry.note,
            metadata: metadata
                .into_iter()
                .map(|m| MetaRecord {
                    name: m.name,
                    meta_type: m.meta_type,
                    value: m.value,
                })
                .collect(),
        }
    }

    /// Split into write requests: the entry, then its metadata
    pub fn into_requests(self) -> (NewEntry, Vec<NewMeta>) {
        let metas = self
            .metadata
            .into_iter()
            .map(|m| NewMeta {
                entry_id: self.entry_id.clone(),
                name: m.name,
                meta_type: m.meta_type,
                value: m.value,
            })
            .collect();

        let entry = NewEntry {
            entry_id: self.entry_id,
            entry_type: self.entry_type,
            parent_entry_id: self.parent_entry_id,
            name: self.name,
            note: self.note,
        };

        (entry, metas)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Operation reports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Import Result
///
/// `*_imported` counts every processed record, including skipped ones;
/// `*_overwritten` is the subset that replaced a differing stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStatistics {
    pub entries_imported: u64,
    pub entries_overwritten: u64,
    pub entries_skipped: u64,
    pub metadata_imported: u64,
    pub metadata_overwritten: u64,
    pub metadata_skipped: u64,
}

/// Export Result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStatistics {
    pub entries: u64,
    pub metadata: u64,
}

/// Orphan repair result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of orphan entries deleted
    pub removed: usize,

    /// Orphans that could be fetched for display, in `(type, entry_id)` order
    pub reported: Vec<Entry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parse_is_case_insensitive() {
        assert_eq!("box".parse::<EntryType>().unwrap(), EntryType::Box);
        assert_eq!("Location".parse::<EntryType>().unwrap(), EntryType::Location);
        let err = "shelf".parse::<EntryType>().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_meta_type_needs_value() {
        assert!(!MetaType::Tag.needs_value());
        assert!(MetaType::Text.needs_value());
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let stored = Entry {
            entry_id: "B001".to_string(),
            entry_type: EntryType::Box,
            parent_entry_id: Some("L0001".to_string()),
            name: "box".to_string(),
            note: "blue".to_string(),
        };

        let patch = EntryPatch {
            note: Some("red".to_string()),
            ..Default::default()
        };
        let request = patch.apply_to(stored);

        assert_eq!(request.entry_type, Some(EntryType::Box));
        assert_eq!(request.parent_entry_id.as_deref(), Some("L0001"));
        assert_eq!(request.name, "box");
        assert_eq!(request.note, "red");
    }

    #[test]
    fn test_patch_can_detach_parent() {
        let stored = Entry {
            entry_id: "B001".to_string(),
            entry_type: EntryType::Box,
            parent_entry_id: Some("L0001".to_string()),
            name: String::new(),
            note: String::new(),
        };

        let patch = EntryPatch {
            parent_entry_id: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(patch.apply_to(stored).parent_entry_id, None);
    }

    #[test]
    fn test_forest_record_into_requests() {
        let record = ForestRecord {
            entry_id: "I0001".to_string(),
            entry_type: None,
            parent_entry_id: Some("B002".to_string()),
            name: "An item".to_string(),
            note: String::new(),
            metadata: vec![MetaRecord {
                name: "a_tag".to_string(),
                meta_type: MetaType::Tag,
                value: String::new(),
            }],
        };

        let (entry, metas) = record.into_requests();
        assert_eq!(entry.entry_id, "I0001");
        assert_eq!(entry.entry_type, None);
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].entry_id, "I0001");
        assert_eq!(metas[0].meta_type, MetaType::Tag);
    }
}
