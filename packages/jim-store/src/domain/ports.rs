//! Storage Ports (Trait Interface)
//!
//! Application services (walker, reconciler, importer, exporter, search) are
//! generic over these traits. The SQLite adapter implements them twice:
//! - on the store itself (each call is its own transaction)
//! - on a session bound to one open transaction (multi-step mutations)

use super::models::{Entry, EntryPatch, Meta, MetaPatch, NewEntry, NewMeta};
use crate::error::Result;

/// Entry Repository Port
///
/// Every `entry_id` argument is normalized by the implementation, except in
/// the stored-ID methods, which take IDs exactly as a previous query
/// returned them.
pub trait EntryRepository {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn exists_by_id(&self, entry_id: &str) -> Result<bool>;

    fn get_by_id(&self, entry_id: &str) -> Result<Option<Entry>>;

    /// Children of `parent_id` (roots for `None`), ordered by entry ID ascending
    fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>>;

    fn count_children(&self, parent_id: Option<&str>) -> Result<usize>;

    fn count_entries(&self) -> Result<usize>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Stored-ID access (no normalization)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Every stored entry ID, verbatim, ordered by `(type, entry_id)`
    fn list_entry_ids(&self) -> Result<Vec<String>>;

    /// Lookup by the ID byte-for-byte as stored
    fn get_stored_entry(&self, entry_id: &str) -> Result<Option<Entry>>;

    /// Children whose parent column equals `parent_id` byte-for-byte
    fn list_stored_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Mutations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Insert a new entry
    ///
    /// - `Validation`: malformed field or uninferable type
    /// - `DuplicateKey`: ID already stored
    /// - `NotFound`: parent does not exist
    /// - `ConstraintViolation`: self or type-incompatible parent
    fn insert_entry(&self, entry: NewEntry) -> Result<Entry>;

    /// Replace every mutable field of an existing entry
    ///
    /// Same checks as insert, plus cycle and child-compatibility checks.
    /// `NotFound` when the entry is absent.
    fn update_entry(&self, entry: NewEntry) -> Result<Entry>;

    /// Apply a partial update, validated exactly like [`update_entry`](Self::update_entry)
    fn update_entry_fields(&self, entry_id: &str, patch: EntryPatch) -> Result<Entry>;

    /// Delete atomically: metadata removed, children spliced up to the
    /// deleted entry's parent, row removed. Returns the deleted record.
    fn delete_entry(&self, entry_id: &str) -> Result<Entry>;

    /// Delete every listed entry and detach (not splice) their surviving children
    ///
    /// IDs are matched as stored.
    ///
    /// Metadata is left to [`MetaRepository::delete_all_by_entries`].
    fn purge_entries(&self, entry_ids: &[String]) -> Result<usize>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Search
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// IDs of entries whose id/parent/name/note or any metadata name/value
    /// contains `keyword`, ordered by entry ID
    ///
    /// Case folding covers ASCII letters only: `"ÄPFEL"` does not match
    /// `"äpfel"`.
    fn search_entry_ids(&self, keyword: &str) -> Result<Vec<String>>;

    /// IDs of entries carrying a TAG whose name contains `keyword`, with the
    /// same ASCII-only case folding
    fn search_tagged_entry_ids(&self, keyword: &str) -> Result<Vec<String>>;
}

/// Metadata Repository Port, keyed by `(entry_id, name)`
pub trait MetaRepository {
    fn meta_exists(&self, entry_id: &str, name: &str) -> Result<bool>;

    fn get_meta(&self, entry_id: &str, name: &str) -> Result<Option<Meta>>;

    /// Metadata of one owner ordered by `(type, name)`
    fn list_by_entry(&self, entry_id: &str) -> Result<Vec<Meta>>;

    fn count_metadata(&self) -> Result<usize>;

    /// - `ReferentialIntegrity`: owner entry does not exist
    /// - `DuplicateKey`: `(entry_id, name)` already stored
    fn insert_meta(&self, meta: NewMeta) -> Result<Meta>;

    /// `NotFound` when `(entry_id, name)` is absent
    fn update_meta(&self, meta: NewMeta) -> Result<Meta>;

    fn update_meta_fields(&self, entry_id: &str, name: &str, patch: MetaPatch) -> Result<Meta>;

    /// Returns the deleted record; `NotFound` when absent
    fn delete_meta(&self, entry_id: &str, name: &str) -> Result<Meta>;

    fn delete_all_by_entry(&self, entry_id: &str) -> Result<usize>;

    /// Delete the metadata of every listed entry; IDs are matched as stored
    fn delete_all_by_entries(&self, entry_ids: &[String]) -> Result<usize>;
}
