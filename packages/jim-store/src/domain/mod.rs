//! Inventory Domain Layer
//!
//! Port/Adapter pattern for storage backend abstraction

pub mod models;
pub mod ports;
pub mod rules;

pub use models::{
    Entry, EntryId, EntryPatch, EntryType, ExportStatistics, ForestRecord, ImportStatistics, Meta,
    MetaPatch, MetaRecord, MetaType, NewEntry, NewMeta, ReconcileReport,
};
pub use ports::{EntryRepository, MetaRepository};
pub use rules::normalize_entry_id;
