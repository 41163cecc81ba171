//! jim-store: storage and consistency engine for a physical inventory
//!
//! Entries form a forest (LOCATION ⊃ BOX ⊃ ITEM) keyed by barcode-like IDs,
//! each carrying typed metadata (TAG / TEXT).
//!
//! ## Core Rules
//!
//! 1. **Canonical IDs**: every key is uppercased at the store boundary
//! 2. **Parent compatibility**: LOCATION under LOCATION; BOX and ITEM under LOCATION or BOX
//! 3. **Atomic mutations**: delete (splice-up), import batch and orphan repair
//!    each run in one transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jim_store::{EntryRepository, NewEntry, SqliteInventoryStore};
//!
//! let store = SqliteInventoryStore::in_memory()?;
//! store.insert_entry(NewEntry::new("l0001").name("garage"))?;
//! store.insert_entry(NewEntry::new("B001").parent("L0001").name("tools"))?;
//!
//! // BFS export, parents before children
//! let stats = store.export_json(std::io::stdout())?;
//!
//! // Drop anything unreachable from a root
//! let report = store.reconcile()?;
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod interchange;

#[cfg(feature = "sqlite")]
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use application::{Exporter, Importer, Reconciler, SearchResults, TreeWalker};
pub use config::{ConfigError, DatabaseConfig, JimConfig};
pub use domain::{
    normalize_entry_id, Entry, EntryPatch, EntryRepository, EntryType, ExportStatistics,
    ForestRecord, ImportStatistics, Meta, MetaPatch, MetaRecord, MetaRepository, MetaType,
    NewEntry, NewMeta, ReconcileReport,
};

#[cfg(feature = "sqlite")]
pub use infrastructure::{SqliteInventoryStore, SqliteSession};
