//! SQLite Inventory Store
//!
//! File-based persistent storage using SQLite.
//!
//! One connection is shared behind `Arc<Mutex<_>>`. Every public operation
//! takes the lock, opens a transaction, runs, then commits; any error
//! drops the transaction (rollback) and releases the lock on the way out.

mod session;

pub use session::SqliteSession;

use rusqlite::{Connection, TransactionBehavior};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::application::{
    search_entries, search_tagged_entries, Exporter, Importer, Reconciler, SearchResults,
};
use crate::config::DatabaseConfig;
use crate::domain::models::{
    Entry, EntryPatch, ExportStatistics, ForestRecord, ImportStatistics, Meta, MetaPatch, NewEntry,
    NewMeta, ReconcileReport,
};
use crate::domain::ports::{EntryRepository, MetaRepository};
use crate::error::Result;
use crate::interchange;

/// SQLite-based inventory store
#[derive(Clone)]
pub struct SqliteInventoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteInventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteInventoryStore").finish_non_exhaustive()
    }
}

impl SqliteInventoryStore {
    /// Create a new SQLite store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        debug!(path = %db_path.as_ref().display(), "sqlite database opened");
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open the configured database, creating its directory when missing
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(dir) = config.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        info!(path = %config.path.display(), "inventory database opened");
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock()?;

        // Parenting and ownership are enforced by the session, not by
        // foreign keys; drift has to stay representable for the reconciler.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS t_entry (
                entry_id TEXT PRIMARY KEY,
                entry_type TEXT NOT NULL,
                parent_id TEXT,
                entry_name TEXT NOT NULL,
                note TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_entry_parent ON t_entry(parent_id);
            CREATE TABLE IF NOT EXISTS t_metadata (
                entry_id TEXT NOT NULL,
                meta_name TEXT NOT NULL,
                meta_type TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                PRIMARY KEY (entry_id, meta_name)
            );",
        )?;
        Ok(())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Transaction scopes
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Run `f` in a deferred (read) transaction
    pub fn read<T>(&self, f: impl FnOnce(&SqliteSession<'_>) -> Result<T>) -> Result<T> {
        self.run(TransactionBehavior::Deferred, f)
    }

    /// Run `f` in an immediate (write) transaction; all of `f`'s writes
    /// commit together or not at all
    pub fn write<T>(&self, f: impl FnOnce(&SqliteSession<'_>) -> Result<T>) -> Result<T> {
        self.run(TransactionBehavior::Immediate, f)
    }

    fn run<T>(
        &self,
        behavior: TransactionBehavior,
        f: impl FnOnce(&SqliteSession<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let output = {
            let session = SqliteSession::new(&tx);
            f(&session)?
        };
        tx.commit()?;
        Ok(output)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Forest operations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Lazy BFS-ordered `(Entry, [Meta])` records; one children query per step
    pub fn export_forest(&self) -> Exporter<'_, Self> {
        Exporter::new(self)
    }

    /// Write the reachable forest as a pretty JSON array
    pub fn export_json<W: Write>(&self, writer: W) -> Result<ExportStatistics> {
        interchange::write_forest_json(self.export_forest(), writer)
    }

    /// Import caller-ordered records in one transaction
    pub fn import_forest<I>(&self, records: I, overwrite: bool) -> Result<ImportStatistics>
    where
        I: IntoIterator<Item = ForestRecord>,
    {
        self.write(|session| Importer::new(session, overwrite).import_all(records))
    }

    pub fn import_json<R: Read>(&self, reader: R, overwrite: bool) -> Result<ImportStatistics> {
        let records = interchange::read_forest_json(reader)?;
        self.import_forest(records, overwrite)
    }

    /// Detect and remove orphans; scan and repair share one transaction
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        self.write(|session| Reconciler::new(session).run())
    }

    /// Union of per-keyword matches, each entry re-read when yielded
    pub fn search<S: AsRef<str>>(&self, keywords: &[S]) -> Result<SearchResults<'_, Self>> {
        search_entries(self, keywords)
    }

    pub fn search_tags(&self, keyword: &str) -> Result<SearchResults<'_, Self>> {
        search_tagged_entries(self, keyword)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ports on the store: one transaction per call
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl EntryRepository for SqliteInventoryStore {
    fn exists_by_id(&self, entry_id: &str) -> Result<bool> {
        self.read(|s| s.exists_by_id(entry_id))
    }

    fn get_by_id(&self, entry_id: &str) -> Result<Option<Entry>> {
        self.read(|s| s.get_by_id(entry_id))
    }

    fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>> {
        self.read(|s| s.list_children(parent_id))
    }

    fn count_children(&self, parent_id: Option<&str>) -> Result<usize> {
        self.read(|s| s.count_children(parent_id))
    }

    fn count_entries(&self) -> Result<usize> {
        self.read(|s| s.count_entries())
    }

    fn list_entry_ids(&self) -> Result<Vec<String>> {
        self.read(|s| s.list_entry_ids())
    }

    fn get_stored_entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        self.read(|s| s.get_stored_entry(entry_id))
    }

    fn list_stored_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>> {
        self.read(|s| s.list_stored_children(parent_id))
    }

    fn insert_entry(&self, entry: NewEntry) -> Result<Entry> {
        self.write(|s| s.insert_entry(entry))
    }

    fn update_entry(&self, entry: NewEntry) -> Result<Entry> {
        self.write(|s| s.update_entry(entry))
    }

    fn update_entry_fields(&self, entry_id: &str, patch: EntryPatch) -> Result<Entry> {
        self.write(|s| s.update_entry_fields(entry_id, patch))
    }

    fn delete_entry(&self, entry_id: &str) -> Result<Entry> {
        self.write(|s| s.delete_entry(entry_id))
    }

    fn purge_entries(&self, entry_ids: &[String]) -> Result<usize> {
        self.write(|s| s.purge_entries(entry_ids))
    }

    fn search_entry_ids(&self, keyword: &str) -> Result<Vec<String>> {
        self.read(|s| s.search_entry_ids(keyword))
    }

    fn search_tagged_entry_ids(&self, keyword: &str) -> Result<Vec<String>> {
        self.read(|s| s.search_tagged_entry_ids(keyword))
    }
}

impl MetaRepository for SqliteInventoryStore {
    fn meta_exists(&self, entry_id: &str, name: &str) -> Result<bool> {
        self.read(|s| s.meta_exists(entry_id, name))
    }

    fn get_meta(&self, entry_id: &str, name: &str) -> Result<Option<Meta>> {
        self.read(|s| s.get_meta(entry_id, name))
    }

    fn list_by_entry(&self, entry_id: &str) -> Result<Vec<Meta>> {
        self.read(|s| s.list_by_entry(entry_id))
    }

    fn count_metadata(&self) -> Result<usize> {
        self.read(|s| s.count_metadata())
    }

    fn insert_meta(&self, meta: NewMeta) -> Result<Meta> {
        self.write(|s| s.insert_meta(meta))
    }

    fn update_meta(&self, meta: NewMeta) -> Result<Meta> {
        self.write(|s| s.update_meta(meta))
    }

    fn update_meta_fields(&self, entry_id: &str, name: &str, patch: MetaPatch) -> Result<Meta> {
        self.write(|s| s.update_meta_fields(entry_id, name, patch))
    }

    fn delete_meta(&self, entry_id: &str, name: &str) -> Result<Meta> {
        self.write(|s| s.delete_meta(entry_id, name))
    }

    fn delete_all_by_entry(&self, entry_id: &str) -> Result<usize> {
        self.write(|s| s.delete_all_by_entry(entry_id))
    }

    fn delete_all_by_entries(&self, entry_ids: &[String]) -> Result<usize> {
        self.write(|s| s.delete_all_by_entries(entry_ids))
    }
}
