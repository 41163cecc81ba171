//! Application Layer
//!
//! Services over the storage ports:
//! - `TreeWalker`: lazy BFS, parents before descendants
//! - `Reconciler`: orphan detection and repair
//! - `Exporter` / `Importer`: forest interchange
//! - `search_entries` / `search_tagged_entries`: keyword lookup

mod exporter;
mod importer;
mod reconciler;
mod search;
mod walker;

pub use exporter::Exporter;
pub use importer::Importer;
pub use reconciler::Reconciler;
pub use search::{search_entries, search_tagged_entries, SearchResults};
pub use walker::TreeWalker;
