//! Storage Infrastructure Layer

pub mod sqlite;

pub use sqlite::{SqliteInventoryStore, SqliteSession};
