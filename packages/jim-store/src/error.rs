//! Error types for jim-store

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed field (blank id, over-long name, unknown enum name, ...)
    Validation,
    /// Incompatible or self parent, cycle, type change breaking children
    ConstraintViolation,
    /// Targeted entry or metadata does not exist
    NotFound,
    /// Insert on an existing key
    DuplicateKey,
    /// Metadata referencing a missing entry
    ReferentialIntegrity,
    /// Database errors (SQLite)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
    /// Internal errors (poisoned lock, broken invariant)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DuplicateKey => "duplicate_key",
            ErrorKind::ReferentialIntegrity => "referential_integrity",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstraintViolation, message)
    }

    pub fn entry_not_found(entry_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("Entry not found: {}", entry_id.into()),
        )
    }

    pub fn meta_not_found(entry_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!(
                "Entry {} has no metadata named {}",
                entry_id.into(),
                name.into()
            ),
        )
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateKey, message)
    }

    pub fn dangling_owner(entry_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ReferentialIntegrity,
            format!("Metadata owner does not exist: {}", entry_id.into()),
        )
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

// Poisoned connection mutex (Arc<Mutex<Connection>>)
impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_err: std::sync::PoisonError<T>) -> Self {
        StorageError::internal("Connection mutex poisoned")
    }
}

// JSON error conversions
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::new(ErrorKind::IO, format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<crate::config::ConfigError> for StorageError {
    fn from(err: crate::config::ConfigError) -> Self {
        StorageError::new(ErrorKind::Config, err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
