//! Storage traits and error types
//!
//! This module defines the trait interface workers persist pages through and
//! the associated error types.

use crate::storage::WebpageRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("No active run; call create_run first")]
    NoActiveRun,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Sink for crawled pages
///
/// Implementations are shared by every worker and must synchronize
/// internally. Failures are reported to the caller, which logs them and
/// carries on crawling.
pub trait PageStore: Send + Sync {
    /// Persists one crawled page
    fn insert(&self, record: &WebpageRecord) -> StorageResult<()>;
}
