//! Storage module for persisting crawl data
//!
//! This module handles page persistence for the crawler, including:
//! - The [`PageStore`] seam workers write through
//! - SQLite database initialization, run tracking and page queries
//! - A no-op backend for crawls without a database

mod noop;
mod schema;
mod sqlite;
mod traits;

pub use noop::NoopStorage;
pub use sqlite::SqliteStorage;
pub use traits::{PageStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens or creates a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A crawled page handed to storage by a worker
#[derive(Debug, Clone)]
pub struct WebpageRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub crawled_at: DateTime<Utc>,
}

/// A page as read back from the database
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub crawled_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_crawled: Option<usize>,
    pub queued: Option<usize>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
