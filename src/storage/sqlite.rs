//! SQLite storage implementation
//!
//! This module provides the SQLite-backed [`PageStore`], plus run bookkeeping
//! and the read queries used by `--stats`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredPage, WebpageRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct SqliteState {
    conn: Connection,
    current_run: Option<i64>,
}

/// SQLite storage backend
///
/// The connection sits behind a mutex so one instance can be shared by every
/// worker. Pages are tagged with the run opened by [`SqliteStorage::create_run`].
pub struct SqliteStorage {
    state: Mutex<SqliteState>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or apply the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            state: Mutex::new(SqliteState {
                conn,
                current_run: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SqliteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Run Management =====

    /// Starts a new run; subsequent inserts are attributed to it
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    pub fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let mut state = self.lock();
        let now = Utc::now().to_rfc3339();
        state.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = state.conn.last_insert_rowid();
        state.current_run = Some(run_id);
        Ok(run_id)
    }

    /// Returns the run pages are currently attributed to
    pub fn current_run(&self) -> Option<i64> {
        self.lock().current_run
    }

    /// Closes a run with its final status and counters
    pub fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: usize,
        queued: usize,
    ) -> StorageResult<()> {
        let state = self.lock();
        let now = Utc::now().to_rfc3339();
        let updated = state.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_crawled = ?3, queued = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                pages_crawled as i64,
                queued as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Lists every run, newest first
    pub fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let state = self.lock();
        let mut stmt = state.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, pages_crawled, queued
             FROM runs ORDER BY id DESC",
        )?;

        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Page Queries =====

    /// Counts stored pages, for one run or across all runs
    pub fn count_pages(&self, run_id: Option<i64>) -> StorageResult<usize> {
        let state = self.lock();
        let count: i64 = match run_id {
            Some(id) => state.conn.query_row(
                "SELECT COUNT(*) FROM pages WHERE run_id = ?1",
                params![id],
                |row| row.get(0),
            )?,
            None => state
                .conn
                .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    /// Gets the most recently stored copy of a page
    pub fn get_page_by_url(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        let state = self.lock();
        let page = state
            .conn
            .query_row(
                "SELECT id, run_id, url, title, content, word_count, crawled_at
                 FROM pages WHERE url = ?1 ORDER BY run_id DESC LIMIT 1",
                params![url],
                |row| {
                    Ok(StoredPage {
                        id: row.get(0)?,
                        run_id: row.get(1)?,
                        url: row.get(2)?,
                        title: row.get(3)?,
                        content: row.get(4)?,
                        word_count: row.get::<_, i64>(5)? as usize,
                        crawled_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(page)
    }
}

impl PageStore for SqliteStorage {
    fn insert(&self, record: &WebpageRecord) -> StorageResult<()> {
        let state = self.lock();
        let run_id = state.current_run.ok_or(StorageError::NoActiveRun)?;

        let inserted = state.conn.execute(
            "INSERT OR IGNORE INTO pages (run_id, url, title, content, word_count, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                record.url,
                record.title,
                record.content,
                record.word_count as i64,
                record.crawled_at.to_rfc3339()
            ],
        )?;

        if inserted == 0 {
            tracing::trace!("Page {} already stored for run {}", record.url, run_id);
        }
        Ok(())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        pages_crawled: row.get::<_, Option<i64>>(5)?.map(|n| n as usize),
        queued: row.get::<_, Option<i64>>(6)?.map(|n| n as usize),
    })
}
