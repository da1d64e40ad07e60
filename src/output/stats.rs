//! Statistics from the crawl database
//!
//! This module provides functionality for extracting and displaying the run
//! history recorded by the SQLite backend.

use crate::storage::{RunRecord, SqliteStorage, StorageResult};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Stored crawl statistics
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Pages stored across all runs
    pub total_pages: usize,

    /// Every recorded run, newest first, with its stored page count
    pub runs: Vec<(RunRecord, usize)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The database to query
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<CrawlStatistics> {
    let total_pages = storage.count_pages(None)?;

    let runs = storage
        .list_runs()?
        .into_iter()
        .map(|run| {
            let stored = storage.count_pages(Some(run.id))?;
            Ok((run, stored))
        })
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(CrawlStatistics { total_pages, runs })
}

/// Seconds between a run's start and finish, when both parse
pub fn run_duration_secs(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_deref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Renders statistics as a plain-text report
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "=== Crawl Statistics ===\n");
    let _ = writeln!(out, "Runs recorded: {}", stats.runs.len());
    let _ = writeln!(out, "Pages stored:  {}", stats.total_pages);

    if stats.runs.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\nRuns:");
    for (run, stored) in &stats.runs {
        let duration = run_duration_secs(run)
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "-".to_string());
        let crawled = run
            .pages_crawled
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let queued = run
            .queued
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            out,
            "  #{} {} [{}] crawled={} stored={} queued={} duration={} config={}",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            crawled,
            stored,
            queued,
            duration,
            short_hash(&run.config_hash)
        );
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
