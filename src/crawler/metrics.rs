//! In-process crawl counters
//!
//! One [`CrawlMetrics`] is shared by the dispatcher and every worker. Counters
//! are relaxed atomics; a [`MetricsSnapshot`] is a point-in-time copy for
//! reporting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct CrawlMetrics {
    pages_fetched: AtomicU64,
    bytes_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    pages_stored: AtomicU64,
    store_failures: AtomicU64,
    robots_denied: AtomicU64,
    invalid_urls: AtomicU64,
    abandoned_waits: AtomicU64,
    links_discovered: AtomicU64,
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self, bytes: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.pages_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_robots_denied(&self) {
        self.robots_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_url(&self) {
        self.invalid_urls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned_wait(&self) {
        self.abandoned_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links(&self, count: usize) {
        self.links_discovered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            pages_stored: self.pages_stored.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            robots_denied: self.robots_denied.load(Ordering::Relaxed),
            invalid_urls: self.invalid_urls.load(Ordering::Relaxed),
            abandoned_waits: self.abandoned_waits.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Pages that returned a non-empty body
    pub pages_fetched: u64,
    pub bytes_fetched: u64,
    /// Fetches that produced an empty body
    pub fetch_failures: u64,
    pub pages_stored: u64,
    pub store_failures: u64,
    /// Candidates dropped by robots.txt
    pub robots_denied: u64,
    /// Candidates dropped as unparseable or non-http(s)
    pub invalid_urls: u64,
    /// Rate-limit waits cut short by cancellation
    pub abandoned_waits: u64,
    pub links_discovered: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages fetched:      {}", self.pages_fetched)?;
        writeln!(f, "Bytes fetched:      {}", self.bytes_fetched)?;
        writeln!(f, "Fetch failures:     {}", self.fetch_failures)?;
        writeln!(f, "Pages stored:       {}", self.pages_stored)?;
        writeln!(f, "Store failures:     {}", self.store_failures)?;
        writeln!(f, "Links discovered:   {}", self.links_discovered)?;
        writeln!(f, "Robots denials:     {}", self.robots_denied)?;
        writeln!(f, "Invalid URLs:       {}", self.invalid_urls)?;
        write!(f, "Abandoned waits:    {}", self.abandoned_waits)
    }
}
