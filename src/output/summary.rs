//! End-of-run summary

use crate::crawler::CrawlSummary;
use std::fmt::Write;

/// Renders the final stats block printed when a crawl ends
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "------- FINAL STATS -------");
    let _ = writeln!(out, "Pages crawled:      {}", summary.pages_crawled);
    let _ = writeln!(out, "URLs queued:        {}", summary.queued);
    let _ = writeln!(out, "Total enqueued:     {}", summary.total_enqueued);
    let _ = writeln!(out, "Hosts seen:         {}", summary.hosts_seen);
    let _ = writeln!(out, "Stop reason:        {}", summary.stop_reason);
    let _ = writeln!(out, "Elapsed:            {:.1}s", summary.elapsed.as_secs_f64());
    let _ = writeln!(out, "{}", summary.metrics);
    let _ = write!(out, "---------------------------");
    out
}

/// Prints the final stats block to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("{}", format_summary(summary));
}
