//! Output module for crawl reports
//!
//! This module handles:
//! - The final stats block printed when a crawl ends
//! - Run history read back from the crawl database

pub mod stats;
mod summary;

pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
pub use summary::{format_summary, print_summary};
