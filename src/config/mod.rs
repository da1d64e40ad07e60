//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use polite_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will stop after {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, OutputConfig, PolitenessConfig, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_MAX_PAGES, DEFAULT_REQUESTS_PER_HOST, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_content, load_config, parse_config, read_config_with_hash,
};
pub use validation::validate;
