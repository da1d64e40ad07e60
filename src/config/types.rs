use serde::Deserialize;
use std::time::Duration;

/// Default page budget when none is configured
pub const DEFAULT_MAX_PAGES: usize = 5000;

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 32;

/// Default per-host request rate (requests per second)
pub const DEFAULT_REQUESTS_PER_HOST: f64 = 2.0;

/// Default identity string for fetches and robots matching
pub const DEFAULT_USER_AGENT: &str = "PoliteCrawler/0.1";

/// Default hard cap on a fetched body (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl scope and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Initial frontier contents
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Stop once this many distinct URLs have been visited
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Traversal strategy: `bfs`, `dfs` or `mixedN`
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Cap on tokens examined per page during extraction and link discovery
    #[serde(rename = "token-budget", default = "default_token_budget")]
    pub token_budget: usize,

    /// Seconds between progress reports
    #[serde(rename = "stats-interval-secs", default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

/// Robots and rate-limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Token-bucket refill rate (and burst) per host
    #[serde(rename = "requests-per-host", default = "default_requests_per_host")]
    pub requests_per_host: f64,

    /// Bound on the robots.txt fetch (seconds)
    #[serde(rename = "robots-timeout-secs", default = "default_robots_timeout")]
    pub robots_timeout_secs: u64,

    /// Identity string used for page fetches and robots rule matching
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Page fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Hard timeout on a page fetch (seconds)
    #[serde(rename = "timeout-secs", default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of body bytes read per page
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file; pages are discarded when unset
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            max_pages: default_max_pages(),
            workers: default_workers(),
            strategy: default_strategy(),
            token_budget: default_token_budget(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

impl CrawlerConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            requests_per_host: default_requests_per_host(),
            robots_timeout_secs: default_robots_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl PolitenessConfig {
    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    /// Returns the product token robots.txt groups are matched against
    ///
    /// `PoliteCrawler/0.1 (+https://example.com)` matches `User-agent: PoliteCrawler`.
    pub fn robots_token(&self) -> &str {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or_default()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_strategy() -> String {
    "bfs".to_string()
}

fn default_token_budget() -> usize {
    10_000
}

fn default_stats_interval() -> u64 {
    60
}

fn default_requests_per_host() -> f64 {
    DEFAULT_REQUESTS_PER_HOST
}

fn default_robots_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
