//! Polite Crawler main entry point
//!
//! This is the command-line interface for the crawler.

use anyhow::{Context, Result};
use clap::Parser;
use polite_crawler::config::{hash_content, read_config_with_hash, validate, Config};
use polite_crawler::crawler::{run_crawl, TraversalStrategy};
use polite_crawler::output::{load_statistics, print_statistics, print_summary};
use polite_crawler::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Polite Crawler: a bounded, concurrent web crawler
///
/// Crawls outward from seed URLs up to a page budget, honoring robots.txt
/// and a per-host request rate.
#[derive(Parser, Debug)]
#[command(name = "polite-crawler")]
#[command(version)]
#[command(about = "A bounded, polite web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL (repeatable); replaces the configured seeds
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Stop after this many distinct pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Traversal strategy: bfs, dfs or mixedN
    #[arg(long)]
    strategy: Option<String>,

    /// Requests per second allowed per host
    #[arg(long, value_name = "RPS")]
    max_per_host: Option<f64>,

    /// User agent for fetches and robots.txt matching
    #[arg(long)]
    user_agent: Option<String>,

    /// Seconds to wait for a robots.txt response
    #[arg(long, value_name = "SECS")]
    robots_timeout: Option<u64>,

    /// Cap on tokens examined per page
    #[arg(long)]
    token_budget: Option<usize>,

    /// SQLite database for crawled pages
    #[arg(long, value_name = "PATH")]
    database: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides, returning a description of each
    fn apply_overrides(&self, config: &mut Config) -> Vec<String> {
        let mut applied = Vec::new();

        if !self.seeds.is_empty() {
            config.crawler.seeds = self.seeds.clone();
            applied.push(format!("seeds={}", self.seeds.join(",")));
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
            applied.push(format!("max-pages={}", max_pages));
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
            applied.push(format!("workers={}", workers));
        }
        if let Some(strategy) = &self.strategy {
            config.crawler.strategy = strategy.clone();
            applied.push(format!("strategy={}", strategy));
        }
        if let Some(rps) = self.max_per_host {
            config.politeness.requests_per_host = rps;
            applied.push(format!("requests-per-host={}", rps));
        }
        if let Some(user_agent) = &self.user_agent {
            config.politeness.user_agent = user_agent.clone();
            applied.push(format!("user-agent={}", user_agent));
        }
        if let Some(secs) = self.robots_timeout {
            config.politeness.robots_timeout_secs = secs;
            applied.push(format!("robots-timeout-secs={}", secs));
        }
        if let Some(budget) = self.token_budget {
            config.crawler.token_budget = budget;
            applied.push(format!("token-budget={}", budget));
        }
        if let Some(database) = &self.database {
            config.output.database_path = Some(database.clone());
            applied.push(format!("database-path={}", database));
        }

        applied
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, file_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => (Config::default(), hash_content("")),
    };

    let overrides = cli.apply_overrides(&mut config);

    if cli.stats {
        return handle_stats(&config);
    }

    validate(&config).context("Invalid configuration")?;

    let config_hash = if overrides.is_empty() {
        file_hash
    } else {
        hash_content(&format!("{}\n{}", file_hash, overrides.join("\n")))
    };
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &config_hash, &overrides);
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("polite_crawler=info,warn"),
            1 => EnvFilter::new("polite_crawler=debug,info"),
            2 => EnvFilter::new("polite_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, config_hash: &str, overrides: &[String]) {
    println!("=== Polite Crawler Dry Run ===\n");

    println!("Crawler:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Strategy: {} (from {:?})",
        TraversalStrategy::parse(&config.crawler.strategy),
        config.crawler.strategy
    );
    println!("  Token budget: {}", config.crawler.token_budget);
    println!("  Stats interval: {}s", config.crawler.stats_interval_secs);

    println!("\nPoliteness:");
    println!("  User agent: {}", config.politeness.user_agent);
    println!("  Robots token: {}", config.politeness.robots_token());
    println!(
        "  Requests per host: {}/s",
        config.politeness.requests_per_host
    );
    println!("  Robots timeout: {}s", config.politeness.robots_timeout_secs);

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max body: {} bytes", config.fetch.max_body_bytes);

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: none (pages are not stored)"),
    }

    if !overrides.is_empty() {
        println!("\nCommand-line overrides ({}):", overrides.len());
        for o in overrides {
            println!("  - {}", o);
        }
    }

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid (hash {})", config_hash);
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.crawler.seeds.len()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    let path = config
        .output
        .database_path
        .as_deref()
        .context("--stats needs a database path (database-path or --database)")?;

    println!("Database: {}\n", path);

    let storage = open_storage(Path::new(path))
        .with_context(|| format!("Failed to open database {}", path))?;
    let stats = load_statistics(&storage).context("Failed to read statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<()> {
    tracing::info!(
        "Seeds: {}, budget: {} pages, workers: {}",
        config.crawler.seeds.len(),
        config.crawler.max_pages,
        config.crawler.workers
    );

    let summary = run_crawl(config, config_hash)
        .await
        .context("Crawl failed")?;

    print_summary(&summary);
    Ok(())
}
