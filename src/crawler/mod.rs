//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a hard timeout and body cap
//! - The dispatcher loop and traversal strategies
//! - The worker pool
//! - Overall crawl coordination and progress reporting

mod dispatcher;
mod engine;
mod fetcher;
mod metrics;
mod stats;
mod strategy;
mod worker;

pub use engine::{Collaborators, CrawlEngine, CrawlSummary, EngineSettings, StopReason};
pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use metrics::{CrawlMetrics, MetricsSnapshot};
pub use stats::{progress_line, report_progress};
pub use strategy::{PopSide, TraversalStrategy};

use crate::config::Config;
use crate::extract::HtmlExtractor;
use crate::robots::HttpRobotsSource;
use crate::storage::{NoopStorage, PageStore, RunStatus, SqliteStorage};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the page database (or fall back to no-op storage)
/// 2. Record a new run with the configuration hash
/// 3. Build the HTTP fetcher and robots.txt source
/// 4. Crawl from the configured seeds until a stop condition holds
/// 5. Close the run with its final counters
///
/// Ctrl-C cancels the crawl; the run is then recorded as interrupted.
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished
/// * `Err(CrawlError)` - Storage or HTTP client setup failed
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlSummary, CrawlError> {
    let database = match config.output.database_path.as_deref() {
        Some(path) => {
            let storage = Arc::new(SqliteStorage::new(Path::new(path))?);
            let run_id = storage.create_run(config_hash)?;
            tracing::info!("Recording run {} in {}", run_id, path);
            Some((storage, run_id))
        }
        None => {
            tracing::info!("No database configured, crawled pages will not be stored");
            None
        }
    };

    let store: Arc<dyn PageStore> = match &database {
        Some((storage, _)) => storage.clone(),
        None => Arc::new(NoopStorage),
    };

    let user_agent = config.politeness.user_agent.as_str();
    let collaborators = Collaborators {
        fetcher: Arc::new(HttpFetcher::new(
            user_agent,
            config.fetch.timeout(),
            config.fetch.max_body_bytes,
        )?),
        extractor: Arc::new(HtmlExtractor::new()),
        store,
        robots: Arc::new(HttpRobotsSource::new(
            user_agent,
            config.politeness.robots_timeout(),
        )?),
    };

    let engine = CrawlEngine::new(EngineSettings::from_config(&config), collaborators);
    engine.seed(config.crawler.seeds.iter().cloned());

    let cancel = engine.cancellation_token();
    let interrupt = tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => {
                        tracing::warn!("Interrupt received, stopping crawl");
                        cancel.cancel();
                    }
                    Err(e) => tracing::warn!("Cannot listen for Ctrl-C: {}", e),
                }
            }
        }
    });

    let outcome = engine.run().await;
    interrupt.abort();

    if let Some((storage, run_id)) = &database {
        let closed = match &outcome {
            Ok(summary) => {
                let status = match summary.stop_reason {
                    StopReason::Interrupted => RunStatus::Interrupted,
                    StopReason::BudgetReached | StopReason::FrontierExhausted => {
                        RunStatus::Completed
                    }
                };
                storage.finish_run(*run_id, status, summary.pages_crawled, summary.queued)
            }
            Err(_) => storage.finish_run(*run_id, RunStatus::Failed, 0, 0),
        };
        if let Err(e) = closed {
            tracing::warn!("Failed to close run {}: {}", run_id, e);
        }
    }

    outcome
}
