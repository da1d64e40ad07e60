//! Crawl engine - wires the frontier, politeness, dispatcher and workers
//!
//! One run looks like this:
//! 1. Seeds go into the frontier
//! 2. N workers start, sharing one bounded job queue (capacity `2 * N`)
//! 3. The dispatcher feeds the queue until a stop condition holds
//! 4. Cancellation is broadcast, the queue closes and every worker returns
//! 5. A [`CrawlSummary`] reports what happened

use crate::config::Config;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::metrics::{CrawlMetrics, MetricsSnapshot};
use crate::crawler::stats::report_progress;
use crate::crawler::worker::Worker;
use crate::crawler::{PageFetcher, TraversalStrategy};
use crate::extract::ContentExtractor;
use crate::frontier::{Frontier, VisitedSet};
use crate::politeness::HostPolicyManager;
use crate::robots::RobotsSource;
use crate::storage::PageStore;
use crate::CrawlError;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A URL accepted by the dispatcher, waiting for a worker
#[derive(Debug)]
pub(crate) struct Job {
    pub url: String,
}

/// State shared by the dispatcher and every worker
pub(crate) struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub visited: Arc<VisitedSet>,
    pub metrics: Arc<CrawlMetrics>,
    pub cancel: CancellationToken,
    /// Jobs handed to the queue and not yet finished by a worker
    pub in_flight: AtomicUsize,
    pub max_pages: usize,
    pub token_budget: usize,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The visited set reached the page budget
    BudgetReached,
    /// Nothing queued and nothing in flight
    FrontierExhausted,
    /// The cancellation token was triggered from outside the engine
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BudgetReached => "page budget reached",
            Self::FrontierExhausted => "frontier exhausted",
            Self::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Outcome of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Distinct URLs claimed by workers
    pub pages_crawled: usize,
    /// URLs still waiting in the frontier
    pub queued: usize,
    /// Every enqueue over the run, seeds included
    pub total_enqueued: usize,
    pub hosts_seen: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

/// Engine tuning, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_pages: usize,
    pub workers: usize,
    pub strategy: TraversalStrategy,
    pub token_budget: usize,
    pub requests_per_host: f64,
    /// Product token matched against robots.txt groups
    pub robots_agent: String,
    /// Progress report period; values under 1 ms are raised to 1 ms
    pub stats_interval: Duration,
    /// Pause before polling an empty frontier again
    pub idle_backoff: Duration,
    /// Fixed seed for the mixed-strategy sampler; random when `None`
    pub rng_seed: Option<u64>,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.crawler.max_pages,
            workers: config.crawler.workers,
            strategy: TraversalStrategy::parse(&config.crawler.strategy),
            token_budget: config.crawler.token_budget,
            requests_per_host: config.politeness.requests_per_host,
            robots_agent: config.politeness.robots_token().to_string(),
            stats_interval: config.crawler.stats_interval(),
            ..Self::default()
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            max_pages: config.crawler.max_pages,
            workers: config.crawler.workers,
            strategy: TraversalStrategy::BreadthFirst,
            token_budget: config.crawler.token_budget,
            requests_per_host: config.politeness.requests_per_host,
            robots_agent: config.politeness.robots_token().to_string(),
            stats_interval: config.crawler.stats_interval(),
            idle_backoff: Duration::from_millis(100),
            rng_seed: None,
        }
    }
}

/// The external services a crawl talks to
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub store: Arc<dyn PageStore>,
    pub robots: Arc<dyn RobotsSource>,
}

/// A single crawl run
///
/// Handles to the frontier, visited set, metrics and cancellation token can
/// be taken before [`CrawlEngine::run`] to observe or stop the crawl.
pub struct CrawlEngine {
    settings: EngineSettings,
    collaborators: Collaborators,
    frontier: Arc<Frontier>,
    visited: Arc<VisitedSet>,
    metrics: Arc<CrawlMetrics>,
    cancel: CancellationToken,
}

impl CrawlEngine {
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
            frontier: Arc::new(Frontier::new()),
            visited: Arc::new(VisitedSet::new()),
            metrics: Arc::new(CrawlMetrics::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Adds seed URLs to the frontier
    pub fn seed<I, S>(&self, seeds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for seed in seeds {
            self.frontier.enqueue(seed);
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn frontier(&self) -> Arc<Frontier> {
        Arc::clone(&self.frontier)
    }

    pub fn visited(&self) -> Arc<VisitedSet> {
        Arc::clone(&self.visited)
    }

    pub fn metrics(&self) -> Arc<CrawlMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Token that stops the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl to completion
    ///
    /// Returns once every worker has exited. A panicking worker is reported
    /// as [`CrawlError::Task`] after the remaining workers have finished.
    pub async fn run(self) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        let worker_count = self.settings.workers.max(1);

        tracing::info!(
            "Starting crawl: {} seeds, {} workers, strategy {}, budget {} pages",
            self.frontier.len(),
            worker_count,
            self.settings.strategy,
            self.settings.max_pages
        );

        let ctx = Arc::new(CrawlContext {
            frontier: Arc::clone(&self.frontier),
            visited: Arc::clone(&self.visited),
            metrics: Arc::clone(&self.metrics),
            cancel: self.cancel.clone(),
            in_flight: AtomicUsize::new(0),
            max_pages: self.settings.max_pages,
            token_budget: self.settings.token_budget,
        });

        let hosts = Arc::new(HostPolicyManager::new(
            Arc::clone(&self.collaborators.robots),
            self.settings.robots_agent.clone(),
            self.settings.requests_per_host,
        ));

        let (tx, rx) = mpsc::channel(worker_count * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            let worker = Worker {
                id,
                ctx: Arc::clone(&ctx),
                jobs: Arc::clone(&rx),
                fetcher: Arc::clone(&self.collaborators.fetcher),
                extractor: Arc::clone(&self.collaborators.extractor),
                store: Arc::clone(&self.collaborators.store),
            };
            workers.spawn(worker.run());
        }

        let reporter = tokio::spawn(report_progress(
            Arc::clone(&self.frontier),
            Arc::clone(&self.visited),
            self.settings.stats_interval,
            self.cancel.clone(),
        ));

        let rng = match self.settings.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let dispatcher = Dispatcher {
            ctx: Arc::clone(&ctx),
            hosts: Arc::clone(&hosts),
            strategy: self.settings.strategy,
            jobs: tx,
            rng,
            idle_backoff: self.settings.idle_backoff,
        };
        let stop_reason = dispatcher.run().await;

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                failure.get_or_insert_with(|| e.to_string());
            }
        }

        if let Err(e) = reporter.await {
            tracing::warn!("Progress reporter failed: {}", e);
        }

        if let Some(message) = failure {
            return Err(CrawlError::Task(message));
        }

        let summary = CrawlSummary {
            pages_crawled: self.visited.len(),
            queued: self.frontier.len(),
            total_enqueued: self.frontier.total_enqueued(),
            hosts_seen: hosts.host_count(),
            stop_reason,
            elapsed: started.elapsed(),
            metrics: self.metrics.snapshot(),
        };

        tracing::info!(
            "Crawl finished ({}): {} pages crawled, {} queued, {:?}",
            summary.stop_reason,
            summary.pages_crawled,
            summary.queued,
            summary.elapsed
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractedContent, HtmlExtractor};
    use crate::storage::{NoopStorage, StorageError, StorageResult, WebpageRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use url::Url;

    /// Serves a fixed site map; unknown URLs return an empty body
    #[derive(Default)]
    struct SiteFetcher {
        pages: HashMap<String, String>,
        fetches: StdMutex<Vec<String>>,
        delay: Duration,
    }

    impl SiteFetcher {
        fn page(mut self, url: &str, links: &[&str]) -> Self {
            let anchors: String = links
                .iter()
                .map(|l| format!(r#"<a href="{}">x</a>"#, l))
                .collect();
            self.pages.insert(
                url.to_string(),
                format!("<html><head><title>{}</title></head><body><p>words here</p>{}</body></html>", url, anchors),
            );
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for SiteFetcher {
        async fn fetch_bytes(&self, url: &str) -> Vec<u8> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.fetches.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .map(|body| body.as_bytes().to_vec())
                .unwrap_or_default()
        }
    }

    /// Every page links to `fanout` fresh children
    struct InfiniteExtractor {
        fanout: usize,
        next: AtomicUsize,
    }

    impl ContentExtractor for InfiniteExtractor {
        fn extract(&self, _body: &[u8], _token_budget: usize) -> ExtractedContent {
            ExtractedContent {
                title: "t".to_string(),
                text: "a b".to_string(),
                word_count: 2,
            }
        }

        fn discover_links(&self, _base: &str, _body: &[u8], _budget: usize) -> Vec<String> {
            (0..self.fanout)
                .map(|_| {
                    let n = self.next.fetch_add(1, Ordering::SeqCst);
                    format!("https://gen.test/p{}", n)
                })
                .collect()
        }
    }

    struct AnyBody;

    #[async_trait]
    impl PageFetcher for AnyBody {
        async fn fetch_bytes(&self, _url: &str) -> Vec<u8> {
            b"<html></html>".to_vec()
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        records: StdMutex<Vec<WebpageRecord>>,
    }

    impl PageStore for RecordingStore {
        fn insert(&self, record: &WebpageRecord) -> StorageResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingStore;

    impl PageStore for FailingStore {
        fn insert(&self, _record: &WebpageRecord) -> StorageResult<()> {
            Err(StorageError::Database("disk full".to_string()))
        }
    }

    struct NoRobots;

    #[async_trait]
    impl RobotsSource for NoRobots {
        async fn fetch_robots(&self, _robots_url: &Url) -> Option<String> {
            None
        }
    }

    struct FixedRobots(&'static str);

    #[async_trait]
    impl RobotsSource for FixedRobots {
        async fn fetch_robots(&self, _robots_url: &Url) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn settings(max_pages: usize, workers: usize) -> EngineSettings {
        EngineSettings {
            max_pages,
            workers,
            requests_per_host: 1000.0,
            idle_backoff: Duration::from_millis(5),
            rng_seed: Some(7),
            ..EngineSettings::default()
        }
    }

    fn collaborators(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        store: Arc<dyn PageStore>,
    ) -> Collaborators {
        Collaborators {
            fetcher,
            extractor,
            store,
            robots: Arc::new(NoRobots),
        }
    }

    async fn run_bounded(engine: CrawlEngine) -> CrawlSummary {
        tokio::time::timeout(Duration::from_secs(10), engine.run())
            .await
            .expect("crawl should terminate")
            .expect("crawl should succeed")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_budget_stops_crawl() {
        let store = Arc::new(RecordingStore::default());
        let engine = CrawlEngine::new(
            settings(3, 4),
            collaborators(
                Arc::new(AnyBody),
                Arc::new(InfiniteExtractor {
                    fanout: 5,
                    next: AtomicUsize::new(0),
                }),
                store.clone(),
            ),
        );
        engine.seed(["https://gen.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.stop_reason, StopReason::BudgetReached);
        assert_eq!(summary.pages_crawled, 3);
        assert!(summary.queued > 0);

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 3);
        let mut urls: Vec<_> = records.iter().map(|r| r.url.clone()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 3);
    }

    #[tokio::test]
    async fn test_frontier_exhaustion_stops_crawl() {
        let fetcher = Arc::new(
            SiteFetcher::default()
                .page("https://site.test/", &["/a", "/b"])
                .page("https://site.test/a", &["/", "/b"])
                .page("https://site.test/b", &[]),
        );
        let store = Arc::new(RecordingStore::default());
        let engine = CrawlEngine::new(
            settings(100, 2),
            collaborators(fetcher.clone(), Arc::new(HtmlExtractor::new()), store.clone()),
        );
        engine.seed(["https://site.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
        assert_eq!(summary.pages_crawled, 3);
        assert_eq!(summary.queued, 0);
        assert_eq!(summary.metrics.pages_stored, 3);

        let mut fetched = fetcher.fetched();
        fetched.sort();
        assert_eq!(
            fetched,
            vec![
                "https://site.test/",
                "https://site.test/a",
                "https://site.test/b"
            ]
        );
    }

    #[tokio::test]
    async fn test_each_url_fetched_once() {
        // Many pages linking to the same targets
        let mut fetcher = SiteFetcher::default();
        let targets = ["/t1", "/t2", "/t3"];
        let mut hubs = Vec::new();
        for i in 0..10 {
            hubs.push(format!("/hub{}", i));
        }
        let hub_refs: Vec<&str> = hubs.iter().map(String::as_str).collect();
        fetcher = fetcher.page("https://dup.test/", &hub_refs);
        for hub in &hubs {
            fetcher = fetcher.page(&format!("https://dup.test{}", hub), &targets);
        }
        for target in targets {
            fetcher = fetcher.page(&format!("https://dup.test{}", target), &["/"]);
        }
        let fetcher = Arc::new(fetcher);

        let engine = CrawlEngine::new(
            settings(1000, 8),
            collaborators(
                fetcher.clone(),
                Arc::new(HtmlExtractor::new()),
                Arc::new(NoopStorage),
            ),
        );
        engine.seed(["https://dup.test/"]);

        let summary = run_bounded(engine).await;
        assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
        assert_eq!(summary.pages_crawled, 14);

        let fetched = fetcher.fetched();
        let mut unique = fetched.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(fetched.len(), unique.len(), "a URL was fetched twice");
    }

    #[tokio::test]
    async fn test_empty_bodies_count_as_failures() {
        let fetcher = Arc::new(SiteFetcher::default().page("https://site.test/", &["/missing"]));
        let store = Arc::new(RecordingStore::default());
        let engine = CrawlEngine::new(
            settings(10, 2),
            collaborators(fetcher, Arc::new(HtmlExtractor::new()), store.clone()),
        );
        engine.seed(["https://site.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.pages_crawled, 2);
        assert_eq!(summary.metrics.pages_fetched, 1);
        assert_eq!(summary.metrics.fetch_failures, 1);
        assert_eq!(store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failures_do_not_stop_crawl() {
        let fetcher = Arc::new(
            SiteFetcher::default()
                .page("https://site.test/", &["/a"])
                .page("https://site.test/a", &[]),
        );
        let engine = CrawlEngine::new(
            settings(10, 2),
            collaborators(fetcher, Arc::new(HtmlExtractor::new()), Arc::new(FailingStore)),
        );
        engine.seed(["https://site.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.pages_crawled, 2);
        assert_eq!(summary.metrics.store_failures, 2);
        assert_eq!(summary.metrics.pages_stored, 0);
    }

    #[tokio::test]
    async fn test_invalid_seeds_are_dropped() {
        let fetcher = Arc::new(SiteFetcher::default().page("https://site.test/", &[]));
        let engine = CrawlEngine::new(
            settings(10, 1),
            collaborators(
                fetcher,
                Arc::new(HtmlExtractor::new()),
                Arc::new(NoopStorage),
            ),
        );
        engine.seed(["not a url", "ftp://files.test/x", "https://site.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.pages_crawled, 1);
        assert_eq!(summary.metrics.invalid_urls, 2);
    }

    #[tokio::test]
    async fn test_robots_disallow_is_enforced() {
        let fetcher = Arc::new(
            SiteFetcher::default()
                .page("https://site.test/", &["/private/secret", "/public"])
                .page("https://site.test/private/secret", &[])
                .page("https://site.test/public", &[]),
        );
        let engine = CrawlEngine::new(
            settings(10, 2),
            Collaborators {
                fetcher: fetcher.clone(),
                extractor: Arc::new(HtmlExtractor::new()),
                store: Arc::new(NoopStorage),
                robots: Arc::new(FixedRobots("User-agent: *\nDisallow: /private/")),
            },
        );
        engine.seed(["https://site.test/"]);

        let summary = run_bounded(engine).await;

        assert_eq!(summary.pages_crawled, 2);
        assert_eq!(summary.metrics.robots_denied, 1);
        assert!(!fetcher
            .fetched()
            .contains(&"https://site.test/private/secret".to_string()));
    }

    #[tokio::test]
    async fn test_external_cancellation_interrupts() {
        let engine = CrawlEngine::new(
            settings(1_000_000, 2),
            collaborators(
                Arc::new(AnyBody),
                Arc::new(InfiniteExtractor {
                    fanout: 2,
                    next: AtomicUsize::new(0),
                }),
                Arc::new(NoopStorage),
            ),
        );
        engine.seed(["https://gen.test/"]);
        let token = engine.cancellation_token();

        let handle = tokio::spawn(engine.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("crawl should stop after cancellation")
            .unwrap()
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert!(summary.pages_crawled > 0);
    }

    #[tokio::test]
    async fn test_empty_seed_list_finishes_immediately() {
        let engine = CrawlEngine::new(
            settings(10, 2),
            collaborators(
                Arc::new(AnyBody),
                Arc::new(HtmlExtractor::new()),
                Arc::new(NoopStorage),
            ),
        );

        let summary = run_bounded(engine).await;
        assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
        assert_eq!(summary.pages_crawled, 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.crawler.max_pages = 12;
        config.crawler.workers = 3;
        config.crawler.strategy = "mixed30".to_string();
        config.politeness.user_agent = "MyBot/2.0 (+https://bot.test)".to_string();

        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.max_pages, 12);
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.strategy, TraversalStrategy::Mixed(30));
        assert_eq!(settings.robots_agent, "MyBot");
        assert_eq!(settings.idle_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::BudgetReached.to_string(), "page budget reached");
        assert_eq!(StopReason::FrontierExhausted.to_string(), "frontier exhausted");
    }
}
