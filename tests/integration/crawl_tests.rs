//! Integration tests for the crawler
//!
//! These tests drive full crawl runs, first against in-process mock
//! collaborators and then against wiremock HTTP servers.

use async_trait::async_trait;
use polite_crawler::crawler::{
    Collaborators, CrawlEngine, EngineSettings, HttpFetcher, PageFetcher, StopReason,
    TraversalStrategy,
};
use polite_crawler::extract::{ContentExtractor, ExtractedContent, HtmlExtractor};
use polite_crawler::robots::{HttpRobotsSource, RobotsSource};
use polite_crawler::storage::{
    NoopStorage, PageStore, SqliteStorage, StorageResult, WebpageRecord,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===== Mock collaborators =====

struct StaticBody;

#[async_trait]
impl PageFetcher for StaticBody {
    async fn fetch_bytes(&self, _url: &str) -> Vec<u8> {
        b"<html><body>mock</body></html>".to_vec()
    }
}

/// Yields five never-seen links for every page
#[derive(Default)]
struct FanOutExtractor {
    counter: AtomicUsize,
}

impl ContentExtractor for FanOutExtractor {
    fn extract(&self, _body: &[u8], _token_budget: usize) -> ExtractedContent {
        ExtractedContent {
            title: "mock".to_string(),
            text: "mock".to_string(),
            word_count: 1,
        }
    }

    fn discover_links(&self, _base_url: &str, _body: &[u8], _budget: usize) -> Vec<String> {
        (0..5)
            .map(|_| {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                format!("https://mock.test/page/{}", n)
            })
            .collect()
    }
}

#[derive(Default)]
struct RecordingStore {
    records: Mutex<Vec<WebpageRecord>>,
}

impl PageStore for RecordingStore {
    fn insert(&self, record: &WebpageRecord) -> StorageResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct NoRobots;

#[async_trait]
impl RobotsSource for NoRobots {
    async fn fetch_robots(&self, _robots_url: &Url) -> Option<String> {
        None
    }
}

fn test_settings(max_pages: usize, workers: usize, requests_per_host: f64) -> EngineSettings {
    EngineSettings {
        max_pages,
        workers,
        strategy: TraversalStrategy::BreadthFirst,
        requests_per_host,
        robots_agent: "TestBot".to_string(),
        idle_backoff: Duration::from_millis(10),
        ..EngineSettings::default()
    }
}

fn http_collaborators(store: Arc<dyn PageStore>) -> Collaborators {
    Collaborators {
        fetcher: Arc::new(
            HttpFetcher::new("TestBot/1.0", Duration::from_secs(5), 1 << 20).unwrap(),
        ),
        extractor: Arc::new(HtmlExtractor::new()),
        store,
        robots: Arc::new(HttpRobotsSource::new("TestBot/1.0", Duration::from_secs(2)).unwrap()),
    }
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body><p>Content of {}</p>{}</body></html>",
        title, title, anchors
    );
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn page_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p != "/robots.txt")
        .collect()
}

// ===== Mock backend =====

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_budget_bounded_crawl_with_mock_backend() {
    let store = Arc::new(RecordingStore::default());
    let engine = CrawlEngine::new(
        test_settings(3, 4, 1000.0),
        Collaborators {
            fetcher: Arc::new(StaticBody),
            extractor: Arc::new(FanOutExtractor::default()),
            store: store.clone(),
            robots: Arc::new(NoRobots),
        },
    );
    engine.seed(["https://mock.test/"]);
    let visited = engine.visited();
    let frontier = engine.frontier();

    let summary = tokio::time::timeout(Duration::from_secs(10), engine.run())
        .await
        .expect("crawl should stop at the page budget")
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::BudgetReached);
    assert_eq!(visited.len(), 3);
    assert_eq!(summary.pages_crawled, 3);

    let records = store.records.lock().unwrap();
    let stored: HashSet<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(stored.len(), 3);
    assert!(stored.contains("https://mock.test/"));

    assert!(!frontier.is_empty());
    assert_eq!(summary.queued, frontier.len());
}

// ===== Real HTTP =====

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /admin").await;
    mount_page(&server, "/", "Home", &["/page1", "/page2", "/admin/panel"]).await;
    mount_page(&server, "/page1", "Page 1", &["/", "/page2#section"]).await;
    mount_page(&server, "/page2", "Page 2", &["mailto:someone@example.com"]).await;
    Mock::given(method("GET"))
        .and(path("/admin/panel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let run_id = storage.create_run("integration").unwrap();

    let engine = CrawlEngine::new(test_settings(50, 3, 100.0), http_collaborators(storage.clone()));
    engine.seed([format!("{}/", base)]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.pages_crawled, 3);
    assert_eq!(summary.metrics.robots_denied, 1);
    assert_eq!(storage.count_pages(Some(run_id)).unwrap(), 3);

    let page1 = storage
        .get_page_by_url(&format!("{}/page1", base))
        .unwrap()
        .expect("page1 should be stored");
    assert_eq!(page1.title, "Page 1");
    assert_eq!(page1.content, "Content of Page 1");
    assert_eq!(page1.word_count, 4);

    let mut requested = page_requests(&server).await;
    requested.sort();
    assert_eq!(requested, vec!["/", "/page1", "/page2"]);
}

#[tokio::test]
async fn test_http_crawl_respects_page_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // A long chain: /0 -> /1 -> ... -> /19
    for i in 0..20 {
        let route = format!("/{}", i);
        let next = format!("/{}", i + 1);
        mount_page(&server, &route, &format!("Chain {}", i), &[next.as_str()]).await;
    }

    let engine = CrawlEngine::new(
        test_settings(4, 2, 100.0),
        http_collaborators(Arc::new(NoopStorage)),
    );
    engine.seed([format!("{}/0", server.uri())]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::BudgetReached);
    assert_eq!(summary.pages_crawled, 4);
    assert!(page_requests(&server).await.len() <= 4);
}

#[tokio::test]
async fn test_per_host_rate_limit_paces_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let leaves: Vec<String> = (0..7).map(|i| format!("/leaf{}", i)).collect();
    let leaf_refs: Vec<&str> = leaves.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Hub", &leaf_refs).await;
    for leaf in &leaves {
        mount_page(&server, leaf, leaf, &[]).await;
    }

    // 4 rps with a burst of 4: 8 requests need at least ~1s.
    let engine = CrawlEngine::new(
        test_settings(100, 4, 4.0),
        http_collaborators(Arc::new(NoopStorage)),
    );
    engine.seed([format!("{}/", server.uri())]);

    let started = Instant::now();
    let summary = engine.run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.pages_crawled, 8);
    assert!(
        elapsed >= Duration::from_millis(900),
        "8 requests at 4 rps finished in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_robots_failure_allows_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", "Home", &["/private/x"]).await;
    mount_page(&server, "/private/x", "Private", &[]).await;

    let engine = CrawlEngine::new(
        test_settings(10, 2, 100.0),
        http_collaborators(Arc::new(NoopStorage)),
    );
    engine.seed([format!("{}/", server.uri())]);

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.metrics.robots_denied, 0);
}

#[tokio::test]
async fn test_failed_pages_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/", "Home", &["/gone", "/ok"]).await;
    mount_page(&server, "/ok", "Ok", &[]).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let engine = CrawlEngine::new(test_settings(10, 2, 100.0), http_collaborators(store.clone()));
    engine.seed([format!("{}/", server.uri())]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.pages_crawled, 3);
    assert_eq!(summary.metrics.fetch_failures, 1);

    let stored: Vec<String> = store
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.clone())
        .collect();
    assert_eq!(stored.len(), 2);
    assert!(!stored.iter().any(|u| u.ends_with("/gone")));
}

#[tokio::test]
async fn test_mixed_strategy_crawls_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/", "Root", &["/a", "/b", "/c"]).await;
    mount_page(&server, "/a", "A", &["/a/1", "/a/2"]).await;
    mount_page(&server, "/b", "B", &["/b/1"]).await;
    mount_page(&server, "/c", "C", &[]).await;
    mount_page(&server, "/a/1", "A1", &["/"]).await;
    mount_page(&server, "/a/2", "A2", &[]).await;
    mount_page(&server, "/b/1", "B1", &["/a"]).await;

    let engine = CrawlEngine::new(
        EngineSettings {
            strategy: TraversalStrategy::parse("mixed50"),
            rng_seed: Some(11),
            ..test_settings(100, 3, 100.0)
        },
        http_collaborators(Arc::new(NoopStorage)),
    );
    engine.seed([format!("{}/", server.uri())]);

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.pages_crawled, 7);

    let requested = page_requests(&server).await;
    let unique: HashSet<_> = requested.iter().collect();
    assert_eq!(requested.len(), unique.len());
}

#[tokio::test]
async fn test_cancellation_stops_http_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // Every page is slow and links onward, so the crawl never ends on its own.
    for i in 0..50 {
        Mock::given(method("GET"))
            .and(path(format!("/{}", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"<a href="/{}">next</a>"#, i + 1))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
    }

    let engine = CrawlEngine::new(
        test_settings(1000, 2, 100.0),
        http_collaborators(Arc::new(NoopStorage)),
    );
    engine.seed([format!("{}/0", server.uri())]);
    let token = engine.cancellation_token();

    let handle = tokio::spawn(engine.run());
    tokio::time::sleep(Duration::from_millis(350)).await;
    token.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("crawl should stop after cancellation")
        .unwrap()
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Interrupted);
    assert!(summary.pages_crawled >= 1);
    assert!(summary.pages_crawled < 50);
}
