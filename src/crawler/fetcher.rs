//! HTTP fetcher implementation
//!
//! This module handles page downloads for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests with a hard body cap
//! - Collapsing every failure into an empty body
//!
//! There are no retries; a failed page is simply dropped.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Source of page bodies
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Downloads `url`
    ///
    /// Returns an empty vector on any failure: network error, timeout,
    /// non-success status or an unreadable body.
    async fn fetch_bytes(&self, url: &str) -> Vec<u8>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The identity string sent with every request
/// * `timeout` - Hard bound on each request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use polite_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("PoliteCrawler/0.1", Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP, truncating bodies at a byte cap
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client(user_agent, timeout)?,
            max_body_bytes,
        ))
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.max_body_bytes - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Vec<u8> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!("Timed out fetching {}", url);
                } else {
                    tracing::debug!("Failed to fetch {}: {}", url, e);
                }
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} returned HTTP {}", url, status);
            return Vec::new();
        }

        match self.read_capped(response).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to read body of {}: {}", url, e);
                Vec::new()
            }
        }
    }
}
