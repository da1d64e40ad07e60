//! Robots.txt handling module
//!
//! This module provides the robots.txt fetch seam used by the politeness layer
//! and the rule evaluation wrapper. Any failure to obtain a robots.txt body is
//! reported as `None`, which callers treat as "no restrictions".

mod parser;

pub use parser::ParsedRobots;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Source of robots.txt bodies
#[async_trait]
pub trait RobotsSource: Send + Sync {
    /// Fetches the robots.txt body at `robots_url`
    ///
    /// Returns `None` on network error, timeout, non-success status or an
    /// undecodable body.
    async fn fetch_robots(&self, robots_url: &Url) -> Option<String>;
}

/// Fetches robots.txt over HTTP with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpRobotsSource {
    client: Client,
}

impl HttpRobotsSource {
    /// Builds a robots fetcher
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identity sent with each robots.txt request
    /// * `timeout` - Bound on the whole request, body included
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RobotsSource for HttpRobotsSource {
    async fn fetch_robots(&self, robots_url: &Url) -> Option<String> {
        let response = match self.client.get(robots_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", robots_url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("robots.txt at {} returned HTTP {}", robots_url, status);
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!("robots.txt body unreadable at {}: {}", robots_url, e);
                None
            }
        }
    }
}
