//! Crawl workers
//!
//! Every worker pulls jobs from the shared queue until the queue closes or
//! the crawl is cancelled. A job is claimed in the visited set before any
//! network I/O, so each URL is fetched at most once per run.

use crate::crawler::engine::{CrawlContext, Job};
use crate::crawler::PageFetcher;
use crate::extract::ContentExtractor;
use crate::frontier::VisitClaim;
use crate::storage::{PageStore, WebpageRecord};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub(crate) type JobReceiver = Arc<Mutex<mpsc::Receiver<Job>>>;

pub(crate) struct Worker {
    pub id: usize,
    pub ctx: Arc<CrawlContext>,
    pub jobs: JobReceiver,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub store: Arc<dyn PageStore>,
}

impl Worker {
    pub async fn run(self) {
        tracing::trace!("Worker {} started", self.id);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break,
                job = next_job(&self.jobs) => job,
            };

            let Some(job) = next else {
                break;
            };

            self.process(&job.url).await;
            self.ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        tracing::trace!("Worker {} stopped", self.id);
    }

    async fn process(&self, url: &str) {
        match self.ctx.visited.claim(url, self.ctx.max_pages) {
            VisitClaim::Claimed => {}
            VisitClaim::AlreadyVisited => {
                tracing::trace!("Skipping {}: already visited", url);
                return;
            }
            VisitClaim::BudgetExhausted => {
                tracing::trace!("Skipping {}: page budget exhausted", url);
                return;
            }
        }

        let body = self.fetcher.fetch_bytes(url).await;
        if body.is_empty() {
            tracing::debug!("Empty response from {}, skipping", url);
            self.ctx.metrics.record_fetch_failure();
            return;
        }
        self.ctx.metrics.record_fetch(body.len());

        let content = self.extractor.extract(&body, self.ctx.token_budget);
        let links = self
            .extractor
            .discover_links(url, &body, self.ctx.token_budget);

        let record = WebpageRecord {
            url: url.to_string(),
            title: content.title,
            content: content.text,
            word_count: content.word_count,
            crawled_at: Utc::now(),
        };

        match self.store.insert(&record) {
            Ok(()) => self.ctx.metrics.record_stored(),
            Err(e) => {
                tracing::warn!("Failed to store {}: {}", url, e);
                self.ctx.metrics.record_store_failure();
            }
        }

        self.ctx.metrics.record_links(links.len());
        let mut enqueued = 0;
        for link in links {
            if !self.ctx.visited.contains(&link) {
                self.ctx.frontier.enqueue(link);
                enqueued += 1;
            }
        }

        tracing::debug!(
            "Crawled {} ({} words, {} new links)",
            url,
            record.word_count,
            enqueued
        );
    }
}

async fn next_job(jobs: &JobReceiver) -> Option<Job> {
    jobs.lock().await.recv().await
}
