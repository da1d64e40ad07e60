//! The single control loop feeding the worker pool
//!
//! Each iteration checks the stop condition, pops a candidate per the
//! traversal strategy, gates it through robots.txt and the host's rate
//! limiter, and pushes it onto the bounded job queue. A full queue suspends
//! the loop, which is the crawl's backpressure.

use crate::crawler::engine::{CrawlContext, Job, StopReason};
use crate::crawler::TraversalStrategy;
use crate::politeness::HostPolicyManager;
use crate::url::parse_crawl_url;
use rand::rngs::SmallRng;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) struct Dispatcher {
    pub ctx: Arc<CrawlContext>,
    pub hosts: Arc<HostPolicyManager>,
    pub strategy: TraversalStrategy,
    pub jobs: mpsc::Sender<Job>,
    pub rng: SmallRng,
    pub idle_backoff: Duration,
}

impl Dispatcher {
    /// Runs until the budget is reached, the frontier is exhausted or the
    /// crawl is cancelled from outside
    ///
    /// Dropping `self` on return closes the job queue.
    pub async fn run(mut self) -> StopReason {
        let reason = self.dispatch().await;
        self.ctx.cancel.cancel();
        tracing::info!("Dispatcher stopped: {}", reason);
        reason
    }

    async fn dispatch(&mut self) -> StopReason {
        let ctx = Arc::clone(&self.ctx);

        loop {
            if ctx.cancel.is_cancelled() {
                return StopReason::Interrupted;
            }

            if ctx.visited.len() >= ctx.max_pages {
                return StopReason::BudgetReached;
            }

            let Some(candidate) = self.strategy.next_candidate(&ctx.frontier, &mut self.rng)
            else {
                // in_flight is read before the frontier; workers enqueue
                // links before releasing their slot.
                if ctx.in_flight.load(Ordering::SeqCst) == 0 && ctx.frontier.is_empty() {
                    return StopReason::FrontierExhausted;
                }
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.idle_backoff) => {}
                }
                continue;
            };

            let url = match parse_crawl_url(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!("Dropping {}: {}", candidate, e);
                    ctx.metrics.record_invalid_url();
                    continue;
                }
            };

            if ctx.visited.contains(url.as_str()) {
                tracing::trace!("Dropping {}: already visited", url);
                continue;
            }

            let admission = self.hosts.check(&url).await;
            if !admission.allowed {
                ctx.metrics.record_robots_denied();
                continue;
            }

            if admission.waiter.wait(&ctx.cancel).await.is_err() {
                tracing::debug!("Abandoned {} while waiting for a rate-limit token", url);
                ctx.metrics.record_abandoned_wait();
                continue;
            }

            ctx.in_flight.fetch_add(1, Ordering::SeqCst);
            let permit = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                permit = self.jobs.reserve() => permit.ok(),
            };

            match permit {
                Some(permit) => {
                    tracing::trace!("Dispatched {}", url);
                    permit.send(Job {
                        url: url.to_string(),
                    });
                }
                None => {
                    ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }
    }
}
