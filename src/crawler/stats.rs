//! Periodic progress reporting

use crate::frontier::{Frontier, VisitedSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Formats one progress line
pub fn progress_line(elapsed: Duration, crawled: usize, queued: usize) -> String {
    format!(
        "[{} min] crawled={} queued={}",
        elapsed.as_secs() / 60,
        crawled,
        queued
    )
}

/// Shortest reporting period; shorter requests are raised to it
const MIN_REPORT_PERIOD: Duration = Duration::from_millis(1);

/// Logs crawl progress every `period` until `cancel` fires
///
/// The first report is emitted one full period after start.
pub async fn report_progress(
    frontier: Arc<Frontier>,
    visited: Arc<VisitedSet>,
    period: Duration,
    cancel: CancellationToken,
) {
    let period = period.max(MIN_REPORT_PERIOD);
    let start = Instant::now();
    let mut ticker = interval_at(start + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tracing::info!(
                    "{}",
                    progress_line(start.elapsed(), visited.len(), frontier.len())
                );
            }
        }
    }

    tracing::trace!("Progress reporter stopped");
}
