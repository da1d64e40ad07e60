use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered queue of discovered-but-unfetched URLs
///
/// Pops from the front give breadth-first order, pops from the back give
/// depth-first order. The same URL may be queued more than once; duplicates
/// are filtered when a worker claims the URL, not here.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<String>>,
    total_enqueued: AtomicUsize,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a URL to the tail
    pub fn enqueue(&self, url: impl Into<String>) {
        self.lock().push_back(url.into());
        self.total_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes and returns the oldest URL, or `None` when empty
    pub fn pop_front(&self) -> Option<String> {
        self.lock().pop_front()
    }

    /// Removes and returns the newest URL, or `None` when empty
    pub fn pop_back(&self) -> Option<String> {
        self.lock().pop_back()
    }

    /// Number of URLs currently pending
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of enqueue calls over the lifetime of the frontier
    pub fn total_enqueued(&self) -> usize {
        self.total_enqueued.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
