use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use xxhash_rust::xxh3::xxh3_64;

/// Computes the 64-bit fingerprint identifying a URL in the visited set
///
/// Two distinct URLs with the same fingerprint are treated as the same page.
pub fn fingerprint(url: &str) -> u64 {
    xxh3_64(url.as_bytes())
}

/// Outcome of [`VisitedSet::claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitClaim {
    /// The URL was not visited before and is now marked; the caller owns the fetch
    Claimed,
    /// Another caller already marked this URL
    AlreadyVisited,
    /// The page budget is used up; nothing was marked
    BudgetExhausted,
}

/// Set of fingerprints for URLs that have been handed to a fetch
///
/// The set only grows during a run: once `contains(url)` is true it stays true.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<u64>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as visited. Idempotent.
    pub fn add(&self, url: &str) {
        self.lock().insert(fingerprint(url));
    }

    /// Returns true if `url` has been marked
    ///
    /// `contains` followed by `add` is not atomic: two callers may both see
    /// `false` for the same URL. Use [`VisitedSet::claim`] when a single owner
    /// is required.
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(&fingerprint(url))
    }

    /// Number of distinct fingerprints marked so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Atomically tests, budget-checks and marks `url`
    ///
    /// Exactly one caller receives [`VisitClaim::Claimed`] for a given URL, and
    /// the set never grows past `budget` entries through this method.
    pub fn claim(&self, url: &str, budget: usize) -> VisitClaim {
        let fp = fingerprint(url);
        let mut seen = self.lock();

        if seen.contains(&fp) {
            VisitClaim::AlreadyVisited
        } else if seen.len() >= budget {
            VisitClaim::BudgetExhausted
        } else {
            seen.insert(fp);
            VisitClaim::Claimed
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
