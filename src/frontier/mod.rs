//! Crawl frontier: the pending URL queue and the visited set
//!
//! Both structures are internally synchronized and shared between the
//! dispatcher and every worker through `Arc`. Neither knows anything about
//! fetching or politeness.

mod queue;
mod visited;

pub use queue::Frontier;
pub use visited::{fingerprint, VisitClaim, VisitedSet};
