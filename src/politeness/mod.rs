//! Per-host admission control
//!
//! Politeness combines two checks for every URL the dispatcher wants to
//! forward:
//! - robots.txt permission, fetched lazily once per host and cached for the run
//! - request pacing, a token bucket per host shared by every request to it

mod manager;

pub use manager::{
    requests_quota, Admission, HostPolicyManager, RateWaiter, MIN_REQUESTS_PER_HOST,
};
