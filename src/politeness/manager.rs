use crate::robots::{ParsedRobots, RobotsSource};
use crate::url::{host_key, robots_url};
use crate::CrawlError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Slowest accepted per-host rate: one request per hour
pub const MIN_REQUESTS_PER_HOST: f64 = 1.0 / 3600.0;

/// Builds the token-bucket quota for a per-host request rate
///
/// The bucket refills at `requests_per_second` and holds up to the same
/// number of tokens (at least one), so a host can absorb about one second of
/// burst. Non-positive or non-finite rates are treated as 1 request/second;
/// positive rates below [`MIN_REQUESTS_PER_HOST`] are raised to it.
pub fn requests_quota(requests_per_second: f64) -> Quota {
    let rate = if requests_per_second.is_finite() && requests_per_second > 0.0 {
        requests_per_second.max(MIN_REQUESTS_PER_HOST)
    } else {
        1.0
    };

    let burst = NonZeroU32::new(rate.floor().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(NonZeroU32::MIN);

    Duration::try_from_secs_f64(1.0 / rate)
        .ok()
        .and_then(Quota::with_period)
        .unwrap_or_else(|| Quota::per_hour(NonZeroU32::MIN))
        .allow_burst(burst)
}

/// Policy record for one host
struct HostPolicy {
    /// Initialized once the robots.txt fetch has been attempted; `None` inside
    /// means no usable robots.txt, i.e. allow all.
    robots: OnceCell<Option<ParsedRobots>>,
    limiter: DefaultDirectRateLimiter,
}

impl HostPolicy {
    fn new(quota: Quota) -> Self {
        Self {
            robots: OnceCell::new(),
            limiter: RateLimiter::direct(quota),
        }
    }
}

/// Handle on a host's token bucket returned by [`HostPolicyManager::check`]
#[derive(Clone)]
pub struct RateWaiter {
    policy: Arc<HostPolicy>,
}

impl RateWaiter {
    /// Blocks until the host's bucket yields a token or `cancel` fires
    ///
    /// # Returns
    ///
    /// * `Ok(())` - A request slot was taken
    /// * `Err(CrawlError::Cancelled)` - The run is stopping; abandon the URL
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), CrawlError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CrawlError::Cancelled),
            _ = self.policy.limiter.until_ready() => Ok(()),
        }
    }
}

impl std::fmt::Debug for RateWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateWaiter").finish_non_exhaustive()
    }
}

/// Result of gating a URL through the politeness layer
#[derive(Debug)]
pub struct Admission {
    /// False when robots.txt disallows the URL for our user agent
    pub allowed: bool,
    /// Pacing handle for the URL's host
    pub waiter: RateWaiter,
}

/// Maintains one policy record per host
///
/// Records are created on first sight of a host and live for the run. The
/// table lock is only held to look up or insert a record; robots fetches and
/// rate-limit waits run against the record itself, so hosts never contend with
/// each other.
pub struct HostPolicyManager {
    hosts: RwLock<HashMap<String, Arc<HostPolicy>>>,
    robots_source: Arc<dyn RobotsSource>,
    robots_agent: String,
    quota: Quota,
    /// Pacing handle handed out with refusals for URLs that have no host
    unroutable: Arc<HostPolicy>,
}

impl HostPolicyManager {
    /// Creates a manager
    ///
    /// # Arguments
    ///
    /// * `robots_source` - Where robots.txt bodies come from
    /// * `robots_agent` - Product token matched against `User-agent:` groups
    /// * `requests_per_host` - Token-bucket rate (and burst) per host
    pub fn new(
        robots_source: Arc<dyn RobotsSource>,
        robots_agent: impl Into<String>,
        requests_per_host: f64,
    ) -> Self {
        let quota = requests_quota(requests_per_host);
        Self {
            hosts: RwLock::new(HashMap::new()),
            robots_source,
            robots_agent: robots_agent.into(),
            quota,
            unroutable: Arc::new(HostPolicy::new(quota)),
        }
    }

    /// Gates `url` through robots.txt and returns its host's pacing handle
    ///
    /// The first call for a host fetches that host's robots.txt; concurrent
    /// first calls wait on the same fetch instead of issuing their own. A
    /// failed fetch caches "allow all" for the rest of the run.
    pub async fn check(&self, url: &Url) -> Admission {
        let Some(host) = host_key(url) else {
            tracing::debug!("No host in {}, refusing admission", url);
            return Admission {
                allowed: false,
                waiter: RateWaiter {
                    policy: Arc::clone(&self.unroutable),
                },
            };
        };

        let policy = self.policy_for(&host);
        let robots = policy
            .robots
            .get_or_init(|| self.load_robots(url, &host))
            .await;

        let allowed = robots
            .as_ref()
            .map_or(true, |r| r.is_allowed(url.as_str(), &self.robots_agent));

        if !allowed {
            tracing::debug!("{} disallowed by robots.txt", url);
        }

        Admission {
            allowed,
            waiter: RateWaiter { policy },
        }
    }

    /// Number of hosts with a policy record
    pub fn host_count(&self) -> usize {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn policy_for(&self, host: &str) -> Arc<HostPolicy> {
        if let Some(policy) = self
            .hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
        {
            return Arc::clone(policy);
        }

        let mut hosts = self.hosts.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(HostPolicy::new(self.quota))),
        )
    }

    async fn load_robots(&self, url: &Url, host: &str) -> Option<ParsedRobots> {
        let location = robots_url(url)?;
        match self.robots_source.fetch_robots(&location).await {
            Some(body) => {
                tracing::debug!("Loaded robots.txt for {} ({} bytes)", host, body.len());
                Some(ParsedRobots::from_content(&body))
            }
            None => {
                tracing::debug!("No usable robots.txt for {}, allowing all", host);
                None
            }
        }
    }
}
