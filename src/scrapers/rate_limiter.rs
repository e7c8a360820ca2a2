//! Per-domain request spacing.
//!
//! Every request a fetcher makes goes through [`RateLimiter::acquire`], which
//! waits until the domain's current delay has passed since its last request.
//! Throttling responses (429/503) double the delay up to a ceiling; a run of
//! successes brings it back down to the base interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Successes needed before a backed-off domain relaxes.
const RECOVERY_THRESHOLD: u32 = 5;
/// Upper bound on the per-domain delay.
const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct DomainState {
    current_delay: Duration,
    last_request: Option<Instant>,
    consecutive_successes: u32,
    total_requests: u64,
}

impl DomainState {
    fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            last_request: None,
            consecutive_successes: 0,
            total_requests: 0,
        }
    }

    fn time_until_ready(&self) -> Duration {
        match self.last_request {
            Some(last) => self.current_delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Minimum-interval limiter shared by clones.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    base_delay: Duration,
    domains: Arc<RwLock<HashMap<String, DomainState>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            base_delay: min_interval,
            domains: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|s| s.to_string()))
    }

    /// Wait until the domain is ready, then mark a request as started.
    ///
    /// Returns the domain, or `None` when the URL has no host.
    pub async fn acquire(&self, url: &str) -> Option<String> {
        let domain = Self::extract_domain(url)?;

        let wait_time = {
            let domains = self.domains.read().await;
            domains
                .get(&domain)
                .map(|s| s.time_until_ready())
                .unwrap_or(Duration::ZERO)
        };

        if wait_time > Duration::ZERO {
            debug!("Rate limiting {}: waiting {:?}", domain, wait_time);
            tokio::time::sleep(wait_time).await;
        }

        let mut domains = self.domains.write().await;
        let state = domains
            .entry(domain.clone())
            .or_insert_with(|| DomainState::new(self.base_delay));
        state.last_request = Some(Instant::now());
        state.total_requests += 1;

        Some(domain)
    }

    /// Feed a response status back into the limiter.
    pub async fn report_status(&self, domain: &str, status: u16) {
        if matches!(status, 429 | 503) {
            self.report_rate_limit(domain, status).await;
        } else if (200..400).contains(&status) {
            self.report_success(domain).await;
        }
    }

    async fn report_rate_limit(&self, domain: &str, status: u16) {
        let mut domains = self.domains.write().await;
        let Some(state) = domains.get_mut(domain) else {
            return;
        };
        let doubled = state
            .current_delay
            .max(Duration::from_millis(500))
            .saturating_mul(2);
        state.current_delay = doubled.min(MAX_DELAY);
        state.consecutive_successes = 0;
        warn!(
            "Domain {} returned {}; delay raised to {:?}",
            domain, status, state.current_delay
        );
    }

    async fn report_success(&self, domain: &str) {
        let mut domains = self.domains.write().await;
        let Some(state) = domains.get_mut(domain) else {
            return;
        };
        if state.current_delay <= self.base_delay {
            return;
        }
        state.consecutive_successes += 1;
        if state.consecutive_successes >= RECOVERY_THRESHOLD {
            state.current_delay = (state.current_delay / 2).max(self.base_delay);
            state.consecutive_successes = 0;
            if state.current_delay == self.base_delay {
                info!("Domain {} recovered from backoff", domain);
            }
        }
    }

    /// Current delay for a domain, if it has been seen.
    pub async fn current_delay(&self, domain: &str) -> Option<Duration> {
        self.domains
            .read()
            .await
            .get(domain)
            .map(|s| s.current_delay)
    }

    /// Requests made to a domain so far.
    pub async fn request_count(&self, domain: &str) -> u64 {
        self.domains
            .read()
            .await
            .get(domain)
            .map(|s| s.total_requests)
            .unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            RateLimiter::extract_domain("https://www.cochranelibrary.com/search?x=1"),
            Some("www.cochranelibrary.com".to_string())
        );
        assert_eq!(RateLimiter::extract_domain("not a url"), None);
    }

    #[tokio::test]
    async fn test_acquire_enforces_min_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire("https://example.org/a").await;
        limiter.acquire("https://example.org/b").await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(limiter.request_count("example.org").await, 2);
    }

    #[tokio::test]
    async fn test_backoff_and_recovery() {
        let limiter = RateLimiter::unlimited();
        let domain = limiter.acquire("https://example.org/").await.unwrap();
        limiter.report_status(&domain, 429).await;
        let raised = limiter.current_delay(&domain).await.unwrap();
        assert_eq!(raised, Duration::from_secs(1));

        for _ in 0..RECOVERY_THRESHOLD {
            limiter.report_status(&domain, 200).await;
        }
        let relaxed = limiter.current_delay(&domain).await.unwrap();
        assert!(relaxed < raised);
    }
}
