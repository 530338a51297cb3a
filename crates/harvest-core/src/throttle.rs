//! Per-host request throttling for polite crawling.
//!
//! Wraps any [`Fetcher`] so that consecutive requests to the same host are
//! spaced by a minimum delay. Requests to different hosts do not wait on
//! each other.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use harvest_core::throttle::{ThrottledFetcher, ThrottleConfig};
//!
//! # use harvest_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, harvest_core::error::AppError> { todo!() }
//! # }
//! // One request per second per host, randomized between 0.5s and 1.5s
//! let config = ThrottleConfig::new(Duration::from_secs(1)).randomized(true);
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;
use crate::util::random_below;

/// Configuration for the throttled fetcher.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Base delay between consecutive requests to the same host.
    pub delay: Duration,

    /// Scale each wait by a random factor in `[0.5, 1.5)`.
    pub randomize: bool,
}

impl ThrottleConfig {
    /// Fixed per-host delay, no randomization.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            randomize: false,
        }
    }

    pub fn randomized(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    /// Delay to apply before the next request to a host.
    fn effective_delay(&self) -> Duration {
        if !self.randomize || self.delay.is_zero() {
            return self.delay;
        }
        // factor in [500, 1500) per mille
        let factor = 500 + random_below(1000);
        self.delay.mul_f64(factor as f64 / 1000.0)
    }
}

impl Default for ThrottleConfig {
    /// 1 second per host, randomized.
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            randomize: true,
        }
    }
}

/// A [`Fetcher`] wrapper that enforces per-host spacing.
///
/// Each request reserves the next free slot for its host under a lock and
/// then sleeps until that slot outside the lock, so concurrent callers for
/// the same host are serialized without blocking other hosts.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    /// Earliest instant the next request to each host may start.
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Host key of a URL (`host[:port]`), or `None` if it cannot be parsed.
    fn host_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        Some(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        })
    }

    /// Reserve a start time for `host` and return it.
    async fn reserve(&self, host: &str) -> Instant {
        let mut slots = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match slots.get(host) {
            Some(&slot) if slot > now => slot,
            _ => now,
        };
        slots.insert(host.to_string(), start + self.config.effective_delay());
        start
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(host) = Self::host_key(url) {
            let start = self.reserve(&host).await;
            if start > Instant::now() {
                tracing::debug!(
                    %host,
                    wait_ms = %start.saturating_duration_since(Instant::now()).as_millis(),
                    "Throttling request"
                );
                tokio::time::sleep_until(start).await;
            }
        }
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockFetcher;

    #[test]
    fn host_key_extracts_host_and_explicit_port() {
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::host_key("https://Acme.avature.net/careers?q=1"),
            Some("acme.avature.net".to_string())
        );
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::host_key("http://localhost:8080/page"),
            Some("localhost:8080".to_string())
        );
    }

    #[test]
    fn host_key_returns_none_for_invalid_url() {
        assert_eq!(ThrottledFetcher::<MockFetcher>::host_key("not-a-url"), None);
    }

    #[test]
    fn effective_delay_fixed() {
        let config = ThrottleConfig::new(Duration::from_secs(1));
        assert_eq!(config.effective_delay(), Duration::from_secs(1));
    }

    #[test]
    fn effective_delay_randomized_is_bounded() {
        let config = ThrottleConfig::new(Duration::from_millis(1000)).randomized(true);
        for _ in 0..100 {
            let d = config.effective_delay();
            assert!(d >= Duration::from_millis(500), "{d:?}");
            assert!(d < Duration::from_millis(1500), "{d:?}");
        }
    }

    #[test]
    fn default_config_matches_polite_crawling() {
        let config = ThrottleConfig::default();
        assert_eq!(config.delay, Duration::from_secs(1));
        assert!(config.randomize);
    }

    #[tokio::test]
    async fn throttle_spaces_requests_to_same_host() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new(),
            ThrottleConfig::new(Duration::from_millis(100)),
        );

        let start = std::time::Instant::now();
        let _ = fetcher.fetch("http://example.com/page1").await;
        let _ = fetcher.fetch("http://example.com/page2").await;

        assert!(
            start.elapsed() >= Duration::from_millis(100),
            "second request should wait, elapsed: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn throttle_serializes_concurrent_requests() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new(),
            ThrottleConfig::new(Duration::from_millis(80)),
        );

        let start = std::time::Instant::now();
        let _ = tokio::join!(
            fetcher.fetch("http://example.com/1"),
            fetcher.fetch("http://example.com/2"),
            fetcher.fetch("http://example.com/3"),
        );

        assert!(
            start.elapsed() >= Duration::from_millis(160),
            "three requests need two gaps, elapsed: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn throttle_does_not_delay_different_hosts() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new(),
            ThrottleConfig::new(Duration::from_millis(300)),
        );

        let start = std::time::Instant::now();
        let _ = fetcher.fetch("http://example.com/page1").await;
        let _ = fetcher.fetch("http://other.com/page1").await;

        assert!(
            start.elapsed() < Duration::from_millis(250),
            "different hosts are independent, elapsed: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn throttle_passes_through_results_and_errors() {
        let inner = MockFetcher::new()
            .with_page("http://example.com/ok", "<html>hello</html>")
            .with_error("http://example.com/bad", AppError::HttpError("HTTP 500".into()));
        let fetcher = ThrottledFetcher::new(inner, ThrottleConfig::new(Duration::ZERO));

        assert_eq!(
            fetcher.fetch("http://example.com/ok").await.unwrap(),
            "<html>hello</html>"
        );
        let err = fetcher.fetch("http://example.com/bad").await.unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }
}
