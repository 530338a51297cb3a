use std::sync::Arc;
use std::time::Duration;

use harvest_core::error::AppError;
use harvest_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use url::Url;

use crate::user_agent::UserAgentRotator;

/// Desktop browser header bundle sent with every request.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("accept-encoding", "gzip, deflate, br"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

/// Domain the crawler stays within unless configured otherwise.
pub const DEFAULT_ALLOWED_DOMAIN: &str = "avature.net";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP fetcher using reqwest.
///
/// Sends the [`BROWSER_HEADERS`] bundle, keeps a cookie jar across
/// requests, and can override the User-Agent per request through a
/// [`UserAgentRotator`]. When allowed domains are set, URLs on any other
/// host are refused before a request is made.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    allowed_domains: Arc<Vec<String>>,
    user_agents: Option<Arc<UserAgentRotator>>,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            allowed_domains: Arc::new(Vec::new()),
            user_agents: None,
        })
    }

    /// Only fetch URLs on these domains or their subdomains.
    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let domains = domains
            .into_iter()
            .map(|d| {
                let d: String = d.into();
                d.trim().trim_start_matches('.').to_ascii_lowercase()
            })
            .filter(|d| !d.is_empty())
            .collect();
        self.allowed_domains = Arc::new(domains);
        self
    }

    /// Override the bundled User-Agent with one drawn from `rotator`.
    pub fn with_user_agent_rotation(mut self, rotator: UserAgentRotator) -> Self {
        self.user_agents = Some(Arc::new(rotator));
        self
    }

    fn check_url(&self, url: &str) -> Result<(), AppError> {
        let parsed =
            Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL {url}: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AppError::HttpError(format!(
                    "URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }

        if self.allowed_domains.is_empty() {
            return Ok(());
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::HttpError(format!("URL has no host: {url}")))?;
        if is_allowed_host(host, &self.allowed_domains) {
            Ok(())
        } else {
            Err(AppError::Offsite(url.to_string()))
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.check_url(url)?;

        let mut request = self.client.get(url);
        if let Some(rotator) = &self.user_agents {
            request = request.header(USER_AGENT, rotator.next_user_agent());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        tracing::debug!(%url, status = status.as_u16(), "Fetched page");

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

/// The fixed header bundle as a reqwest header map.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len());
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// True if `host` is one of `domains` or a subdomain of one.
fn is_allowed_host(host: &str, domains: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec!["avature.net".to_string()]
    }

    #[test]
    fn test_header_bundle() {
        let headers = browser_headers();
        assert_eq!(headers.len(), 11);
        assert!(
            headers["user-agent"]
                .to_str()
                .unwrap()
                .contains("Chrome/120")
        );
        assert_eq!(headers["dnt"], "1");
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers["accept-language"], "en-US,en;q=0.5");
    }

    #[test]
    fn test_allowed_hosts() {
        assert!(is_allowed_host("avature.net", &domains()));
        assert!(is_allowed_host("acme.avature.net", &domains()));
        assert!(is_allowed_host("ACME.Avature.net.", &domains()));
    }

    #[test]
    fn test_offsite_hosts() {
        assert!(!is_allowed_host("evilavature.net", &domains()));
        assert!(!is_allowed_host("avature.net.evil.com", &domains()));
        assert!(!is_allowed_host("example.com", &domains()));
    }

    #[test]
    fn test_check_url_without_domain_filter() {
        let fetcher = ReqwestFetcher::new().unwrap();
        assert!(fetcher.check_url("https://example.com/jobs/1").is_ok());
    }

    #[test]
    fn test_check_url_with_domain_filter() {
        let fetcher = ReqwestFetcher::new()
            .unwrap()
            .with_allowed_domains([".Avature.net"]);
        assert!(
            fetcher
                .check_url("https://acme.avature.net/careers/SearchJobs")
                .is_ok()
        );
        let err = fetcher
            .check_url("https://tracking.example.com/pixel")
            .unwrap_err();
        assert!(matches!(err, AppError::Offsite(_)));
    }

    #[test]
    fn test_check_url_rejects_bad_scheme_and_garbage() {
        let fetcher = ReqwestFetcher::new().unwrap();
        let err = fetcher.check_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("not allowed"));
        assert!(fetcher.check_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_offsite_fetch_makes_no_request() {
        let fetcher = ReqwestFetcher::new()
            .unwrap()
            .with_allowed_domains([DEFAULT_ALLOWED_DOMAIN]);
        let err = fetcher
            .fetch("http://127.0.0.1:9/careers/JobDetail/1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Offsite(_)));
        assert!(err.is_fetch_failure());
    }
}
