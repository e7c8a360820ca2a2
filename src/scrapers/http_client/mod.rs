//! HTTP client that presents itself like the browser whose cookies it carries.

mod user_agent;

pub use user_agent::{browser_headers, resolve_user_agent, DEFAULT_USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, COOKIE};
use reqwest::Client;
use tracing::{debug, warn};

use super::fetcher::{FetchError, FetchRequest, FetchResponse, PageFetcher};
use super::rate_limiter::RateLimiter;

/// reqwest-backed [`PageFetcher`].
///
/// Redirects are followed, gzip and deflate bodies are decoded, and a raw
/// `Cookie` header copied from a browser session is replayed verbatim on
/// every request. Without one, cookies set by the server are kept in a jar.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
    cookie: Option<String>,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    /// Create a client for a specific browser identity.
    pub fn with_identity(
        user_agent: Option<&str>,
        cookie: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent);
        let cookie = cookie
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let client = Client::builder()
            .user_agent(&user_agent)
            .default_headers(default_headers(&user_agent))
            .timeout(timeout)
            .gzip(true)
            .deflate(true)
            .cookie_store(cookie.is_none())
            .build()?;

        Ok(Self {
            client,
            user_agent,
            cookie,
            rate_limiter: RateLimiter::unlimited(),
        })
    }

    /// Share a rate limiter with other clients.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    /// Names of the cookies in the configured header, for logging.
    pub fn cookie_names(&self) -> Vec<String> {
        self.cookie
            .as_deref()
            .map(|raw| {
                raw.split(';')
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(name, _)| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// GET a URL. Non-success statuses are returned, not raised.
    pub async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let domain = self.rate_limiter.acquire(&request.url).await;

        let mut builder = self.client.get(&request.url);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(
            "GET {} -> HTTP {}, content-encoding={}",
            request.url,
            status,
            content_encoding.as_deref().unwrap_or("none")
        );

        if let Some(domain) = domain {
            self.rate_limiter.report_status(&domain, status).await;
        }

        let body = response.text().await?;

        Ok(FetchResponse {
            status,
            body,
            content_encoding,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.get(request).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn default_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in browser_headers(user_agent) {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .ok()
            .zip(HeaderValue::from_str(&value).ok());
        match parsed {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => warn!("Skipping invalid header {}", name),
        }
    }
    headers
}
