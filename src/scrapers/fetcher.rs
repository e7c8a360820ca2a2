//! Page fetching seam.
//!
//! The crawler only sees [`PageFetcher`]; the reqwest client, the headless
//! browser and test stubs all plug in behind it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::challenge::is_challenge;
use crate::models::PageFetchResult;

/// Errors a fetcher can raise before it has a response to hand back.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Browser error: {0}")]
    Browser(String),
}

/// One GET request.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    /// Extra headers layered over the fetcher's defaults.
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_referer(self, referer: &str) -> Self {
        self.with_header("Referer", referer)
    }
}

/// Raw response: status, decoded body and the encoding the server declared.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub content_encoding: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Classify into ok / challenged / failed.
    pub fn classify(self) -> PageFetchResult {
        if !self.is_success() {
            return PageFetchResult::failed(Some(self.status), format!("HTTP {}", self.status));
        }
        if self.body.trim().is_empty() {
            let reason = match &self.content_encoding {
                Some(enc) => format!("empty body (content-encoding: {})", enc),
                None => "empty body".to_string(),
            };
            return PageFetchResult::failed(Some(self.status), reason);
        }
        if is_challenge(&self.body) {
            return PageFetchResult::challenged();
        }
        PageFetchResult::ok(self.body)
    }
}

/// Something that can GET a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "fetcher"
    }
}

/// Fetch and classify, folding transport errors into a failed result.
pub async fn fetch_page(fetcher: &dyn PageFetcher, request: &FetchRequest) -> PageFetchResult {
    match fetcher.fetch(request).await {
        Ok(response) => response.classify(),
        Err(FetchError::Status(status)) => {
            PageFetchResult::failed(Some(status), format!("HTTP {}", status))
        }
        Err(e) => PageFetchResult::failed(None, e.to_string()),
    }
}

/// Tries a primary fetcher and escalates to a secondary one when the
/// primary errors, gets a non-success status or is served a challenge.
pub struct ChainedFetcher {
    primary: Box<dyn PageFetcher>,
    secondary: Box<dyn PageFetcher>,
}

impl ChainedFetcher {
    pub fn new(primary: Box<dyn PageFetcher>, secondary: Box<dyn PageFetcher>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl PageFetcher for ChainedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let first = self.primary.fetch(request).await;
        let reason = match &first {
            Ok(resp) if resp.is_success() && !is_challenge(&resp.body) => return first,
            Ok(resp) if resp.is_success() => "challenge page".to_string(),
            Ok(resp) => format!("HTTP {}", resp.status),
            Err(e) => e.to_string(),
        };

        warn!(
            "{} failed for {} ({}); escalating to {}",
            self.primary.name(),
            request.url,
            reason,
            self.secondary.name()
        );

        match self.secondary.fetch(request).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                debug!("{} also failed: {}", self.secondary.name(), e);
                first
            }
        }
    }

    fn name(&self) -> &str {
        "chained"
    }
}
