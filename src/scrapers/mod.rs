//! Listing and review page retrieval.
//!
//! Fetchers sit behind [`PageFetcher`]; everything above them works on
//! classified [`PageFetchResult`](crate::models::PageFetchResult)s.

pub mod browser;
pub mod candidates;
pub mod challenge;
pub mod crawler;
pub mod fetcher;
mod http_client;
pub mod listing;
pub mod metadata;
pub mod rate_limiter;

pub use browser::BrowserFetcher;
pub use candidates::build_candidates;
pub use challenge::is_challenge;
pub use crawler::{CrawlSettings, CrawlSummary, Crawler, StopReason};
pub use fetcher::{fetch_page, ChainedFetcher, FetchError, FetchRequest, FetchResponse, PageFetcher};
pub use http_client::{resolve_user_agent, HttpClient, DEFAULT_USER_AGENT};
pub use listing::parse_listing;
pub use metadata::extract_metadata;
pub use rate_limiter::RateLimiter;
