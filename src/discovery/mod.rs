//! Bibliographic search fallback.
//!
//! When the listing site will not serve us, reviews are rediscovered
//! through a scholarly metadata API and rebuilt into the same record shape.

pub mod crossref;
pub mod fallback;
pub mod relevance;

pub use crossref::{CrossrefClient, Work, WorksPage};
pub use fallback::FallbackResolver;
pub use relevance::{tokenize_topic, TopicalFilter};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a search API.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// A cursor-paged bibliographic search.
#[async_trait]
pub trait WorkSearch: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    /// Fetch one page of works for `term`. Start with cursor `*`.
    async fn search(&self, term: &str, cursor: &str, rows: u32)
        -> Result<WorksPage, DiscoveryError>;
}
