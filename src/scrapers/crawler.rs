//! Paginated topic crawl.
//!
//! Pages are walked in order. Each page tries the listing URL variants until
//! one returns real content, then every new review on it is fetched and
//! written. When all variants are refused, the run ends, and if the refusal
//! was an anti-bot block the bibliographic fallback takes over.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::candidates::build_candidates;
use super::fetcher::{fetch_page, FetchRequest, PageFetcher};
use super::listing::parse_listing;
use super::metadata::extract_metadata;
use crate::config::{Config, DelayConfig};
use crate::discovery::FallbackResolver;
use crate::error::Result;
use crate::models::{DocumentMetadata, ListingFragment, Record, Topic};
use crate::output::{challenge_comment, error_comment, RecordWriter};
use crate::utils::{canonicalize_document_url, to_absolute_url};

/// Path on the site sent as referer for listing requests.
const TOPICS_REFERER_PATH: &str = "/cdsr/reviews/topics";
const WARM_UP_PATH: &str = "/search";

/// Why a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every requested page was processed.
    MaxPages,
    /// A listing page had no results.
    EndOfResults,
    /// No listing variant could be fetched.
    Blocked,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::MaxPages => "page limit reached",
            Self::EndOfResults => "no more results",
            Self::Blocked => "listing blocked",
        };
        f.write_str(text)
    }
}

/// Totals for one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_fetched: u32,
    pub primary_records: usize,
    pub fallback_records: usize,
    pub stop_reason: StopReason,
}

impl CrawlSummary {
    pub fn total_records(&self) -> usize {
        self.primary_records + self.fallback_records
    }
}

/// Knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub origin: String,
    pub page_start: u32,
    pub page_size: u32,
    pub max_pages: u32,
    pub warm_up: bool,
    pub listing_only: bool,
    pub delays: DelayConfig,
    pub fallback_cap: usize,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            origin: config.base_url.trim_end_matches('/').to_string(),
            page_start: config.page_start.max(1),
            page_size: config.page_size,
            max_pages: config.max_pages,
            warm_up: config.warm_up,
            listing_only: config.listing_only,
            delays: config.delays.clone(),
            fallback_cap: config.fallback.cap,
        }
    }
}

/// Listing body plus the URL variant that produced it.
struct Listing {
    url: String,
    body: String,
}

/// How the candidate loop for one page ended.
enum PageOutcome {
    Fetched(Listing),
    Exhausted {
        first_candidate: String,
        blocked: bool,
        last_reason: String,
    },
}

/// Drives one topic crawl and writes its records.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    topic: Topic,
    settings: CrawlSettings,
    fallback: Option<FallbackResolver>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, topic: Topic, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            topic,
            settings,
            fallback: None,
        }
    }

    /// Use `resolver` when the listing is blocked.
    pub fn with_fallback(mut self, resolver: FallbackResolver) -> Self {
        self.fallback = Some(resolver);
        self
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Run the crawl, writing records and comment lines to `writer`.
    ///
    /// Only output errors are returned; fetch problems end the crawl with
    /// [`StopReason::Blocked`] or are absorbed per document.
    pub async fn run(&self, writer: &mut RecordWriter) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary {
            pages_fetched: 0,
            primary_records: 0,
            fallback_records: 0,
            stop_reason: StopReason::MaxPages,
        };
        let mut seen: HashSet<String> = HashSet::new();

        if self.settings.warm_up {
            self.warm_up().await;
        }

        let first = self.settings.page_start;
        let last = first.saturating_add(self.settings.max_pages);
        for page in first..last {
            let listing = match self.fetch_listing(page).await {
                PageOutcome::Fetched(listing) => listing,
                PageOutcome::Exhausted {
                    first_candidate,
                    blocked,
                    last_reason,
                } => {
                    warn!(
                        "Page {}: failed to fetch listing after all candidates ({})",
                        page, last_reason
                    );
                    summary.stop_reason = StopReason::Blocked;
                    match (&self.fallback, blocked) {
                        (Some(resolver), true) => {
                            writer.write_comment(&challenge_comment(
                                &self.topic.name,
                                &first_candidate,
                            ))?;
                            summary.fallback_records =
                                self.write_fallback(resolver, writer, &mut seen).await?;
                        }
                        _ => {
                            writer.write_comment(&error_comment(&first_candidate, &last_reason))?;
                        }
                    }
                    break;
                }
            };
            summary.pages_fetched += 1;

            let fragments = parse_listing(&listing.body);
            info!("Page {}: found {} review link(s)", page, fragments.len());
            if fragments.is_empty() {
                info!("No more results; stopping");
                summary.stop_reason = StopReason::EndOfResults;
                break;
            }

            for fragment in &fragments {
                if let Some(record) = self.harvest(fragment, &listing.url, &mut seen).await {
                    writer.write_record(&record)?;
                    summary.primary_records += 1;
                }
            }

            pause(self.settings.delays.page()).await;
        }

        info!(
            "Crawl of '{}' finished: {} page(s), {} record(s), {} fallback record(s), {}",
            self.topic.name,
            summary.pages_fetched,
            summary.primary_records,
            summary.fallback_records,
            summary.stop_reason
        );
        Ok(summary)
    }

    async fn warm_up(&self) {
        let url = format!("{}{}", self.settings.origin, WARM_UP_PATH);
        info!("Warm-up: GET {}", url);
        let result = fetch_page(self.fetcher.as_ref(), &FetchRequest::new(url)).await;
        if !result.is_ok() {
            warn!("Warm-up {}; continuing", result.describe());
        }
    }

    async fn fetch_listing(&self, page: u32) -> PageOutcome {
        let candidates = build_candidates(
            &self.settings.origin,
            &self.topic.name,
            &self.topic.id,
            page,
            self.settings.page_size,
        );
        let referer = format!("{}{}", self.settings.origin, TOPICS_REFERER_PATH);
        info!("Page {}: trying {} candidate URL(s)", page, candidates.len());

        let mut blocked = false;
        let mut last_reason = String::from("no candidates");
        for url in &candidates {
            debug!("  -> {}", url);
            let request = FetchRequest::new(url.as_str()).with_referer(&referer);
            let result = fetch_page(self.fetcher.as_ref(), &request).await;
            let was_blocked = result.is_blocked();
            let reason = result.describe();
            if let Some(body) = result.into_body() {
                return PageOutcome::Fetched(Listing {
                    url: url.clone(),
                    body,
                });
            }
            blocked |= was_blocked;
            last_reason = reason;
            debug!("  <- {}", last_reason);
            pause(self.settings.delays.candidate()).await;
        }

        PageOutcome::Exhausted {
            first_candidate: candidates.first().cloned().unwrap_or_default(),
            blocked,
            last_reason,
        }
    }

    /// Build the record for one listing entry, or `None` if already emitted.
    async fn harvest(
        &self,
        fragment: &ListingFragment,
        listing_url: &str,
        seen: &mut HashSet<String>,
    ) -> Option<Record> {
        let absolute = to_absolute_url(&fragment.href, &self.settings.origin);
        let url = canonicalize_document_url(&absolute);
        if !seen.insert(url.clone()) {
            debug!("Skipping duplicate {}", url);
            return None;
        }

        let mut metadata = DocumentMetadata::default();
        if !self.settings.listing_only {
            metadata = self.fetch_metadata(&absolute, listing_url).await;
            pause(self.settings.delays.document()).await;
        }
        let metadata = metadata.or_fragment(fragment);

        Some(Record::new(
            &url,
            &self.topic.name,
            &metadata.title,
            &metadata.authors,
            &metadata.date,
        ))
    }

    async fn fetch_metadata(&self, url: &str, referer: &str) -> DocumentMetadata {
        info!("Fetching review {}", url);
        let request = FetchRequest::new(url).with_referer(referer);
        let result = fetch_page(self.fetcher.as_ref(), &request).await;
        let reason = result.describe();
        match result.into_body() {
            Some(body) => extract_metadata(&body),
            None => {
                warn!("Review {} unavailable ({}); using listing data", url, reason);
                DocumentMetadata::default()
            }
        }
    }

    async fn write_fallback(
        &self,
        resolver: &FallbackResolver,
        writer: &mut RecordWriter,
        seen: &mut HashSet<String>,
    ) -> Result<usize> {
        warn!(
            "Challenge detected; falling back to bibliographic search for '{}'",
            self.topic.name
        );
        let records = resolver
            .resolve_by_topic(&self.topic.name, self.settings.fallback_cap)
            .await;

        let mut written = 0;
        for record in records {
            if seen.insert(record.url.clone()) {
                writer.write_record(&record)?;
                written += 1;
            }
        }
        info!("Fallback wrote {} record(s)", written);
        Ok(written)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
