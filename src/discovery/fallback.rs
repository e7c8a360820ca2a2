//! Rebuild a topic's records from the bibliographic search API.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::crossref::Work;
use super::relevance::{tokenize_topic, TopicalFilter};
use super::WorkSearch;
use crate::models::{CoreDocumentKey, Record};
use crate::utils::join_authors;

/// Substring identifying the registry's own DOIs in link URLs.
const REVIEW_DOI_MARKER: &str = "10.1002/14651858.";
/// Upper bound on API pages per query term.
const MAX_PAGES_PER_TERM: usize = 50;

/// Best candidate seen so far for one review.
#[derive(Debug, Clone)]
struct Candidate {
    key: CoreDocumentKey,
    /// Position at which this review was first returned by the API.
    seen_at: usize,
    issued: (i32, u32, u32),
    url: String,
    title: String,
    authors: String,
    date: String,
}

impl Candidate {
    fn from_work(work: &Work, key: CoreDocumentKey) -> Self {
        let issued = work.issued_parts();
        Self {
            key,
            seen_at: 0,
            issued,
            url: preferred_url(work),
            title: work.first_title().to_string(),
            authors: join_authors(work.author.iter().map(|a| a.display_name())),
            date: format_issued(issued),
        }
    }

    /// Higher version wins; equal versions go to the newer issue date.
    fn supersedes(&self, other: &Candidate) -> bool {
        (self.key.version, self.issued) > (other.key.version, other.issued)
    }
}

/// Finds reviews for a topic through a [`WorkSearch`] and keeps one record
/// per review, the most recent edition.
pub struct FallbackResolver {
    search: Arc<dyn WorkSearch>,
    container_title: String,
    rows: u32,
    filter_titles: bool,
}

impl FallbackResolver {
    pub fn new(search: Arc<dyn WorkSearch>, container_title: impl Into<String>) -> Self {
        Self {
            search,
            container_title: container_title.into(),
            rows: 200,
            filter_titles: true,
        }
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows.max(1);
        self
    }

    pub fn with_title_filter(mut self, enabled: bool) -> Self {
        self.filter_titles = enabled;
        self
    }

    /// Query terms: the full topic, then its content words, case-insensitively unique.
    pub fn query_terms(topic: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(topic.trim().to_string())
            .chain(tokenize_topic(topic))
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .collect()
    }

    /// Records for `topic`, newest first, at most `max_records`.
    ///
    /// API failures are logged per term and never abort the whole lookup.
    pub async fn resolve_by_topic(&self, topic: &str, max_records: usize) -> Vec<Record> {
        if max_records == 0 {
            return Vec::new();
        }

        let filter = TopicalFilter::for_topic(topic);
        let container = self.container_title.to_lowercase();
        let mut best: HashMap<String, Candidate> = HashMap::new();

        for term in Self::query_terms(topic) {
            if best.len() >= max_records {
                break;
            }
            info!("{}: querying '{}'", self.search.name(), term);

            let mut cursor = "*".to_string();
            for _ in 0..MAX_PAGES_PER_TERM {
                if best.len() >= max_records {
                    break;
                }
                let page = match self.search.search(&term, &cursor, self.rows).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("{} query '{}' failed: {}", self.search.name(), term, e);
                        break;
                    }
                };
                if page.items.is_empty() {
                    break;
                }

                for work in &page.items {
                    if let Some(mut candidate) = self.accept(work, &container, &filter) {
                        let code = candidate.key.code.clone();
                        let (better, seen_at) = match best.get(&code) {
                            Some(current) => (candidate.supersedes(current), current.seen_at),
                            None => (true, best.len()),
                        };
                        candidate.seen_at = seen_at;
                        if better {
                            best.insert(code, candidate);
                        }
                    }
                    if best.len() >= max_records {
                        break;
                    }
                }

                match page.next_cursor {
                    Some(next) if !next.is_empty() => cursor = next,
                    _ => break,
                }
            }
        }

        let mut candidates: Vec<Candidate> = best.into_values().collect();
        candidates.sort_by(|a, b| {
            b.issued
                .cmp(&a.issued)
                .then_with(|| b.key.version.cmp(&a.key.version))
                .then_with(|| a.seen_at.cmp(&b.seen_at))
        });
        candidates.truncate(max_records);
        debug!("Fallback kept {} review(s) for '{}'", candidates.len(), topic);

        candidates
            .into_iter()
            .map(|c| Record::new(&c.url, topic, &c.title, &c.authors, &c.date))
            .collect()
    }

    fn accept(&self, work: &Work, container: &str, filter: &TopicalFilter) -> Option<Candidate> {
        if !work
            .first_container_title()
            .to_lowercase()
            .contains(container)
        {
            return None;
        }
        let key = CoreDocumentKey::from_doi(&work.doi)?;
        if self.filter_titles && !filter.matches(work.first_title(), &work.subject) {
            return None;
        }
        Some(Candidate::from_work(work, key))
    }
}

/// Registry link, then registry `URL`, then a DOI resolver link.
fn preferred_url(work: &Work) -> String {
    let is_registry = |url: &str| url.to_lowercase().contains(REVIEW_DOI_MARKER);
    work.link
        .iter()
        .map(|l| l.url.as_str())
        .find(|url| is_registry(url))
        .or_else(|| work.url.as_deref().filter(|url| is_registry(url)))
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://doi.org/{}", work.doi))
}

/// `YYYY-MM-DD` with missing month or day as `01`; empty without a year.
fn format_issued((year, month, day): (i32, u32, u32)) -> String {
    if year == 0 {
        return String::new();
    }
    format!("{:04}-{:02}-{:02}", year, month.max(1), day.max(1))
}
