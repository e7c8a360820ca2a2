//! Crossref `works` API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{DiscoveryError, WorkSearch};
use crate::config::CrossrefConfig;

/// Registrant prefix and type every query is restricted to.
const WORKS_FILTER: &str = "prefix:10.1002,type:journal-article";
/// Fields requested per work.
const WORKS_SELECT: &str = "DOI,title,author,URL,issued,link,container-title,subject";

/// One page of `/works` results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorksPage {
    #[serde(default)]
    pub items: Vec<Work>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksPage,
}

/// A work as returned with [`WORKS_SELECT`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Work {
    #[serde(rename = "DOI", default)]
    pub doi: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub author: Vec<Contributor>,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(default)]
    pub issued: Option<PartialDate>,
    #[serde(default)]
    pub link: Vec<WorkLink>,
    #[serde(rename = "container-title", default)]
    pub container_title: Vec<String>,
    #[serde(default)]
    pub subject: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    /// Organizational authors carry only a name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Contributor {
    pub fn display_name(&self) -> String {
        match (&self.given, &self.family) {
            (None, None) => self.name.clone().unwrap_or_default().trim().to_string(),
            (given, family) => format!(
                "{} {}",
                given.as_deref().unwrap_or(""),
                family.as_deref().unwrap_or("")
            )
            .trim()
            .to_string(),
        }
    }
}

/// `{"date-parts": [[2020, 5, 1]]}`; month and day may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

impl PartialDate {
    /// `(year, month, day)` with missing parts as 0.
    pub fn parts(&self) -> (i32, u32, u32) {
        let Some(first) = self.date_parts.first() else {
            return (0, 0, 0);
        };
        let part = |i: usize| first.get(i).copied().flatten().unwrap_or(0);
        (
            part(0),
            u32::try_from(part(1)).unwrap_or(0),
            u32::try_from(part(2)).unwrap_or(0),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkLink {
    #[serde(rename = "URL", default)]
    pub url: String,
}

impl Work {
    pub fn first_title(&self) -> &str {
        self.title.first().map(String::as_str).unwrap_or("")
    }

    pub fn first_container_title(&self) -> &str {
        self.container_title
            .first()
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn issued_parts(&self) -> (i32, u32, u32) {
        self.issued.as_ref().map(PartialDate::parts).unwrap_or((0, 0, 0))
    }
}

/// Client for `<api_url>/works`.
pub struct CrossrefClient {
    client: reqwest::Client,
    works_url: String,
    container_title: String,
}

impl CrossrefClient {
    pub fn new(config: &CrossrefConfig) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            works_url: format!("{}/works", config.api_url.trim_end_matches('/')),
            container_title: config.container_title.clone(),
        })
    }

    fn query<'a>(&'a self, term: &'a str, cursor: &'a str, rows: &'a str) -> [(&'a str, &'a str); 8] {
        [
            ("query", term),
            ("query.container-title", self.container_title.as_str()),
            ("filter", WORKS_FILTER),
            ("select", WORKS_SELECT),
            ("sort", "issued"),
            ("order", "desc"),
            ("rows", rows),
            ("cursor", cursor),
        ]
    }
}

#[async_trait]
impl WorkSearch for CrossrefClient {
    fn name(&self) -> &str {
        "crossref"
    }

    async fn search(
        &self,
        term: &str,
        cursor: &str,
        rows: u32,
    ) -> Result<WorksPage, DiscoveryError> {
        let rows = rows.to_string();
        debug!("Crossref query '{}' cursor={}", term, cursor);

        let response = self
            .client
            .get(&self.works_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&self.query(term, cursor, &rows))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Unavailable(format!(
                "Crossref returned {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        parse_works_page(&text)
    }
}

/// Decode a `/works` response body.
pub fn parse_works_page(body: &str) -> Result<WorksPage, DiscoveryError> {
    serde_json::from_str::<WorksResponse>(body)
        .map(|r| r.message)
        .map_err(|e| DiscoveryError::Parse(format!("Failed to parse Crossref response: {}", e)))
}
