//! Harvest configuration.
//!
//! Defaults live here; a TOML or JSON file can override any of them and
//! command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.cochranelibrary.com";
pub const DEFAULT_OUTPUT: &str = "cochrane_reviews.txt";
pub const MAX_PAGE_SIZE: u32 = 100;

/// Top-level settings for a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site origin for listings and documents.
    pub base_url: String,
    /// First listing page, 1-based.
    pub page_start: u32,
    /// Results per listing page, clamped to `1..=100`.
    pub page_size: u32,
    pub max_pages: u32,
    /// Output path; `~` is expanded.
    pub output: String,
    /// Append to the output instead of truncating it.
    pub append: bool,
    /// Raw `Cookie` header copied from a browser session.
    pub cookie: Option<String>,
    /// Must match the browser the cookie came from.
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    /// Send a GET to the search page before crawling.
    pub warm_up: bool,
    /// Emit records from listing cards without fetching each document.
    pub listing_only: bool,
    /// Resolve topic names that are close but not exact.
    pub topic_match_threshold: f64,
    pub delays: DelayConfig,
    pub fallback: FallbackConfig,
    pub crossref: CrossrefConfig,
    pub browser: BrowserSettings,

    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_start: 1,
            page_size: 25,
            max_pages: 50,
            output: DEFAULT_OUTPUT.to_string(),
            append: false,
            cookie: None,
            user_agent: None,
            timeout_secs: 25,
            warm_up: true,
            listing_only: false,
            topic_match_threshold: 0.80,
            delays: DelayConfig::default(),
            fallback: FallbackConfig::default(),
            crossref: CrossrefConfig::default(),
            browser: BrowserSettings::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load from a TOML or JSON file, chosen by extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let mut config: Config = match ext {
            "json" => serde_json::from_str(&contents)
                .map_err(|e| HarvestError::Config(format!("Failed to parse JSON config: {}", e)))?,
            _ => toml::from_str(&contents)
                .map_err(|e| HarvestError::Config(format!("Failed to parse TOML config: {}", e)))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config.normalized())
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Clamp numeric settings into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.page_start = self.page_start.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.max_pages = self.max_pages.max(1);
        self.topic_match_threshold = self.topic_match_threshold.clamp(0.0, 1.0);
        self.crossref.rows = self.crossref.rows.clamp(1, 1000);
        self
    }

    /// Output path with `~` expanded.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output).as_ref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Politeness delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// After a failed listing candidate.
    pub candidate_ms: u64,
    /// After each document fetch.
    pub document_ms: u64,
    /// After each listing page.
    pub page_ms: u64,
    /// Floor between any two requests to the same host.
    pub min_request_interval_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            candidate_ms: 150,
            document_ms: 250,
            page_ms: 400,
            min_request_interval_ms: 0,
        }
    }
}

impl DelayConfig {
    pub fn candidate(&self) -> Duration {
        Duration::from_millis(self.candidate_ms)
    }

    pub fn document(&self) -> Duration {
        Duration::from_millis(self.document_ms)
    }

    pub fn page(&self) -> Duration {
        Duration::from_millis(self.page_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// No waiting at all; used by tests and dry runs against local stubs.
    pub fn none() -> Self {
        Self {
            candidate_ms: 0,
            document_ms: 0,
            page_ms: 0,
            min_request_interval_ms: 0,
        }
    }
}

/// What happens when the listing refuses to serve us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Most records one fallback run may emit.
    pub cap: usize,
    /// Keep only works whose title or subjects mention the topic.
    pub filter_titles: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cap: 400,
            filter_titles: true,
        }
    }
}

/// Bibliographic search API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossrefConfig {
    pub api_url: String,
    /// Journal the fallback restricts results to.
    pub container_title: String,
    /// Page size per API request.
    pub rows: u32,
    /// Identifying agent with a contact address, as the API asks for.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.crossref.org".to_string(),
            container_title: "Cochrane Database of Systematic Reviews".to_string(),
            rows: 200,
            user_agent: "vantage-labs-cochrane-scraper/1.0 (mailto:you@example.com)".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Headless browser used when plain HTTP is challenged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub enabled: bool,
    /// Run without a window (default: true).
    pub headless: bool,
    /// DevTools endpoint of an already running browser, e.g. `ws://localhost:9222`.
    pub remote_url: Option<String>,
    /// Page load timeout in seconds.
    pub timeout: u64,
    pub chrome_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            headless: true,
            remote_url: None,
            timeout: 30,
            chrome_args: Vec::new(),
        }
    }
}
