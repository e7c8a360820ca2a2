//! Registry key grouping editions of the same review.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// DOI shape of a registry review: `10.1002/14651858.CDnnnnnn[.pubN]`.
static REVIEW_DOI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^10\.1002/14651858\.(CD\d{6})(?:\.pub(\d+))?").unwrap()
});

/// Core code plus edition number parsed from a review DOI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoreDocumentKey {
    /// Upper-cased core code, e.g. `CD000001`.
    pub code: String,
    /// Edition from `.pubN`; 1 when absent.
    pub version: u32,
}

impl CoreDocumentKey {
    /// Parse a DOI. Returns `None` when it is not a registry review DOI.
    pub fn from_doi(doi: &str) -> Option<Self> {
        let caps = REVIEW_DOI.captures(doi.trim())?;
        let code = caps[1].to_uppercase();
        let version = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        Some(Self { code, version })
    }
}

impl fmt::Display for CoreDocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.pub{}", self.code, self.version)
    }
}
