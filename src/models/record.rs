//! Output records and the raw pieces they are assembled from.

use serde::{Deserialize, Serialize};

use crate::utils::normalize::{sanitize_field, FIELD_SEPARATOR};

/// A topic as the listing portal knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Human-readable name, also used as search text.
    pub name: String,
    /// Opaque facet token issued by the portal.
    pub id: String,
}

impl Topic {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// One harvested review, ready to be written as a line.
///
/// Every field is sanitized on construction, so a `Record` never carries
/// the field separator or a newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub topic: String,
    pub title: String,
    pub authors: String,
    pub date: String,
}

impl Record {
    /// Build a record, sanitizing every field.
    pub fn new(url: &str, topic: &str, title: &str, authors: &str, date: &str) -> Self {
        Self {
            url: sanitize_field(url),
            topic: sanitize_field(topic),
            title: sanitize_field(title),
            authors: sanitize_field(authors),
            date: sanitize_field(date),
        }
    }

    /// Serialize as `URL|Topic|Title|Authors|Date` (no trailing newline).
    pub fn to_line(&self) -> String {
        let sep = FIELD_SEPARATOR;
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.url, self.topic, self.title, self.authors, self.date
        )
    }

    /// Parse a serialized line. Returns `None` for comments, blank lines and
    /// lines without exactly five fields.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != 5 {
            return None;
        }
        Some(Self {
            url: fields[0].to_string(),
            topic: fields[1].to_string(),
            title: fields[2].to_string(),
            authors: fields[3].to_string(),
            date: fields[4].to_string(),
        })
    }
}

/// Raw pieces of one result card on a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFragment {
    /// Link target as written in the markup (may be relative).
    pub href: String,
    /// Title text near the link.
    pub title: String,
    /// Author text, empty when the card had none.
    pub authors: String,
    /// Date text, empty when the card had none.
    pub date: String,
}

/// Bibliographic metadata pulled from a single review page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub authors: String,
    pub date: String,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.authors.is_empty() && self.date.is_empty()
    }

    /// Fill empty fields from a listing fragment.
    pub fn or_fragment(mut self, fragment: &ListingFragment) -> Self {
        if self.title.is_empty() {
            self.title = fragment.title.clone();
        }
        if self.authors.is_empty() {
            self.authors = fragment.authors.clone();
        }
        if self.date.is_empty() {
            self.date = crate::utils::normalize_date(&fragment.date);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sanitizes_fields() {
        let record = Record::new(
            "https://example.org/doi/10.1002/x/full",
            "Ear, nose & throat",
            "Title with | pipe\nand newline",
            "A | B",
            "2020-01-01",
        );
        let line = record.to_line();
        assert_eq!(line.matches('|').count(), 4);
        assert!(!line.contains('\n'));
        assert_eq!(record.title, "Title with - pipe and newline");
    }

    #[test]
    fn test_record_line_parse() {
        let record = Record::new("https://a/b", "Neurology", "T", "X, Y", "2021-02-03");
        let parsed = Record::from_line(&format!("{}\n", record.to_line())).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_from_line_skips_comments_and_malformed() {
        assert!(Record::from_line("# CHALLENGE_DETECTED|Neurology|https://x|").is_none());
        assert!(Record::from_line("").is_none());
        assert!(Record::from_line("only|three|fields").is_none());
    }

    #[test]
    fn test_metadata_or_fragment_fills_gaps() {
        let fragment = ListingFragment {
            href: "/x".into(),
            title: "Listing title".into(),
            authors: "Doe A".into(),
            date: "28 February 2013".into(),
        };
        let meta = DocumentMetadata {
            title: "Page title".into(),
            ..Default::default()
        }
        .or_fragment(&fragment);
        assert_eq!(meta.title, "Page title");
        assert_eq!(meta.authors, "Doe A");
        assert_eq!(meta.date, "2013-02-28");
    }
}
