//! Topic name to facet id lookup.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::models::Topic;
use crate::utils::collapse_whitespace;

/// Topic table shipped with the binary.
const BUILTIN_TOPICS: &str = include_str!("topics.json");

static AMPERSAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*&\s*").unwrap());

#[derive(Debug, Deserialize)]
struct TopicEntry {
    title: String,
    id: String,
}

/// Normalize a topic name for comparison.
///
/// Decodes `&amp;`, lowercases, spaces `&` as ` & ` and collapses whitespace.
pub fn normalize_topic(name: &str) -> String {
    let decoded = name.replace("&amp;", "&").replace("&#38;", "&");
    let lower = decoded.to_lowercase();
    collapse_whitespace(&AMPERSAND.replace_all(&lower, " & "))
}

/// Immutable topic table.
#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    entries: Vec<(String, Topic)>,
}

impl TopicIndex {
    /// The table embedded at build time.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TOPICS)
    }

    /// Parse a `[{"title": ..., "id": ...}]` table. Rows missing either field are skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<TopicEntry> = serde_json::from_str(json)
            .map_err(|e| HarvestError::Config(format!("invalid topic table: {}", e)))?;
        Ok(Self::from_topics(
            rows.into_iter()
                .filter(|r| !r.title.trim().is_empty() && !r.id.trim().is_empty())
                .map(|r| Topic::new(r.title.trim(), r.id.trim())),
        ))
    }

    pub fn from_topics(topics: impl IntoIterator<Item = Topic>) -> Self {
        let entries = topics
            .into_iter()
            .map(|t| (normalize_topic(&t.name), t))
            .collect();
        Self { entries }
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.entries.iter().map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a topic by name: exact after normalization, else the most
    /// similar name scoring at least `threshold` (0.0 to 1.0).
    pub fn resolve(&self, name: &str, threshold: f64) -> Option<&Topic> {
        let key = normalize_topic(name);
        if key.is_empty() {
            return None;
        }
        if let Some((_, topic)) = self.entries.iter().find(|(k, _)| *k == key) {
            return Some(topic);
        }

        let (score, topic) = self
            .entries
            .iter()
            .map(|(k, t)| (strsim::normalized_levenshtein(&key, k), t))
            .max_by(|a, b| a.0.total_cmp(&b.0))?;
        debug!("Closest topic to '{}' is '{}' ({:.2})", name, topic.name, score);
        (score >= threshold).then_some(topic)
    }

    /// Like [`resolve`](Self::resolve) but an error when nothing matches.
    pub fn require(&self, name: &str, threshold: f64) -> Result<&Topic> {
        self.resolve(name, threshold)
            .ok_or_else(|| HarvestError::UnknownTopic(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let index = TopicIndex::builtin().unwrap();
        assert_eq!(index.len(), 37);
        assert!(index.topics().all(|t| t.id.starts_with('z')));
    }

    #[test]
    fn test_normalize_topic() {
        assert_eq!(normalize_topic("Ear, nose &amp; throat"), "ear, nose & throat");
        assert_eq!(normalize_topic("  Heart&Circulation "), "heart & circulation");
    }

    #[test]
    fn test_exact_resolution() {
        let index = TopicIndex::builtin().unwrap();
        let topic = index.resolve("neurology", 0.8).unwrap();
        assert_eq!(topic.name, "Neurology");
        assert_eq!(topic.id, "z1209270544087566967307064976193");

        let topic = index.resolve("Allergy&intolerance", 0.8).unwrap();
        assert_eq!(topic.id, "z1506030924307755598196034641807");
    }

    #[test]
    fn test_fuzzy_resolution_respects_threshold() {
        let index = TopicIndex::builtin().unwrap();
        assert_eq!(index.resolve("Neurolgy", 0.8).unwrap().name, "Neurology");
        assert!(index.resolve("Astrophysics", 0.8).is_none());
        assert!(index.resolve("", 0.0).is_none());
        assert!(matches!(
            index.require("Astrophysics", 0.8),
            Err(HarvestError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_from_json_skips_incomplete_rows() {
        let index = TopicIndex::from_json(
            r#"[{"title": "Cancer", "id": "z1"}, {"title": "", "id": "z2"}, {"title": "X", "id": " "}]"#,
        )
        .unwrap();
        assert_eq!(index.len(), 1);
        assert!(TopicIndex::from_json("not json").is_err());
    }
}
