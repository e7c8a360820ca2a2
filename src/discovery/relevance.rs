//! Topic relevance check for search results.
//!
//! A topic name is broken into content words; each word becomes a loose,
//! prefix-stemmed pattern so "allergy" also accepts "allergic".

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z][a-z\-]{2,}").unwrap());

const STOPWORDS: &[&str] = &[
    "and", "or", "of", "the", "a", "an", "for", "to", "from", "by", "on", "in", "with", "group",
    "topic",
];

/// Tokens of at least this length are matched by prefix.
const STEM_MIN_LEN: usize = 6;
const STEM_LEN: usize = 5;

/// Lowercased content words of a topic name, first occurrence order.
pub fn tokenize_topic(topic: &str) -> Vec<String> {
    let lower = topic.to_lowercase();
    let mut seen = HashSet::new();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().trim_matches('-').to_string())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Accepts text mentioning any of a topic's words.
#[derive(Debug, Clone)]
pub struct TopicalFilter {
    patterns: Vec<Regex>,
}

impl TopicalFilter {
    pub fn from_tokens(tokens: &[String]) -> Self {
        let patterns = tokens
            .iter()
            .filter_map(|token| {
                let stem: String = if token.chars().count() >= STEM_MIN_LEN {
                    token.chars().take(STEM_LEN).collect()
                } else {
                    token.clone()
                };
                Regex::new(&format!(r"(?i)\b{}\w{{0,12}}\b", regex::escape(&stem))).ok()
            })
            .collect();
        Self { patterns }
    }

    pub fn for_topic(topic: &str) -> Self {
        Self::from_tokens(&tokenize_topic(topic))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when the title or any subject matches a pattern.
    ///
    /// With no patterns everything matches, so a topic made only of
    /// stopwords does not filter out every result.
    pub fn matches(&self, title: &str, subjects: &[String]) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| {
            (!title.is_empty() && p.is_match(title)) || subjects.iter().any(|s| p.is_match(s))
        })
    }
}
