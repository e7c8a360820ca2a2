//! Helper utilities for CLI commands.

use std::path::Path;

use console::style;

use review_harvester::config::Config;
use review_harvester::models::Topic;
use review_harvester::topics::TopicIndex;
use review_harvester::Result;

/// Resolve the topic to crawl.
///
/// An explicit facet id skips the table; otherwise the name must match a
/// builtin topic closely enough.
pub fn resolve_topic(config: &Config, name: &str, topic_id: Option<&str>) -> Result<Topic> {
    if let Some(id) = topic_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(Topic::new(name.trim(), id));
    }
    let index = TopicIndex::builtin()?;
    index
        .require(name, config.topic_match_threshold)
        .cloned()
}

/// Truncate a string to at most `max` characters, adding "..." if truncated.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print where output went and how many records it got.
pub fn print_written(path: &Path, records: usize) {
    println!(
        "{} Wrote {} record(s) to {}",
        style("✓").green(),
        records,
        path.display()
    );
}

/// Hint shown when a crawl produced nothing at all.
pub fn print_empty_hint() {
    println!(
        "{} No records were written. If the site served a challenge page, copy a fresh \
         Cookie header from a browser session on the search page and pass it with the \
         exact User-Agent of that browser (--cookie / --user-agent, or COCHRANE_COOKIES / \
         COCHRANE_UA).",
        style("!").yellow()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer string", 8), "a lon...");
        assert_eq!(truncate("Überblick über", 5), "Üb...");
    }

    #[test]
    fn test_resolve_topic_with_explicit_id() {
        let topic = resolve_topic(&Config::default(), " Anything ", Some("z42")).unwrap();
        assert_eq!(topic, Topic::new("Anything", "z42"));
    }

    #[test]
    fn test_resolve_topic_from_table() {
        let topic = resolve_topic(&Config::default(), "neurology", None).unwrap();
        assert_eq!(topic.name, "Neurology");
        assert!(resolve_topic(&Config::default(), "Astrophysics", Some(" ")).is_err());
    }
}
