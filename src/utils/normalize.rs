//! Field cleanup and canonicalization for delimited record output.
//!
//! Everything here is pure and infallible: a value that cannot be
//! normalized passes through (sanitized) rather than being dropped.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Field separator used by the output stream.
pub const FIELD_SEPARATOR: char = '|';

/// Replacement for a literal separator inside a field.
const SEPARATOR_SUBSTITUTE: &str = " - ";

/// External mirror that hosts the canonical copy of each review.
pub const MIRROR_ORIGIN: &str = "https://onlinelibrary.wiley.com";

static YEAR_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());
static YEAR_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static EMBEDDED_DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s+([A-Za-z]+)\s+(\d{4})").unwrap());
static EMBEDDED_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static DOI_FULL_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(10\.\d{4,9}/[^/]+)/full").unwrap());

/// Date-only formats tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d.%m.%Y",
];

/// Date-time formats without an offset.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make a value safe for one field of a `|`-delimited line.
pub fn sanitize_field(s: &str) -> String {
    let replaced = s
        .replace(['\r', '\n'], " ")
        .replace(FIELD_SEPARATOR, SEPARATOR_SUBSTITUTE);
    collapse_whitespace(&replaced)
}

/// Normalize a date to `YYYY-MM-DD` where possible.
///
/// Unparseable input is returned trimmed but otherwise unchanged.
pub fn normalize_date(raw: &str) -> String {
    let raw = collapse_whitespace(raw);
    if raw.is_empty() {
        return raw;
    }

    if let Some(date) = parse_full_date(&raw) {
        return date.format("%Y-%m-%d").to_string();
    }

    if YEAR_MONTH.is_match(&raw) {
        return format!("{}-01", raw);
    }
    if YEAR_ONLY.is_match(&raw) {
        return format!("{}-01-01", raw);
    }

    if let Some(caps) = EMBEDDED_DAY_MONTH_YEAR.captures(&raw) {
        let candidate = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
        for fmt in ["%d %B %Y", "%d %b %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(&candidate, fmt) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
    }

    if let Some(m) = EMBEDDED_ISO.find(&raw) {
        if NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").is_ok() {
            return m.as_str().to_string();
        }
    }

    raw
}

fn parse_full_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Resolve a possibly relative href against the site origin.
pub fn to_absolute_url(href: &str, origin: &str) -> String {
    let href = href.trim();
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if has_scheme(href) {
        return href.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}

fn has_scheme(href: &str) -> bool {
    match href.find(':') {
        Some(idx) if idx > 0 => {
            let scheme = &href[..idx];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Extract the DOI from a `/<doi>/full` path segment, if present.
pub fn extract_doi(href: &str) -> Option<String> {
    DOI_FULL_SEGMENT
        .captures(href)
        .map(|caps| caps[1].to_string())
}

/// Rewrite an internal review link to the mirror's canonical URL.
///
/// Links without a recognizable DOI segment are returned unchanged.
pub fn canonicalize_document_url(href: &str) -> String {
    match extract_doi(href) {
        Some(doi) => format!("{}/doi/{}/full", MIRROR_ORIGIN, doi),
        None => href.to_string(),
    }
}

/// Join author names: trimmed, empties dropped, first occurrence wins.
pub fn join_authors<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = collapse_whitespace(name.as_ref());
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }
    out.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_field_strips_separator_and_newlines() {
        let inputs = [
            "a|b",
            "line one\nline two",
            "crlf\r\nend",
            "  lots   of\t\tspace  ",
            "|||",
            "pipe | and\nnewline",
        ];
        for input in inputs {
            let out = sanitize_field(input);
            assert!(!out.contains('|'), "{:?} -> {:?}", input, out);
            assert!(!out.contains('\n'), "{:?} -> {:?}", input, out);
            assert!(!out.contains('\r'), "{:?} -> {:?}", input, out);
        }
        assert_eq!(sanitize_field("  lots   of\t\tspace  "), "lots of space");
        assert_eq!(sanitize_field("A|B"), "A - B");
    }

    #[test]
    fn test_normalize_date_partial_dates() {
        assert_eq!(normalize_date("2013"), "2013-01-01");
        assert_eq!(normalize_date("2013-02"), "2013-02-01");
    }

    #[test]
    fn test_normalize_date_human_formats() {
        assert_eq!(normalize_date("28 February 2013"), "2013-02-28");
        assert_eq!(normalize_date("3 Mar 2021"), "2021-03-03");
        assert_eq!(normalize_date("March 3, 2021"), "2021-03-03");
        assert_eq!(normalize_date("2020/07/15"), "2020-07-15");
    }

    #[test]
    fn test_normalize_date_timestamps() {
        assert_eq!(normalize_date("2019-11-05T10:00:00Z"), "2019-11-05");
        assert_eq!(normalize_date("2019-11-05T10:00:00"), "2019-11-05");
        assert_eq!(normalize_date("Tue, 5 Nov 2019 10:00:00 +0000"), "2019-11-05");
    }

    #[test]
    fn test_normalize_date_embedded() {
        assert_eq!(normalize_date("Version published: 28 February 2013"), "2013-02-28");
        assert_eq!(normalize_date("issued 2018-06-30 (online)"), "2018-06-30");
    }

    #[test]
    fn test_normalize_date_passthrough() {
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("   "), "");
        assert_eq!(normalize_date("not-a-date"), "not-a-date");
        assert_eq!(normalize_date("  not-a-date "), "not-a-date");
    }

    #[test]
    fn test_to_absolute_url() {
        let origin = "https://www.cochranelibrary.com";
        assert_eq!(
            to_absolute_url("//cdn.example.org/x", origin),
            "https://cdn.example.org/x"
        );
        assert_eq!(
            to_absolute_url("/cdsr/doi/10.1002/14651858.CD000001/full", origin),
            "https://www.cochranelibrary.com/cdsr/doi/10.1002/14651858.CD000001/full"
        );
        assert_eq!(
            to_absolute_url("search?x=1", "https://www.cochranelibrary.com/"),
            "https://www.cochranelibrary.com/search?x=1"
        );
        assert_eq!(
            to_absolute_url("http://example.org/a", origin),
            "http://example.org/a"
        );
    }

    #[test]
    fn test_canonicalize_document_url() {
        assert_eq!(
            canonicalize_document_url(
                "https://www.cochranelibrary.com/cdsr/doi/10.1002/14651858.CD012345.pub2/full"
            ),
            "https://onlinelibrary.wiley.com/doi/10.1002/14651858.CD012345.pub2/full"
        );
        assert_eq!(
            canonicalize_document_url("https://www.cochranelibrary.com/about"),
            "https://www.cochranelibrary.com/about"
        );
    }

    #[test]
    fn test_join_authors_dedup_preserves_order() {
        let joined = join_authors(["Smith J", " Doe A ", "", "Smith J", "Lee K"]);
        assert_eq!(joined, "Smith J, Doe A, Lee K");
    }
}
