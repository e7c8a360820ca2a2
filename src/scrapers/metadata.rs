//! Bibliographic metadata from a single review page.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::DocumentMetadata;
use crate::utils::{collapse_whitespace, join_authors, normalize_date};

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[name]").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static CLASSED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").unwrap());
static TIME_DATETIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").unwrap());

const TITLE_TAGS: &[&str] = &["dc.title", "citation_title", "dcterms.title"];
const AUTHOR_TAGS: &[&str] = &["dc.creator", "citation_author"];
/// Carries every author in one tag.
const AUTHOR_LIST_TAG: &str = "citation_authors";
const DATE_TAGS: &[&str] = &[
    "dc.date",
    "citation_date",
    "citation_publication_date",
    "dc.date.issued",
];

/// Extract title, authors and date from a document page.
///
/// Every field falls back through meta tags, then visible markup, and ends
/// up empty when nothing matches.
pub fn extract_metadata(body: &str) -> DocumentMetadata {
    let document = Html::parse_document(body);
    let metas = MetaTags::collect(&document);

    let title = TITLE_TAGS
        .iter()
        .find_map(|name| metas.first(name))
        .or_else(|| {
            document
                .select(&H1)
                .map(element_text)
                .find(|t| !t.is_empty())
        })
        .unwrap_or_default();

    let mut names: Vec<String> = Vec::new();
    for (name, content) in &metas.tags {
        if AUTHOR_TAGS.contains(&name.as_str()) {
            names.push(content.clone());
        } else if name == AUTHOR_LIST_TAG {
            names.extend(content.split([';', ',']).map(str::to_string));
        }
    }
    if names.iter().all(|n| n.trim().is_empty()) {
        names = document
            .select(&CLASSED)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|c| c.to_lowercase().contains("author"))
            })
            .map(element_text)
            .collect();
    }
    let authors = join_authors(names);

    let raw_date = DATE_TAGS
        .iter()
        .find_map(|name| metas.first(name))
        .or_else(|| {
            document
                .select(&TIME_DATETIME)
                .filter_map(|el| el.value().attr("datetime"))
                .map(collapse_whitespace)
                .find(|d| !d.is_empty())
        })
        .unwrap_or_default();

    DocumentMetadata {
        title,
        authors,
        date: normalize_date(&raw_date),
    }
}

/// Named meta tags in document order, names lower-cased.
struct MetaTags {
    tags: Vec<(String, String)>,
}

impl MetaTags {
    fn collect(document: &Html) -> Self {
        let tags = document
            .select(&META)
            .filter_map(|el| {
                let name = el.value().attr("name")?.trim().to_lowercase();
                let content = collapse_whitespace(el.value().attr("content")?);
                Some((name, content))
            })
            .collect();
        Self { tags }
    }

    fn first(&self, name: &str) -> Option<String> {
        self.tags
            .iter()
            .find(|(n, c)| n == name && !c.is_empty())
            .map(|(_, c)| c.clone())
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_tags_win() {
        let html = r#"<html><head>
            <meta name="DC.Title" content="Antibiotics for  acute otitis media">
            <meta name="citation_author" content="Smith J">
            <meta name="citation_author" content="Doe A">
            <meta name="citation_author" content="Smith J">
            <meta name="citation_publication_date" content="2015/06/22">
            </head><body><h1>Ignored heading</h1></body></html>"#;
        let meta = extract_metadata(html);
        assert_eq!(meta.title, "Antibiotics for acute otitis media");
        assert_eq!(meta.authors, "Smith J, Doe A");
        assert_eq!(meta.date, "2015-06-22");
    }

    #[test]
    fn test_title_tag_priority() {
        let html = r#"<meta name="citation_title" content="Second">
            <meta name="dc.title" content="First">"#;
        assert_eq!(extract_metadata(html).title, "First");
    }

    #[test]
    fn test_combined_author_tag_is_split() {
        let html = r#"<meta name="citation_authors" content="Lee K; Park S, Kim H">"#;
        assert_eq!(extract_metadata(html).authors, "Lee K, Park S, Kim H");
    }

    #[test]
    fn test_markup_fallbacks() {
        let html = r#"<html><body>
            <h1> Exercise for   depression </h1>
            <ul class="Authors-List"><li>Cooney GM</li></ul>
            <time datetime="2013-09-12T00:00:00Z">12 September 2013</time>
            </body></html>"#;
        let meta = extract_metadata(html);
        assert_eq!(meta.title, "Exercise for depression");
        assert_eq!(meta.authors, "Cooney GM");
        assert_eq!(meta.date, "2013-09-12");
    }

    #[test]
    fn test_empty_page_yields_empty_metadata() {
        assert!(extract_metadata("<html><body><p>Nothing here</p></body></html>").is_empty());
        assert!(extract_metadata("").is_empty());
    }
}
