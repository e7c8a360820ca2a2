//! Listing page parsing.
//!
//! Result markup varies between portal skins, so every lookup is an ordered
//! list of matchers tried most-specific first; the first hit wins.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::ListingFragment;
use crate::utils::collapse_whitespace;

/// Where a matcher reads its value from.
#[derive(Debug, Clone, Copy)]
enum ValueSource {
    Text,
    Attr(&'static str),
}

/// A selector plus the way to read a value from what it matches.
struct Matcher {
    selector: Selector,
    source: ValueSource,
}

impl Matcher {
    fn text(css: &str) -> Self {
        Self {
            selector: Selector::parse(css).unwrap(),
            source: ValueSource::Text,
        }
    }

    fn attr(css: &str, attr: &'static str) -> Self {
        Self {
            selector: Selector::parse(css).unwrap(),
            source: ValueSource::Attr(attr),
        }
    }

    fn read(&self, element: ElementRef<'_>) -> String {
        match self.source {
            ValueSource::Text => element_text(element),
            ValueSource::Attr(name) => element
                .value()
                .attr(name)
                .map(collapse_whitespace)
                .unwrap_or_default(),
        }
    }
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|css| Selector::parse(css).unwrap()).collect()
}

/// One result card, most specific layout first.
static CARD_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".search-results-item",
        ".search-result",
        ".result-item",
        "article",
        "li.result",
    ])
});

/// Title link inside a card; the last entry is the generic first-anchor fallback.
static TITLE_LINK_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        "h3.result-title a[href]",
        ".result-title a[href]",
        "h3 a[href]",
        "a[href]",
    ])
});

static AUTHOR_MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        Matcher::text(".search-result-authors div"),
        Matcher::text(".search-result-authors"),
        Matcher::text(".result-authors"),
        Matcher::text(".authors"),
    ]
});

static DATE_MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        Matcher::text(".search-result-date div"),
        Matcher::text(".search-result-date"),
        Matcher::text(".result-date"),
        Matcher::attr("time[datetime]", "datetime"),
        Matcher::text("time"),
    ]
});

/// Direct review links, used when no card layout is recognized.
static REVIEW_LINK_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        r#"a[href*="/cdsr/doi/"][href*="/full"]"#,
        r#"a[href*="/doi/10."]"#,
    ])
});

/// Extract result fragments from a listing page.
///
/// Never fails: malformed markup is parsed permissively and cards without a
/// usable link are skipped. Fragments are unique by href, in document order.
pub fn parse_listing(body: &str) -> Vec<ListingFragment> {
    let document = Html::parse_document(body);

    let fragments = match find_cards(&document) {
        Some((card_selector, cards)) => {
            debug!("Listing layout matched {} card(s)", cards.len());
            cards
                .into_iter()
                .filter_map(|card| fragment_from_card(card, card_selector))
                .collect()
        }
        None => scan_review_links(&document),
    };

    dedup_by_href(fragments)
}

fn find_cards(document: &Html) -> Option<(&'static Selector, Vec<ElementRef<'_>>)> {
    CARD_SELECTORS.iter().find_map(|selector| {
        let cards: Vec<ElementRef<'_>> = document.select(selector).collect();
        (!cards.is_empty()).then_some((selector, cards))
    })
}

fn fragment_from_card(card: ElementRef<'_>, card_selector: &Selector) -> Option<ListingFragment> {
    let link = TITLE_LINK_SELECTORS.iter().find_map(|selector| {
        card.select(selector).find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| !href.trim().is_empty())
        })
    })?;

    let href = link.value().attr("href")?.trim().to_string();
    let mut title = element_text(link);
    if title.is_empty() {
        title = link
            .value()
            .attr("title")
            .map(collapse_whitespace)
            .unwrap_or_default();
    }

    let authors = first_value(card, &AUTHOR_MATCHERS)
        .or_else(|| sibling_value(card, card_selector, &AUTHOR_MATCHERS))
        .unwrap_or_default();
    let date = first_value(card, &DATE_MATCHERS)
        .or_else(|| sibling_value(card, card_selector, &DATE_MATCHERS))
        .unwrap_or_default();

    Some(ListingFragment {
        href,
        title,
        authors,
        date,
    })
}

/// First non-empty value any matcher finds inside `scope`.
fn first_value(scope: ElementRef<'_>, matchers: &[Matcher]) -> Option<String> {
    matchers.iter().find_map(|matcher| {
        scope
            .select(&matcher.selector)
            .map(|el| matcher.read(el))
            .find(|value| !value.is_empty())
    })
}

/// Look in the card's following siblings, stopping at the next card.
fn sibling_value(
    card: ElementRef<'_>,
    card_selector: &Selector,
    matchers: &[Matcher],
) -> Option<String> {
    for node in card.next_siblings() {
        let Some(sibling) = ElementRef::wrap(node) else {
            continue;
        };
        if card_selector.matches(&sibling) {
            break;
        }
        for matcher in matchers {
            if matcher.selector.matches(&sibling) {
                let value = matcher.read(sibling);
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        if let Some(value) = first_value(sibling, matchers) {
            return Some(value);
        }
    }
    None
}

fn scan_review_links(document: &Html) -> Vec<ListingFragment> {
    for selector in REVIEW_LINK_SELECTORS.iter() {
        let found: Vec<ListingFragment> = document
            .select(selector)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                (!href.is_empty()).then(|| ListingFragment {
                    href: href.to_string(),
                    title: element_text(a),
                    ..Default::default()
                })
            })
            .collect();
        if !found.is_empty() {
            debug!("No card layout; found {} direct review link(s)", found.len());
            return found;
        }
    }
    Vec::new()
}

fn dedup_by_href(fragments: Vec<ListingFragment>) -> Vec<ListingFragment> {
    let mut seen = HashSet::new();
    fragments
        .into_iter()
        .filter(|f| seen.insert(f.href.clone()))
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}
