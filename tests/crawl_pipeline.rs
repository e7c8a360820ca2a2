//! End-to-end crawl runs against in-memory listing and API stubs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use review_harvester::config::DelayConfig;
use review_harvester::discovery::crossref::parse_works_page;
use review_harvester::discovery::{DiscoveryError, FallbackResolver, WorkSearch, WorksPage};
use review_harvester::models::Topic;
use review_harvester::output::{RecordReader, RecordWriter};
use review_harvester::scrapers::{
    CrawlSettings, Crawler, FetchError, FetchRequest, FetchResponse, PageFetcher, StopReason,
};

const ORIGIN: &str = "https://reviews.test";
const NO_RESULTS: &str = "<html><body><p>Your search returned no results.</p></body></html>";

/// First route whose pattern is a substring of the URL wins; unmatched URLs get a 404.
struct Site {
    routes: Vec<(String, u16, String)>,
    hits: Mutex<Vec<String>>,
}

impl Site {
    fn new() -> Self {
        Self {
            routes: Vec::new(),
            hits: Mutex::new(Vec::new()),
        }
    }

    fn route(mut self, pattern: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push((pattern.to_string(), status, body.into()));
        self
    }

    fn hits_containing(&self, needle: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains(needle))
            .count()
    }
}

#[async_trait]
impl PageFetcher for Site {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.hits.lock().unwrap().push(request.url.clone());
        let (status, body) = self
            .routes
            .iter()
            .find(|(pattern, _, _)| request.url.contains(pattern.as_str()))
            .map(|(_, status, body)| (*status, body.clone()))
            .unwrap_or((404, String::new()));
        Ok(FetchResponse {
            status,
            body,
            content_encoding: None,
        })
    }
}

/// Returns the same single page of works for every term.
struct StaticWorks {
    page: WorksPage,
    calls: Mutex<usize>,
}

#[async_trait]
impl WorkSearch for StaticWorks {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _term: &str, cursor: &str, _rows: u32) -> Result<WorksPage, DiscoveryError> {
        *self.calls.lock().unwrap() += 1;
        if cursor == "*" {
            Ok(self.page.clone())
        } else {
            Ok(WorksPage::default())
        }
    }
}

fn settings(max_pages: u32) -> CrawlSettings {
    CrawlSettings {
        origin: ORIGIN.to_string(),
        page_start: 1,
        page_size: 2,
        max_pages,
        warm_up: false,
        listing_only: false,
        delays: DelayConfig::none(),
        fallback_cap: 2,
    }
}

fn listing(codes: &[&str]) -> String {
    let cards: String = codes
        .iter()
        .map(|code| {
            format!(
                r#"<div class="search-results-item">
                     <h3 class="result-title"><a href="/cdsr/doi/10.1002/14651858.{code}/full">Card {code}</a></h3>
                     <div class="search-result-authors"><div>Card Author</div></div>
                     <div class="search-result-date"><div>1 June 2019</div></div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"search-results\">{cards}</div></body></html>")
}

fn review(code: &str) -> String {
    format!(
        r#"<html><head>
             <meta name="citation_title" content="Review {code}">
             <meta name="citation_author" content="Smith J">
             <meta name="citation_author" content="Jones K">
             <meta name="citation_publication_date" content="2022/02/14">
           </head><body><h1>Review {code}</h1></body></html>"#
    )
}

fn neurology_works() -> WorksPage {
    parse_works_page(
        r#"{"message": {"items": [
            {"DOI": "10.1002/14651858.CD000010.pub2", "title": ["Neurology review A"],
             "author": [{"given": "Ann", "family": "Lee"}],
             "issued": {"date-parts": [[2021, 5, 2]]},
             "container-title": ["Cochrane Database of Systematic Reviews"]},
            {"DOI": "10.1002/14651858.CD000011", "title": ["Neurology review B"],
             "issued": {"date-parts": [[2019]]},
             "container-title": ["Cochrane Database of Systematic Reviews"]},
            {"DOI": "10.1002/14651858.CD000012", "title": ["Neurology review C"],
             "issued": {"date-parts": [[2015, 1, 1]]},
             "container-title": ["Cochrane Database of Systematic Reviews"]}
        ]}}"#,
    )
    .unwrap()
}

fn neurology() -> Topic {
    Topic::new("Neurology", "z1209270544087566967307064976193")
}

#[tokio::test]
async fn test_two_pages_of_two_reviews_give_four_lines() {
    let site = Site::new()
        .route("_cur=1", 200, listing(&["CD000001", "CD000002"]))
        .route("_cur=2", 200, listing(&["CD000003", "CD000004"]))
        .route("/search", 200, NO_RESULTS)
        .route("CD000001", 200, review("CD000001"))
        .route("CD000002", 200, review("CD000002"))
        .route("CD000003", 200, review("CD000003"))
        .route("CD000004", 200, review("CD000004"));
    let site = Arc::new(site);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let mut writer = RecordWriter::create(&path, false).unwrap();

    let crawler = Crawler::new(site.clone(), neurology(), settings(5));
    let summary = crawler.run(&mut writer).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::EndOfResults);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.primary_records, 4);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "https://onlinelibrary.wiley.com/doi/10.1002/14651858.CD000001/full|Neurology|Review CD000001|Smith J, Jones K|2022-02-14"
    );
    assert!(lines.iter().all(|l| l.split('|').count() == 5));
    assert_eq!(site.hits_containing("CD000003/full"), 1);
}

#[tokio::test]
async fn test_review_seen_on_two_pages_is_written_once() {
    let site = Site::new()
        .route("_cur=1", 200, listing(&["CD000001", "CD000002"]))
        .route("_cur=2", 200, listing(&["CD000002", "CD000003"]))
        .route("CD00000", 200, review("X"));
    let site = Arc::new(site);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let mut writer = RecordWriter::create(&path, false).unwrap();

    let summary = Crawler::new(site.clone(), neurology(), settings(2))
        .run(&mut writer)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::MaxPages);
    assert_eq!(summary.primary_records, 3);
    assert_eq!(RecordReader::read_path(&path).unwrap().len(), 3);
    assert_eq!(site.hits_containing("CD000002/full"), 1);
}

#[tokio::test]
async fn test_challenged_listing_switches_to_fallback() {
    let site = Arc::new(Site::new().route(
        "/search",
        200,
        "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>",
    ));

    let works = neurology_works();
    let search = Arc::new(StaticWorks {
        page: works,
        calls: Mutex::new(0),
    });
    let resolver = FallbackResolver::new(search.clone(), "Cochrane Database of Systematic Reviews");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let mut writer = RecordWriter::create(&path, false).unwrap();

    let summary = Crawler::new(site.clone(), neurology(), settings(5))
        .with_fallback(resolver)
        .run(&mut writer)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Blocked);
    assert_eq!(summary.pages_fetched, 0);
    assert_eq!(summary.primary_records, 0);
    assert!(summary.fallback_records <= 2);
    assert!(summary.fallback_records > 0);
    assert_eq!(site.hits_containing("/search"), 7);
    assert!(*search.calls.lock().unwrap() >= 1);

    let comments = RecordReader::read_comments(&path).unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].starts_with(&format!("CHALLENGE_DETECTED|Neurology|{}/search?", ORIGIN)));
    assert!(comments[0].ends_with('|'));

    let records = RecordReader::read_path(&path).unwrap();
    assert_eq!(records.len(), summary.fallback_records);
    assert_eq!(records[0].title, "Neurology review A");
    assert_eq!(records[0].date, "2021-05-02");
    assert!(records.iter().all(|r| r.topic == "Neurology"));

    let first_line = std::fs::read_to_string(&path).unwrap();
    assert!(first_line.starts_with("# CHALLENGE_DETECTED|"));
}

#[tokio::test]
async fn test_forbidden_listing_switches_to_fallback() {
    let site = Arc::new(Site::new().route("/search", 403, "Forbidden"));
    let search = Arc::new(StaticWorks {
        page: neurology_works(),
        calls: Mutex::new(0),
    });
    let resolver = FallbackResolver::new(search.clone(), "Cochrane Database of Systematic Reviews");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let mut writer = RecordWriter::create(&path, false).unwrap();

    let summary = Crawler::new(site.clone(), neurology(), settings(5))
        .with_fallback(resolver)
        .run(&mut writer)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Blocked);
    assert_eq!(site.hits_containing("/search"), 7);
    assert_eq!(summary.fallback_records, 2);
    assert!(*search.calls.lock().unwrap() >= 1);

    let comments = RecordReader::read_comments(&path).unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].starts_with("CHALLENGE_DETECTED|Neurology|"));

    let records = RecordReader::read_path(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Neurology review A");
    assert_eq!(records[1].title, "Neurology review B");
}

#[tokio::test]
async fn test_challenge_without_fallback_writes_error_line() {
    let site = Arc::new(Site::new().route("/search", 200, "Please complete the CAPTCHA"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let mut writer = RecordWriter::create(&path, false).unwrap();

    let summary = Crawler::new(site, neurology(), settings(5))
        .run(&mut writer)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Blocked);
    assert_eq!(summary.total_records(), 0);
    let comments = RecordReader::read_comments(&path).unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].starts_with("ERROR_FETCHING|"));
    assert!(comments[0].ends_with("challenge/robot page detected"));
}

#[tokio::test]
async fn test_append_keeps_previous_run() {
    let site = Arc::new(
        Site::new()
            .route("_cur=1", 200, listing(&["CD000001"]))
            .route("CD000001", 200, review("CD000001")),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");

    for append in [false, true] {
        let mut writer = RecordWriter::create(&path, append).unwrap();
        Crawler::new(site.clone(), neurology(), settings(1))
            .run(&mut writer)
            .await
            .unwrap();
    }
    assert_eq!(RecordReader::read_path(&path).unwrap().len(), 2);
}
