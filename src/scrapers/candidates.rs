//! Listing URL variants for one page of a topic.
//!
//! The search portlet answers to several parameter dialects depending on the
//! skin in front of it. Names and values below are the portal's wire contract
//! and must stay byte-for-byte as they are.

use url::form_urlencoded;

const PORTLET_ID: &str = "scolarissearchresultsportlet_WAR_scolarissearchresults";
const NAMESPACE: &str = "_scolarissearchresultsportlet_WAR_scolarissearchresults_";

const SEARCH_PATH: &str = "/search";
const PORTAL_SEARCH_PATH: &str = "/web/cochrane/search";

/// Ordered query parameters for one variant.
#[derive(Debug, Clone, Default)]
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Portal routing parameters shared by every variant.
    fn portlet() -> Self {
        let mut params = Self::default();
        params.raw("p_p_id", PORTLET_ID);
        params.raw("p_p_lifecycle", "0");
        params.raw("p_p_state", "normal");
        params.raw("p_p_mode", "view");
        params
    }

    fn raw(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.push((key.to_string(), value.into()));
        self
    }

    /// Add a key under the portlet namespace.
    fn ns(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.push((format!("{NAMESPACE}{key}"), value.into()));
        self
    }

    fn remove(&mut self, key: &str) -> &mut Self {
        self.0.retain(|(k, _)| k != key);
        self
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

/// Inputs shared by every variant of one page request.
struct PageQuery<'a> {
    topic_name: &'a str,
    topic_id: &'a str,
    page: u32,
    page_size: u32,
}

impl PageQuery<'_> {
    /// The form a real browser session submits.
    fn exact(&self) -> QueryParams {
        let mut p = QueryParams::portlet();
        p.raw("p_p_col_id", "column-1")
            .raw("p_p_col_count", "1")
            .ns("displayText", self.topic_name)
            .ns("searchText", self.topic_name)
            .ns("searchType", "basic")
            .ns("facetQueryField", "topic_id")
            .ns("searchBy", "13")
            .ns("orderBy", "displayDate-true")
            .ns("facetDisplayName", self.topic_name)
            .ns("facetQueryTerm", self.topic_id)
            .ns("facetCategory", "Topics")
            .ns("delta", self.page_size.to_string())
            .ns("cur", self.page.to_string());
        p
    }

    fn isolated_namespaced(&self) -> QueryParams {
        let mut p = QueryParams::portlet();
        p.raw("p_p_isolated", "1")
            .ns("displayText", self.topic_name)
            .ns("searchText", self.topic_name)
            .ns("searchType", "basic")
            .ns("searchBy", "13")
            .ns("orderBy", "displayDate-true")
            .ns("cur", self.page.to_string())
            .ns("delta", self.page_size.to_string())
            .ns("facetQueryField", "topic_id")
            .ns("facetQueryTerm", self.topic_id)
            .ns("facetDisplayName", self.topic_name)
            .ns("facetCategory", "Topics")
            .ns("selectedType", "review")
            .ns("forceTypeSelection", "true");
        p
    }

    fn isolated_offset(&self) -> QueryParams {
        let mut p = self.isolated_namespaced();
        let start = u64::from(self.page - 1) * u64::from(self.page_size);
        p.ns("start", start.to_string());
        p
    }

    fn isolated_unprefixed(&self) -> QueryParams {
        let mut p = QueryParams::portlet();
        p.raw("p_p_isolated", "1")
            .raw("displayText", self.topic_name)
            .raw("searchText", self.topic_name)
            .raw("searchType", "basic")
            .raw("searchBy", "13")
            .raw("orderBy", "displayDate-true")
            .raw("cur", self.page.to_string())
            .raw("resultPerPage", self.page_size.to_string())
            .raw("facetQueryField", "topic_id")
            .raw("facetQueryTerm", self.topic_id)
            .raw("facetDisplayName", self.topic_name)
            .raw("facetCategory", "Topics")
            .raw("selectedType", "review")
            .raw("forceTypeSelection", "true");
        p
    }

    fn legacy(&self) -> QueryParams {
        let mut p = self.isolated_namespaced();
        p.remove("p_p_isolated")
            .raw("p_p_col_id", "column-1")
            .raw("p_p_col_count", "1");
        p
    }
}

/// Build the ordered listing URLs to try for one page, most reliable first.
///
/// `page` is 1-based. The result always has seven entries.
pub fn build_candidates(
    origin: &str,
    topic_name: &str,
    topic_id: &str,
    page: u32,
    page_size: u32,
) -> Vec<String> {
    let origin = origin.trim_end_matches('/');
    let query = PageQuery {
        topic_name,
        topic_id,
        page: page.max(1),
        page_size,
    };

    [
        (SEARCH_PATH, query.exact()),
        (SEARCH_PATH, query.isolated_namespaced()),
        (SEARCH_PATH, query.isolated_offset()),
        (SEARCH_PATH, query.isolated_unprefixed()),
        (PORTAL_SEARCH_PATH, query.isolated_namespaced()),
        (SEARCH_PATH, query.legacy()),
        (PORTAL_SEARCH_PATH, query.legacy()),
    ]
    .into_iter()
    .map(|(path, params)| format!("{origin}{path}?{}", params.encode()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.cochranelibrary.com";

    fn candidates() -> Vec<String> {
        build_candidates(ORIGIN, "Ear, nose & throat", "z1506030924307755598196034641807", 3, 25)
    }

    #[test]
    fn test_seven_variants_in_order() {
        let urls = candidates();
        assert_eq!(urls.len(), 7);
        assert!(urls[0].starts_with("https://www.cochranelibrary.com/search?p_p_id="));
        assert!(urls[0].contains("p_p_col_id=column-1"));
        assert!(urls[1].contains("p_p_isolated=1"));
        assert!(urls[2].contains(&format!("{NAMESPACE}start=50")));
        assert!(urls[3].contains("&resultPerPage=25"));
        assert!(urls[4].starts_with("https://www.cochranelibrary.com/web/cochrane/search?"));
        assert!(!urls[5].contains("p_p_isolated"));
        assert!(urls[5].ends_with("p_p_col_id=column-1&p_p_col_count=1"));
        assert!(urls[6].starts_with("https://www.cochranelibrary.com/web/cochrane/search?"));
    }

    #[test]
    fn test_exact_variant_ends_with_delta_and_page() {
        let urls = candidates();
        assert!(urls[0].ends_with(&format!("{NAMESPACE}delta=25&{NAMESPACE}cur=3")));
        assert!(urls[0].contains(&format!(
            "{NAMESPACE}facetQueryTerm=z1506030924307755598196034641807"
        )));
    }

    #[test]
    fn test_topic_name_is_form_encoded() {
        let urls = candidates();
        assert!(urls[0].contains(&format!("{NAMESPACE}displayText=Ear%2C+nose+%26+throat")));
        assert!(urls.iter().all(|u| !u.contains(' ')));
    }

    #[test]
    fn test_first_page_offset_is_zero() {
        let urls = build_candidates(ORIGIN, "Neurology", "z1", 1, 10);
        assert!(urls[2].contains(&format!("{NAMESPACE}start=0")));
    }

    #[test]
    fn test_large_page_offset_does_not_wrap() {
        let urls = build_candidates(ORIGIN, "Neurology", "z1", 50_000_000, 100);
        assert_eq!(urls.len(), 7);
        assert!(urls[2].contains(&format!("{NAMESPACE}start=4999999900")));
        assert!(urls[0].ends_with(&format!("{NAMESPACE}cur=50000000")));
    }
}
