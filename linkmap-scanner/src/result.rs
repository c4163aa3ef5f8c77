use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What one worker produced for one dequeued location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub source: String,
    pub links: Vec<String>,
    pub content_length: Option<usize>,
    pub fetch_time: Duration,
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn new(source: String, links: Vec<String>) -> Self {
        Self {
            source,
            links,
            content_length: None,
            fetch_time: Duration::from_secs(0),
            error: None,
        }
    }

    pub fn with_error(source: String, error: String) -> Self {
        Self {
            source,
            links: Vec::new(),
            content_length: None,
            fetch_time: Duration::from_secs(0),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// `source` links to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrawlEdge {
    pub source: String,
    pub target: String,
}

impl CrawlEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl From<(&str, &str)> for CrawlEdge {
    fn from((source, target): (&str, &str)) -> Self {
        Self::new(source, target)
    }
}

/// A location that could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub location: String,
    pub error: String,
}

/// Everything a crawl produced.
///
/// `edges` is in result-arrival order, which differs between runs; only the
/// links of a single source keep the extractor's sorted order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub edges: Vec<CrawlEdge>,
    /// Every location admitted for crawling, in admission order.
    pub queued: Vec<String>,
    /// Locations a worker returned a result for.
    pub crawled: usize,
    pub failures: Vec<CrawlFailure>,
    /// The crawl was stopped through its cancellation token before the
    /// frontier drained.
    pub cancelled: bool,
}

impl CrawlOutcome {
    /// Targets linked from `source`, in the order they were recorded.
    pub fn links_from<'a>(&'a self, source: &str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |edge| edge.source == source)
            .map(|edge| edge.target.as_str())
    }

    pub fn into_edges(self) -> Vec<CrawlEdge> {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_result_with_error_has_no_links() {
        let result = CrawlResult::with_error("http://a".into(), "boom".into());
        assert!(!result.is_success());
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_links_from_filters_by_source() {
        let outcome = CrawlOutcome {
            edges: vec![
                ("http://a", "http://a/b").into(),
                ("http://x", "http://a/b").into(),
                ("http://a", "http://a/c").into(),
            ],
            ..Default::default()
        };

        let links: Vec<&str> = outcome.links_from("http://a").collect();
        assert_eq!(links, vec!["http://a/b", "http://a/c"]);
    }

    #[test]
    fn test_edge_serializes_as_object() {
        let edge = CrawlEdge::new("http://a", "http://b");
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(json, r#"{"source":"http://a","target":"http://b"}"#);
    }
}
