// Tests for crawl execution and reporting

use linkmap_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl_with, extract_url_path,
    generate_crawl_report,
};
use linkmap_core::error::CoreError;
use linkmap_scanner::{
    BlockList, CancellationToken, CrawlEdge, CrawlFailure, CrawlOutcome, StaticFetcher,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn options(seeds: &[&str], limit: usize) -> CrawlOptions {
    CrawlOptions {
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
        limit,
        workers: 4,
        block_list: BlockList::default(),
        timeout_secs: 5,
        shutdown_grace: Duration::from_millis(500),
        show_progress_bars: false,
    }
}

fn small_site() -> Arc<StaticFetcher> {
    Arc::new(
        StaticFetcher::new()
            .with_page(
                "http://site",
                r#"<a href="/about">about</a><a href="/missing">gone</a>"#,
            )
            .with_page("http://site/about", r#"<a href="http://site/">home</a>"#),
    )
}

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(extract_url_path("http://example.com/docs/v1/intro"), "/docs/v1/intro");
}

#[test]
fn test_extract_url_path_drops_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/page?key=value#top"), "/page");
}

#[test]
fn test_extract_url_path_keeps_trailing_slash() {
    assert_eq!(extract_url_path("http://example.com/blog/"), "/blog/");
}

#[test]
fn test_extract_url_path_invalid_url() {
    // Non-URL locations are shown as-is
    assert_eq!(extract_url_path("not a valid url"), "not a valid url");
}

#[test]
fn test_extract_url_path_ipv6_and_port() {
    assert_eq!(extract_url_path("http://[::1]:8080/admin"), "/admin");
}

// ============================================================================
// Crawl Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_collects_edges_and_failures() {
    let outcome = execute_crawl_with(
        options(&["http://site"], 10),
        small_site(),
        None,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.queued.len(), 3);
    assert_eq!(outcome.crawled, 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].location, "http://site/missing");
    assert!(outcome.edges.contains(&CrawlEdge::new("http://site/about", "http://site")));
}

#[tokio::test]
async fn test_execute_crawl_reports_failures_through_callback() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let callback: CrawlProgressCallback = Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    execute_crawl_with(
        options(&["http://site"], 10),
        small_site(),
        Some(callback),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages[0].contains("1 seed(s)"));
    assert!(
        messages
            .iter()
            .any(|msg| msg.contains("Failed to crawl http://site/missing"))
    );
}

#[tokio::test]
async fn test_execute_crawl_honours_block_list() {
    let mut opts = options(&["http://site"], 10);
    opts.block_list = BlockList::new(["about"]);

    let outcome = execute_crawl_with(opts, small_site(), None, CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.queued.iter().any(|location| location.contains("about")));
    assert!(outcome.edges.contains(&CrawlEdge::new("http://site", "http://site/about")));
}

#[tokio::test]
async fn test_execute_crawl_without_seeds_fails() {
    let err = execute_crawl_with(options(&[], 10), small_site(), None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Scan(_)));
}

#[tokio::test]
async fn test_execute_crawl_cancelled_before_start() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = execute_crawl_with(options(&["http://site"], 10), small_site(), None, cancel)
        .await
        .unwrap();
    assert!(outcome.cancelled);
}

// ============================================================================
// Report Tests
// ============================================================================

fn sample_outcome() -> CrawlOutcome {
    CrawlOutcome {
        edges: vec![
            ("https://example.com", "https://example.com/about").into(),
            ("https://example.com", "https://docs.example.org/start").into(),
            ("https://example.com/about", "https://docs.example.org/start").into(),
        ],
        queued: vec![
            "https://example.com".into(),
            "https://example.com/about".into(),
            "https://docs.example.org/start".into(),
        ],
        crawled: 3,
        failures: vec![CrawlFailure {
            location: "https://docs.example.org/start".into(),
            error: "fetch error: connection refused".into(),
        }],
        cancelled: false,
    }
}

#[test]
fn test_generate_crawl_report_summary() {
    let report = generate_crawl_report(&sample_outcome());

    assert!(report.contains("Locations queued: 3"));
    assert!(report.contains("Locations crawled: 3"));
    assert!(report.contains("Failures: 1"));
    assert!(report.contains("Distinct locations seen: 3"));
    assert!(report.contains("Links recorded: 3"));
    assert!(!report.contains("cancelled"));
}

#[test]
fn test_generate_crawl_report_groups_by_host() {
    let report = generate_crawl_report(&sample_outcome());

    let docs = report.find("## docs.example.org").unwrap();
    let main = report.find("## example.com").unwrap();
    assert!(docs < main, "hosts should be sorted");
    assert!(report.contains("✓ /about (1 links)"));
    assert!(report.contains("✓ / (2 links)"));
    assert!(report.contains("✗ /start (0 links)"));
}

#[test]
fn test_generate_crawl_report_most_linked_and_failures() {
    let report = generate_crawl_report(&sample_outcome());

    let most_linked = report.split("## Most linked").nth(1).unwrap();
    let first_line = most_linked.lines().nth(1).unwrap();
    assert!(first_line.contains("2  https://docs.example.org/start"));
    assert!(report.contains("## Failures"));
    assert!(report.contains("connection refused"));
}

#[test]
fn test_generate_crawl_report_marks_cancellation() {
    let outcome = CrawlOutcome {
        cancelled: true,
        ..sample_outcome()
    };
    assert!(generate_crawl_report(&outcome).contains("cancelled before the frontier drained"));
}
