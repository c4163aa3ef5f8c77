use indicatif::{ProgressBar, ProgressStyle};
use linkmap_scanner::{
    BlockList, CancellationToken, CrawlOutcome, CrawlResult, Crawler, Fetcher, HttpFetcher,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use crate::config::CrawlSettings;
use crate::error::{CoreError, Result};
use crate::graph::LinkGraph;

const REPORT_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const MOST_LINKED_SHOWN: usize = 10;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    pub limit: usize,
    pub workers: usize,
    pub block_list: BlockList,
    pub timeout_secs: u64,
    pub shutdown_grace: Duration,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn from_settings(settings: &CrawlSettings, show_progress_bars: bool) -> Self {
        Self {
            seeds: settings.seeds.clone(),
            limit: settings.limit,
            workers: settings.workers,
            block_list: settings.block_list.iter().cloned().collect(),
            timeout_secs: settings.timeout_secs,
            shutdown_grace: Duration::from_millis(settings.shutdown_grace_ms),
            show_progress_bars,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting crawl...");
    pb
}

/// Execute a crawl over HTTP with the given options
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    cancel: CancellationToken,
) -> Result<CrawlOutcome> {
    let fetcher = Arc::new(HttpFetcher::with_timeout(options.timeout_secs)?);
    execute_crawl_with(options, fetcher, progress_callback, cancel).await
}

/// Execute a crawl using `fetcher` to retrieve content
pub async fn execute_crawl_with(
    options: CrawlOptions,
    fetcher: Arc<dyn Fetcher>,
    progress_callback: Option<CrawlProgressCallback>,
    cancel: CancellationToken,
) -> Result<CrawlOutcome> {
    let CrawlOptions {
        seeds,
        limit,
        workers,
        block_list,
        timeout_secs: _,
        shutdown_grace,
        show_progress_bars,
    } = options;

    let progress_bar = show_progress_bars.then(|| Arc::new(spinner()));
    let processed_count = Arc::new(AtomicUsize::new(0));

    let worker_progress: linkmap_scanner::ProgressCallback = match progress_bar.clone() {
        Some(pb) => {
            let count = processed_count.clone();
            Arc::new(move |worker_id: usize, location: String| {
                let n = count.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!(
                    "Crawling... {} of at most {} locations (worker {}: {})",
                    n,
                    limit,
                    worker_id,
                    extract_url_path(&location)
                ));
            })
        }
        None => {
            let count = processed_count.clone();
            Arc::new(move |_worker_id: usize, _location: String| {
                count.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    // Failures are surfaced as they arrive; the outcome keeps them too.
    let failure_cb = progress_callback.clone();
    let failure_pb = progress_bar.clone();
    let result_callback: linkmap_scanner::ResultCallback = Arc::new(move |result: &CrawlResult| {
        let Some(error) = result.error.as_deref() else {
            return;
        };
        let message = format!("[!] Failed to crawl {}: {}", result.source, error);
        match (&failure_cb, &failure_pb) {
            (Some(callback), Some(pb)) => pb.suspend(|| callback(message)),
            (Some(callback), None) => callback(message),
            (None, _) => {}
        }
    });

    if let Some(ref callback) = progress_callback {
        callback(format!(
            "Crawling from {} seed(s), limit {}, {} worker(s)",
            seeds.len(),
            limit,
            workers
        ));
    }

    let crawler = Crawler::new(fetcher)
        .with_workers(workers)
        .with_block_list(block_list)
        .with_shutdown_grace(shutdown_grace)
        .with_progress_callback(worker_progress)
        .with_result_callback(result_callback);

    let outcome = crawler.crawl_with_cancellation(&seeds, limit, cancel).await;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        match &outcome {
            Ok(outcome) if outcome.cancelled => {
                pb.finish_with_message(format!("Crawl cancelled after {} locations", total))
            }
            Ok(_) => pb.finish_with_message(format!("Crawl complete! {} locations processed", total)),
            Err(_) => pb.finish_and_clear(),
        }
    }

    outcome.map_err(CoreError::from)
}

/// Generate a crawl report from an outcome
pub fn generate_crawl_report(outcome: &CrawlOutcome) -> String {
    let graph = LinkGraph::from_edges(&outcome.edges);

    let mut report = String::new();
    report.push_str(REPORT_RULE);
    report.push_str("\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Locations queued: {}\n", outcome.queued.len()));
    report.push_str(&format!("  Locations crawled: {}\n", outcome.crawled));
    report.push_str(&format!("  Failures: {}\n", outcome.failures.len()));
    report.push_str(&format!("  Distinct locations seen: {}\n", graph.node_count()));
    report.push_str(&format!("  Links recorded: {}\n", outcome.edges.len()));
    if outcome.cancelled {
        report.push_str("  Crawl was cancelled before the frontier drained\n");
    }

    report.push('\n');
    report.push_str(REPORT_RULE);
    report.push_str("\n\n");

    // Group queued locations by host
    let mut by_host: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for location in &outcome.queued {
        let host = Url::parse(location)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "(unknown host)".to_string());
        by_host.entry(host).or_default().push(location);
    }

    for (host, locations) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} locations queued\n\n", locations.len()));

        for location in locations {
            let failed = outcome
                .failures
                .iter()
                .any(|failure| failure.location == *location);
            let marker = if failed { "✗" } else { "✓" };
            let links = outcome.links_from(location).count();
            report.push_str(&format!(
                "  {} {} ({} links)\n",
                marker,
                extract_url_path(location),
                links
            ));
        }
        report.push('\n');
    }

    let most_linked = graph.most_linked(MOST_LINKED_SHOWN);
    if !most_linked.is_empty() {
        report.push_str("## Most linked\n");
        for (location, count) in most_linked {
            report.push_str(&format!("  {:>4}  {}\n", count, location));
        }
        report.push('\n');
    }

    if !outcome.failures.is_empty() {
        report.push_str("## Failures\n");
        for failure in &outcome.failures {
            report.push_str(&format!("  {}: {}\n", failure.location, failure.error));
        }
        report.push('\n');
    }

    report
}
