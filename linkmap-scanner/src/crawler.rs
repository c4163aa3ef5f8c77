use crate::error::{Result, ScanError};
use crate::extractor::{HtmlLinkExtractor, LinkExtractor};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::location::{BlockList, normalize};
use crate::result::{CrawlEdge, CrawlFailure, CrawlOutcome, CrawlResult};
use crate::worker::{self, ProgressCallback, WorkerContext};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type ResultCallback = Arc<dyn Fn(&CrawlResult) + Send + Sync>;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Crawls a link graph outward from a set of seed locations.
///
/// Pages are crawled on a best-effort basis: a location that cannot be
/// fetched or parsed contributes no edges, and the crawl carries on.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    workers: usize,
    block_list: BlockList,
    shutdown_grace: Duration,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor::new()),
            workers: DEFAULT_WORKERS,
            block_list: BlockList::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            progress_callback: None,
            result_callback: None,
        }
    }

    /// A crawler fetching over HTTP with the given request timeout.
    pub fn with_http_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::with_timeout(timeout_secs)?)))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_block_list(mut self, block_list: BlockList) -> Self {
        self.block_list = block_list;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn block_list(&self) -> &BlockList {
        &self.block_list
    }

    /// Crawl outward from `seeds`, fetching at most `limit` distinct
    /// locations.
    ///
    /// Only the first `limit` seeds are admitted. Every link found is
    /// recorded as an edge, including links that are never crawled because
    /// they are blocked or over budget.
    pub async fn crawl<S: AsRef<str>>(&self, seeds: &[S], limit: usize) -> Result<CrawlOutcome> {
        self.crawl_with_cancellation(seeds, limit, CancellationToken::new())
            .await
    }

    /// Like [`Crawler::crawl`], stopping early once `cancel` fires.
    ///
    /// A cancelled crawl returns the edges gathered so far with
    /// `cancelled` set. In-flight fetches are abandoned and the workers get
    /// the shutdown grace period to exit before being aborted.
    pub async fn crawl_with_cancellation<S: AsRef<str>>(
        &self,
        seeds: &[S],
        limit: usize,
        cancel: CancellationToken,
    ) -> Result<CrawlOutcome> {
        if seeds.is_empty() {
            return Err(ScanError::InvalidInput(
                "must specify seed location(s)".to_string(),
            ));
        }
        if limit < 1 {
            return Err(ScanError::InvalidInput(
                "must crawl at least 1 page".to_string(),
            ));
        }
        if self.workers < 1 {
            return Err(ScanError::InvalidInput(
                "must run at least 1 worker".to_string(),
            ));
        }

        // More workers than locations would only ever sit idle.
        let workers = self.workers.min(limit);
        info!(
            "Starting crawl of {} seed(s) with {} workers, limit {}",
            seeds.len(),
            workers,
            limit
        );

        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let (results_tx, mut results_rx) = mpsc::channel(workers);

        let mut frontier = Frontier::new(limit, pending_tx);
        for seed in seeds.iter().take(limit) {
            frontier.admit(seed.as_ref().to_string());
        }

        let worker_cancel = cancel.child_token();
        let pool = worker::spawn_pool(
            workers,
            pending_rx,
            results_tx,
            WorkerContext {
                fetcher: self.fetcher.clone(),
                extractor: self.extractor.clone(),
                progress_callback: self.progress_callback.clone(),
                cancel: worker_cancel.clone(),
            },
        );

        let mut cancelled = false;
        while !frontier.is_done() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        "Crawl cancelled with {} location(s) outstanding",
                        frontier.outstanding()
                    );
                    cancelled = true;
                    break;
                }
                received = results_rx.recv() => match received {
                    Some(result) => {
                        if let Some(ref callback) = self.result_callback {
                            callback(&result);
                        }
                        frontier.record(result, &self.block_list);
                    }
                    None => {
                        warn!(
                            "Workers exited with {} location(s) outstanding",
                            frontier.outstanding()
                        );
                        break;
                    }
                },
            }
        }

        // Nothing more will be admitted; idle workers drain and exit.
        frontier.close();
        drop(results_rx);
        if cancelled {
            worker_cancel.cancel();
        }
        pool.shutdown(self.shutdown_grace).await;

        let outcome = frontier.into_outcome(cancelled);
        info!(
            "Crawl complete. Crawled {} of {} queued location(s), recorded {} edge(s), {} failure(s)",
            outcome.crawled,
            outcome.queued.len(),
            outcome.edges.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

/// Crawl state owned by the single consuming loop.
///
/// `queued` holds every location ever admitted; a location enters it at most
/// once and it never grows past `limit`. `outstanding` counts admitted
/// locations whose result has not arrived yet.
struct Frontier {
    limit: usize,
    queued: HashSet<String>,
    admission_order: Vec<String>,
    outstanding: usize,
    pending: Option<mpsc::UnboundedSender<String>>,
    edges: Vec<CrawlEdge>,
    failures: Vec<CrawlFailure>,
    crawled: usize,
}

impl Frontier {
    fn new(limit: usize, pending: mpsc::UnboundedSender<String>) -> Self {
        Self {
            limit,
            queued: HashSet::new(),
            admission_order: Vec::new(),
            outstanding: 0,
            pending: Some(pending),
            edges: Vec::new(),
            failures: Vec::new(),
            crawled: 0,
        }
    }

    /// Queue `location` for crawling unless it was queued before or the
    /// budget is spent. Returns whether it was admitted.
    ///
    /// Locations are keyed on their normalized form, so `http://a.com/` and
    /// `http://a.com` are the same entry.
    fn admit(&mut self, location: String) -> bool {
        let location = normalize(&location);
        if self.queued.len() >= self.limit || self.queued.contains(&location) {
            return false;
        }
        let Some(ref pending) = self.pending else {
            return false;
        };
        if pending.send(location.clone()).is_err() {
            warn!("Work queue has no workers left, not queuing {}", location);
            return false;
        }

        debug!("Queued {}", location);
        self.queued.insert(location.clone());
        self.admission_order.push(location);
        self.outstanding += 1;

        if self.queued.len() == self.limit {
            debug!("Crawl limit of {} reached", self.limit);
            self.close();
        }
        true
    }

    /// Record one worker result: an edge for every link, and admission for
    /// links that are new and allowed.
    fn record(&mut self, result: CrawlResult, block_list: &BlockList) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.crawled += 1;

        let CrawlResult {
            source,
            links,
            error,
            ..
        } = result;

        if let Some(error) = error {
            self.failures.push(CrawlFailure {
                location: source.clone(),
                error,
            });
        }

        for link in links {
            self.edges.push(CrawlEdge::new(source.as_str(), link.as_str()));

            if self.queued.contains(&normalize(&link)) {
                continue;
            }
            if !block_list.is_allowed(&link) {
                debug!("Not crawling blocked location {}", link);
                continue;
            }
            self.admit(link);
        }
    }

    /// Stop accepting work. Dropping the sender lets idle workers finish.
    fn close(&mut self) {
        if self.pending.take().is_some() {
            debug!("Closing work queue");
        }
    }

    fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Every admitted location has reported back. With nothing in flight no
    /// further admissions can happen, whether or not the limit was reached.
    fn is_done(&self) -> bool {
        self.outstanding == 0
    }

    fn into_outcome(self, cancelled: bool) -> CrawlOutcome {
        CrawlOutcome {
            edges: self.edges,
            queued: self.admission_order,
            crawled: self.crawled,
            failures: self.failures,
            cancelled,
        }
    }
}
