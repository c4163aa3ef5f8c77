//! Fetch-and-extract workers.
//!
//! Workers share one pending-work receiver and report every dequeued location
//! on the results channel exactly once. They never touch crawl state; the
//! orchestrator owns all bookkeeping.

use crate::error::ScanError;
use crate::extractor::LinkExtractor;
use crate::fetcher::Fetcher;
use crate::result::CrawlResult;
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

type WorkQueue = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

/// Collaborators shared by every worker of a pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub progress_callback: Option<ProgressCallback>,
    pub cancel: CancellationToken,
}

/// Handle on a running pool of workers and their supervisor.
pub struct WorkerPool {
    supervisor: JoinHandle<()>,
    workers: Vec<AbortHandle>,
}

/// Start `worker_count` workers pulling from `pending` and pushing into
/// `results`.
///
/// A supervisor task waits for every worker to exit before dropping its
/// results sender, so the results channel closes only once the whole pool
/// is gone.
pub fn spawn_pool(
    worker_count: usize,
    pending: mpsc::UnboundedReceiver<String>,
    results: mpsc::Sender<CrawlResult>,
    context: WorkerContext,
) -> WorkerPool {
    let queue: WorkQueue = Arc::new(Mutex::new(pending));
    let context = Arc::new(context);

    let handles: Vec<JoinHandle<()>> = (0..worker_count)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                queue.clone(),
                results.clone(),
                context.clone(),
            ))
        })
        .collect();
    let workers = handles.iter().map(JoinHandle::abort_handle).collect();

    let supervisor = tokio::spawn(async move {
        for (worker_id, outcome) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = outcome
                && !e.is_cancelled()
            {
                warn!("Worker {} terminated abnormally: {}", worker_id, e);
            }
        }
        debug!("All workers exited, closing results channel");
        drop(results);
    });

    WorkerPool {
        supervisor,
        workers,
    }
}

impl WorkerPool {
    /// Wait up to `grace` for the pool to wind down, then abort whatever is
    /// still running.
    pub async fn shutdown(self, grace: Duration) {
        let WorkerPool {
            mut supervisor,
            workers,
        } = self;

        if tokio::time::timeout(grace, &mut supervisor).await.is_err() {
            warn!(
                "Workers still busy after {:?}, aborting {} worker(s)",
                grace,
                workers.len()
            );
            for worker in &workers {
                worker.abort();
            }
            supervisor.abort();
        }
    }
}

async fn run_worker(
    worker_id: usize,
    queue: WorkQueue,
    results: mpsc::Sender<CrawlResult>,
    context: Arc<WorkerContext>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = {
            let mut pending = queue.lock().await;
            tokio::select! {
                biased;
                _ = context.cancel.cancelled() => None,
                location = pending.recv() => location,
            }
        };
        let Some(location) = next else {
            break;
        };

        // A panicking progress callback still yields a result for this location.
        let processed = AssertUnwindSafe(async {
            if let Some(ref callback) = context.progress_callback {
                callback(worker_id, location.clone());
            }
            process_location(&context, &location).await
        })
        .catch_unwind();
        let result = tokio::select! {
            biased;
            _ = context.cancel.cancelled() => {
                debug!("Worker {} abandoning {}", worker_id, location);
                break;
            }
            outcome = processed => outcome.unwrap_or_else(|_| {
                warn!("Worker {} panicked while handling {}", worker_id, location);
                CrawlResult::with_error(location.clone(), "worker panicked".to_string())
            }),
        };

        tokio::select! {
            biased;
            _ = context.cancel.cancelled() => break,
            sent = results.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Worker {} finished", worker_id);
}

/// Fetch `location` and extract its links. Failures of either step become
/// an error result with no links.
async fn process_location(context: &WorkerContext, location: &str) -> CrawlResult {
    let start = Instant::now();

    let content = match context.fetcher.fetch(location).await {
        Ok(content) => content,
        Err(e) => {
            log_failure("fetch content from", location, &e);
            let mut result = CrawlResult::with_error(location.to_string(), e.to_string());
            result.fetch_time = start.elapsed();
            return result;
        }
    };
    let fetch_time = start.elapsed();

    match context.extractor.extract(&content, location) {
        Ok(links) => {
            debug!("Crawled {} and found {} other unique links", location, links.len());
            let mut result = CrawlResult::new(location.to_string(), links);
            result.content_length = Some(content.len());
            result.fetch_time = fetch_time;
            result
        }
        Err(e) => {
            log_failure("parse content from", location, &e);
            let mut result = CrawlResult::with_error(location.to_string(), e.to_string());
            result.content_length = Some(content.len());
            result.fetch_time = fetch_time;
            result
        }
    }
}

fn log_failure(action: &str, location: &str, e: &ScanError) {
    if e.is_per_location() {
        warn!("Failed to {} {}: {}", action, location, e);
    } else {
        error!("Failed to {} {} (unexpected error kind): {}", action, location, e);
    }
}
