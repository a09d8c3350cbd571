//! Asynchronous page collector with a completion barrier.
//!
//! `visit` hands a request to a bounded worker pool and returns immediately;
//! the registered handler runs on whichever worker receives the response, so
//! handlers for one stage interleave freely. `wait` blocks until the number of
//! outstanding requests reaches zero.

use super::fetcher::PageFetcher;
use super::request::{Request, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Callback invoked for every successful (HTTP 200) response.
pub type Handler = Arc<dyn Fn(&Response) + Send + Sync>;

/// Per-stage request accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Requests handed to the worker pool.
    pub dispatched: usize,
    /// Responses that reached the handler.
    pub completed: usize,
    /// Transport errors and non-200 responses.
    pub failed: usize,
    /// Requests refused before dispatch (host not allowed).
    pub skipped: usize,
}

enum Outcome {
    Handled,
    Failed,
}

pub struct Collector {
    fetcher: Arc<dyn PageFetcher>,
    workers: Arc<Semaphore>,
    allowed_domains: Arc<[String]>,
    handler: Handler,
    in_flight: JoinSet<Outcome>,
    summary: CrawlSummary,
}

impl Collector {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parallelism: usize,
        allowed_domains: &[String],
        handler: Handler,
    ) -> Self {
        Self {
            fetcher,
            workers: Arc::new(Semaphore::new(parallelism.max(1))),
            allowed_domains: allowed_domains.into(),
            handler,
            in_flight: JoinSet::new(),
            summary: CrawlSummary::default(),
        }
    }

    /// Whether `host` passes the allow-list. An empty list allows everything.
    pub fn is_allowed(allowed_domains: &[String], host: Option<&str>) -> bool {
        allowed_domains.is_empty()
            || host.is_some_and(|h| allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(h)))
    }

    /// Schedule `request`. Must be called from within a tokio runtime.
    pub fn visit(&mut self, request: Request) {
        let entity = request.token().map(|t| t.id());
        if !Self::is_allowed(&self.allowed_domains, request.url.host_str()) {
            warn!(url = %request.url, ?entity, "host not allowed, request skipped");
            self.summary.skipped += 1;
            return;
        }

        self.summary.dispatched += 1;
        let fetcher = Arc::clone(&self.fetcher);
        let workers = Arc::clone(&self.workers);
        let handler = Arc::clone(&self.handler);

        self.in_flight.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return Outcome::Failed;
            };

            match fetcher.fetch(&request).await {
                Ok(response) if response.status == 200 => {
                    debug!(url = %response.url, ?entity, "page fetched");
                    handler(&response);
                    Outcome::Handled
                }
                Ok(response) => {
                    warn!(url = %request.url, ?entity, status = response.status, "page not fetched");
                    Outcome::Failed
                }
                Err(e) => {
                    warn!(url = %request.url, ?entity, error = %e, "page not fetched");
                    Outcome::Failed
                }
            }
        });
    }

    /// Barrier: wait for every outstanding request, then return and reset
    /// the stage's accounting.
    pub async fn wait(&mut self) -> CrawlSummary {
        while let Some(joined) = self.in_flight.join_next().await {
            match joined {
                Ok(Outcome::Handled) => self.summary.completed += 1,
                Ok(Outcome::Failed) => self.summary.failed += 1,
                Err(e) => {
                    warn!(error = %e, "page worker aborted");
                    self.summary.failed += 1;
                }
            }
        }
        std::mem::take(&mut self.summary)
    }
}
