//! The three-stage crawl: hub → detail pages → redirect pages.
//!
//! Each stage dispatches its requests through a [`Collector`] and waits on the
//! collector's barrier before the next stage snapshots the store, so a stage
//! only ever reads records the previous one has finished writing.

use super::collector::{Collector, CrawlSummary, Handler};
use super::extract;
use super::fetcher::{HttpFetcher, PageFetcher};
use super::request::{Request, Response};
use crate::config::{CompiledRules, CrawlConfig};
use crate::entity::{EntityId, EntityRecord, EntityStore, LockedStore};
use crate::error::{HarvestError, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of a full crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub discovered: usize,
    pub detail: CrawlSummary,
    pub redirect: CrawlSummary,
    pub elapsed_ms: u64,
    pub records: Vec<EntityRecord>,
}

impl CrawlReport {
    /// Records whose asset URL was resolved.
    pub fn resolved(&self) -> usize {
        self.records.iter().filter(|r| r.asset_url.is_some()).count()
    }
}

/// Drives the crawl stages against one entity store.
pub struct Crawler {
    rules: Arc<CompiledRules>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn EntityStore>,
    parallelism: usize,
    allowed_domains: Vec<String>,
}

impl Crawler {
    pub fn new(
        config: &CrawlConfig,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn EntityStore>,
    ) -> Result<Self> {
        Ok(Self {
            rules: Arc::new(config.compile()?),
            fetcher,
            store,
            parallelism: config.parallelism,
            allowed_domains: config.allowed_domains.clone(),
        })
    }

    /// Crawler over HTTP with a fresh in-memory store.
    pub fn over_http(config: &CrawlConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.page_timeout(), config.page_retries);
        Self::new(config, Arc::new(fetcher), Arc::new(LockedStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Run all three stages. Fails only when the hub page is unreachable.
    pub async fn run(&self) -> Result<CrawlReport> {
        let start = Instant::now();

        info!(url = %self.rules.hub_url, "searching the hub page");
        let discovered = self.hub_stage().await?;
        info!(discovered, "hub stage complete");

        info!("visiting detail pages for asset page links");
        let detail = self.detail_stage().await;
        info!(?detail, "detail stage complete");

        info!("visiting asset pages for direct asset links");
        let redirect = self.redirect_stage().await;
        info!(?redirect, "redirect stage complete");

        let report = CrawlReport {
            discovered,
            detail,
            redirect,
            elapsed_ms: start.elapsed().as_millis() as u64,
            records: self.store.snapshot(),
        };
        info!(
            resolved = report.resolved(),
            elapsed_ms = report.elapsed_ms,
            "crawl finished"
        );
        Ok(report)
    }

    /// Stage 1: fetch the hub page and create one record per entity anchor.
    pub async fn hub_stage(&self) -> Result<usize> {
        let url = self.rules.hub_url.clone();
        let hub_error = |reason: String| HarvestError::HubUnreachable {
            url: url.to_string(),
            reason,
        };

        if !Collector::is_allowed(&self.allowed_domains, url.host_str()) {
            return Err(hub_error("host not in allowed domains".to_string()));
        }
        let response = self
            .fetcher
            .fetch(&Request::new(url.clone()))
            .await
            .map_err(|e| hub_error(e.to_string()))?;
        if response.status != 200 {
            return Err(hub_error(format!("HTTP {}", response.status)));
        }

        let entries = extract::hub_entries(&response.body, &response.url, &self.rules);
        for entry in &entries {
            self.store.create(entry.name.clone(), entry.url.to_string());
        }
        Ok(entries.len())
    }

    /// Stage 2: resolve each entity's asset-description page.
    pub async fn detail_stage(&self) -> CrawlSummary {
        let targets = detail_targets(&self.store.snapshot());
        let store = Arc::clone(&self.store);
        let rules = Arc::clone(&self.rules);

        self.run_stage(targets, move |response: &Response| {
            let Some(id) = response.read() else {
                warn!(url = %response.url, "detail response without correlation token");
                return;
            };
            match extract::asset_page_link(&response.body, &response.url, &rules) {
                Some(link) => {
                    if !store.set_redirect_url(id, link.to_string()) {
                        debug!(%id, "redirect URL not applied");
                    }
                }
                None => debug!(%id, "no asset page link on detail page"),
            }
        })
        .await
    }

    /// Stage 3: resolve the direct asset URL for entities that have a
    /// redirect page.
    pub async fn redirect_stage(&self) -> CrawlSummary {
        let targets = redirect_targets(&self.store.snapshot());
        let store = Arc::clone(&self.store);
        let rules = Arc::clone(&self.rules);

        self.run_stage(targets, move |response: &Response| {
            let Some(id) = response.read() else {
                warn!(url = %response.url, "asset page response without correlation token");
                return;
            };
            match extract::asset_link(&response.body, &response.url, &rules) {
                Some(link) => {
                    if !store.set_asset_url(id, link.to_string()) {
                        debug!(%id, "asset URL not applied");
                    }
                }
                None => debug!(%id, "no asset link on asset page"),
            }
        })
        .await
    }

    async fn run_stage<F>(&self, targets: Vec<(EntityId, Url)>, on_response: F) -> CrawlSummary
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(on_response);
        let mut collector = Collector::new(
            Arc::clone(&self.fetcher),
            self.parallelism,
            &self.allowed_domains,
            handler,
        );
        for (id, url) in targets {
            collector.visit(Request::new(url).attach(id));
        }
        collector.wait().await
    }
}

/// Stage-2 input: every record's detail page.
pub fn detail_targets(records: &[EntityRecord]) -> Vec<(EntityId, Url)> {
    records
        .iter()
        .filter_map(|r| parse_target(r.id, &r.source_page_url))
        .collect()
}

/// Stage-3 input: records whose redirect page is known.
pub fn redirect_targets(records: &[EntityRecord]) -> Vec<(EntityId, Url)> {
    records
        .iter()
        .filter_map(|r| r.redirect_url.as_deref().and_then(|u| parse_target(r.id, u)))
        .collect()
}

fn parse_target(id: EntityId, raw: &str) -> Option<(EntityId, Url)> {
    match Url::parse(raw) {
        Ok(url) => Some((id, url)),
        Err(e) => {
            warn!(%id, url = raw, error = %e, "unparseable URL, entity skipped");
            None
        }
    }
}
