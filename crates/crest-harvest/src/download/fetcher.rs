//! Bounded-concurrency asset downloader.
//!
//! One task per asset, admitted through a semaphore of width `concurrency`.
//! Inside the gate a unit sleeps a random courtesy delay, then tries the GET
//! up to `1 + max_retries` times: transport errors and 429s back off
//! exponentially, any other non-200 status fails at once. The body is
//! streamed to `out_dir/<normalized name>.<ext>`.

use super::naming;
use super::retry::{self, RetryPolicy, StatusClass};
use super::{DownloadFailure, DownloadReport, Downloaded};
use crate::config::DownloadConfig;
use crate::crawl::fetcher::build_client;
use crate::entity::{EntityId, EntityRecord};
use crate::error::{HarvestError, Result};
use crate::progress::{self, DownloadEvent, ProgressSender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Counts transfers currently on the wire and the highest count seen.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
    requests: AtomicUsize,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One unit of work, detached from the entity store.
#[derive(Debug, Clone)]
struct Unit {
    id: EntityId,
    name: String,
    url: Url,
}

#[derive(Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    concurrency: usize,
    start_jitter: Duration,
    out_dir: PathBuf,
    progress: Option<ProgressSender>,
}

impl AssetFetcher {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            client: build_client(Duration::from_millis(config.request_timeout_ms)),
            policy: RetryPolicy::from_config(config),
            concurrency: config.concurrency.max(1),
            start_jitter: Duration::from_millis(config.start_jitter_ms),
            out_dir: config.out_dir.clone(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Download every record that has an asset URL and wait for all of them.
    ///
    /// Fails only if the output directory cannot be created; per-asset
    /// failures are collected in the report.
    pub async fn fetch_all(&self, records: &[EntityRecord]) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(&self.out_dir).await?;

        let mut report = DownloadReport::default();
        let mut units = Vec::new();
        for record in records {
            let Some(raw) = record.asset_url.as_deref() else {
                report.skipped += 1;
                continue;
            };
            match Url::parse(raw) {
                Ok(url) => units.push(Unit {
                    id: record.id,
                    name: record.name.clone(),
                    url,
                }),
                Err(_) => report.failed.push(DownloadFailure {
                    id: record.id,
                    name: record.name.clone(),
                    url: raw.to_string(),
                    error: HarvestError::InvalidUrl(raw.to_string()).to_string(),
                }),
            }
        }

        info!(
            assets = units.len(),
            concurrency = self.concurrency,
            out_dir = %self.out_dir.display(),
            "downloading assets"
        );
        progress::emit(&self.progress, DownloadEvent::Started { total: units.len() });

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let in_flight = Arc::new(InFlight::default());
        let mut tasks = JoinSet::new();

        for unit in units {
            let this = self.clone();
            let gate = Arc::clone(&gate);
            let in_flight = Arc::clone(&in_flight);
            tasks.spawn(async move {
                let result = match gate.acquire_owned().await {
                    Ok(_permit) => {
                        tokio::time::sleep(retry::random_up_to(this.start_jitter)).await;
                        this.download(&unit, &in_flight).await
                    }
                    Err(e) => Err(HarvestError::Io(std::io::Error::other(e))),
                };
                progress::emit(
                    &this.progress,
                    DownloadEvent::Finished {
                        id: unit.id,
                        name: unit.name.clone(),
                        ok: result.is_ok(),
                    },
                );
                (unit, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((unit, Ok(path))) => {
                    info!(id = %unit.id, name = %unit.name, path = %path.display(), "asset downloaded");
                    report.downloaded.push(Downloaded {
                        id: unit.id,
                        name: unit.name,
                        path,
                    });
                }
                Ok((unit, Err(e))) => {
                    warn!(id = %unit.id, name = %unit.name, error = %e, "asset download failed");
                    report.failed.push(DownloadFailure {
                        id: unit.id,
                        name: unit.name,
                        url: unit.url.to_string(),
                        error: e.to_string(),
                    });
                }
                Err(e) => warn!(error = %e, "download task aborted"),
            }
        }

        report.requests = in_flight.requests.load(Ordering::SeqCst);
        report.peak_in_flight = in_flight.peak.load(Ordering::SeqCst);
        report.downloaded.sort_by_key(|d| d.id);
        report.failed.sort_by_key(|f| f.id);
        Ok(report)
    }

    /// Retry loop for one asset. Returns the written path.
    async fn download(&self, unit: &Unit, in_flight: &Arc<InFlight>) -> Result<PathBuf> {
        let attempts = self.policy.attempts();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let active = in_flight.enter();
            let retry_in = match self.client.get(unit.url.clone()).send().await {
                Ok(response) => match retry::classify(response.status().as_u16()) {
                    StatusClass::Success => {
                        let path = self
                            .out_dir
                            .join(naming::file_name_for(unit.id, &unit.name, &unit.url));
                        write_body(response, &path).await?;
                        return Ok(path);
                    }
                    StatusClass::RateLimited => {
                        last_error = "HTTP 429 Too Many Requests".to_string();
                        self.policy.rate_limited_backoff(attempt)
                    }
                    StatusClass::Permanent => {
                        return Err(HarvestError::Status {
                            url: unit.url.to_string(),
                            status: response.status().as_u16(),
                        });
                    }
                },
                Err(e) => {
                    last_error = e.to_string();
                    self.policy.backoff(attempt)
                }
            };
            drop(active);

            if attempt + 1 < attempts {
                debug!(id = %unit.id, attempt, delay_ms = retry_in.as_millis() as u64, reason = %last_error, "retrying asset");
                progress::emit(
                    &self.progress,
                    DownloadEvent::Retrying {
                        id: unit.id,
                        attempt: attempt + 1,
                        reason: last_error.clone(),
                    },
                );
                tokio::time::sleep(retry_in).await;
            }
        }

        Err(HarvestError::RetriesExhausted {
            url: unit.url.to_string(),
            attempts,
            reason: last_error,
        })
    }
}

/// Stream `response` into `path`, creating or truncating it.
async fn write_body(mut response: reqwest::Response, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
