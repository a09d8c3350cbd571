//! `crest-harvest download`: fetch assets listed in a saved snapshot.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::download::{AssetFetcher, DownloadReport};
use crate::entity::EntityRecord;
use crate::progress::{self, DownloadEvent};
use crate::snapshot;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;

/// Run the download command.
pub async fn run(config: &HarvestConfig, snapshot_path: &Path) -> Result<()> {
    let records = snapshot::load(snapshot_path)
        .with_context(|| format!("failed to load snapshot {}", snapshot_path.display()))?;
    let report = download(config, &records).await?;
    report_outcome(&report);
    Ok(())
}

/// Download every resolved asset in `records`, showing a progress bar when
/// output is interactive.
pub async fn download(config: &HarvestConfig, records: &[EntityRecord]) -> Result<DownloadReport> {
    let fetcher = AssetFetcher::new(&config.download);
    if !output::is_human() {
        return fetcher.fetch_all(records).await.context("download failed");
    }

    let (tx, mut rx) = progress::channel();
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("  {bar:32} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let ui = {
        let bar = bar.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(DownloadEvent::Started { total }) => bar.set_length(total as u64),
                    Ok(DownloadEvent::Finished { name, .. }) => {
                        bar.set_message(name);
                        bar.inc(1);
                    }
                    Ok(DownloadEvent::Retrying { .. }) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let result = fetcher.with_progress(tx).fetch_all(records).await;
    // The sender is dropped with the fetcher, which ends the UI task.
    let _ = ui.await;
    bar.finish_and_clear();
    result.context("download failed")
}

pub fn report_outcome(report: &DownloadReport) {
    if output::is_json() {
        output::print_json(report);
        return;
    }
    if output::is_quiet() {
        return;
    }
    println!(
        "  Downloaded {} assets ({} failed, {} without asset)",
        report.downloaded.len(),
        report.failed.len(),
        report.skipped
    );
    for failure in &report.failed {
        println!("    ✗ {:<24} {}", failure.name, failure.error);
    }
}
