//! `crest-harvest run`: crawl, save the snapshot, then download.

use crate::cli::{crawl_cmd, download_cmd, output};
use crate::config::HarvestConfig;
use crate::snapshot;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the full pipeline.
pub async fn run(config: &HarvestConfig, snapshot_path: &Path) -> Result<()> {
    let crawl = crawl_cmd::crawl(config).await?;
    if output::is_human() {
        crawl_cmd::print_summary(&crawl);
    }

    let mut records = crawl.records;
    snapshot::save(&records, snapshot_path)
        .with_context(|| format!("failed to save snapshot to {}", snapshot_path.display()))?;

    let report = download_cmd::download(config, &records).await?;
    report.apply(&mut records);
    snapshot::save(&records, snapshot_path)
        .with_context(|| format!("failed to save snapshot to {}", snapshot_path.display()))?;

    download_cmd::report_outcome(&report);
    Ok(())
}
