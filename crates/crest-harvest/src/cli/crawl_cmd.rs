//! `crest-harvest crawl`: resolve asset URLs and save a snapshot.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::crawl::{CrawlReport, Crawler};
use crate::snapshot;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the crawl command.
pub async fn run(config: &HarvestConfig, snapshot_path: &Path) -> Result<()> {
    let report = crawl(config).await?;
    snapshot::save(&report.records, snapshot_path)
        .with_context(|| format!("failed to save snapshot to {}", snapshot_path.display()))?;

    if output::is_json() {
        output::print_json(&report);
    } else if !output::is_quiet() {
        print_summary(&report);
        println!("  Snapshot:   {}", snapshot_path.display());
    }
    Ok(())
}

/// Run the three crawl stages with the configured HTTP fetcher.
pub async fn crawl(config: &HarvestConfig) -> Result<CrawlReport> {
    let crawler = Crawler::over_http(&config.crawl).context("invalid crawl configuration")?;
    let report = crawler.run().await?;
    Ok(report)
}

pub fn print_summary(report: &CrawlReport) {
    let with_redirect = report
        .records
        .iter()
        .filter(|r| r.redirect_url.is_some())
        .count();
    println!("  Entities:   {}", report.discovered);
    println!(
        "  Asset pages {:>4}   ({} failed requests)",
        with_redirect, report.detail.failed
    );
    println!(
        "  Assets      {:>4}   ({} failed requests)",
        report.resolved(),
        report.redirect.failed
    );
    println!("  Elapsed:    {:.1}s", report.elapsed_ms as f64 / 1000.0);
}
