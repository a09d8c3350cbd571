// Copyright 2026 Crest Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crest_harvest::cli::{self, output};
use crest_harvest::config::HarvestConfig;

#[derive(Parser)]
#[command(
    name = "crest-harvest",
    about = "Collect municipal coats of arms from a Wikipedia list",
    version,
    after_help = "Run 'crest-harvest <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// JSON config file (also read from $CREST_HARVEST_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl, save the snapshot, and download every asset (default)
    Run {
        #[command(flatten)]
        download: DownloadArgs,
        /// Where to save the entity snapshot
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Crawl the hub and linked pages, then save the entity snapshot
    Crawl {
        /// Where to save the entity snapshot
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Hub page URL
        #[arg(long)]
        hub: Option<String>,
    },
    /// Download assets from a previously saved snapshot
    Download {
        /// Snapshot file produced by `crawl`
        #[arg(long)]
        snapshot: PathBuf,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct DownloadArgs {
    /// Output directory for downloaded assets
    #[arg(long)]
    out: Option<PathBuf>,
    /// Maximum simultaneous downloads
    #[arg(long)]
    concurrency: Option<usize>,
}

impl DownloadArgs {
    fn apply(self, config: &mut HarvestConfig) {
        if let Some(out) = self.out {
            config.download.out_dir = out;
        }
        if let Some(n) = self.concurrency {
            config.download.concurrency = n;
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crest_harvest={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn default_snapshot(config: &HarvestConfig) -> PathBuf {
    config.download.out_dir.join("municipalities.json")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    init_tracing(&cli);

    let result = run(cli).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = HarvestConfig::resolve(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        None => {
            let snapshot = default_snapshot(&config);
            cli::run_cmd::run(&config, &snapshot).await
        }
        Some(Commands::Run { download, snapshot }) => {
            download.apply(&mut config);
            let snapshot = snapshot.unwrap_or_else(|| default_snapshot(&config));
            cli::run_cmd::run(&config, &snapshot).await
        }
        Some(Commands::Crawl { snapshot, hub }) => {
            if let Some(hub) = hub {
                config.crawl.hub_url = hub;
            }
            let snapshot = snapshot.unwrap_or_else(|| default_snapshot(&config));
            cli::crawl_cmd::run(&config, &snapshot).await
        }
        Some(Commands::Download { snapshot, download }) => {
            download.apply(&mut config);
            cli::download_cmd::run(&config, &snapshot).await
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "crest-harvest", &mut std::io::stdout());
            Ok(())
        }
    }
}
