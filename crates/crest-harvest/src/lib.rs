// Copyright 2026 Crest Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Crest harvest library. Crawls a hub page of entities, resolves each one's
//! asset through two linked pages, and downloads the assets politely.
//!
//! ```text
//! hub page ──▶ EntityStore ──barrier──▶ detail pages ──barrier──▶
//!   redirect pages ──barrier──▶ AssetFetcher ──barrier──▶ files
//! ```

pub mod cli;
pub mod config;
pub mod crawl;
pub mod download;
pub mod entity;
pub mod error;
pub mod progress;
pub mod snapshot;

pub use config::{CrawlConfig, DownloadConfig, HarvestConfig};
pub use crawl::{CrawlReport, Crawler};
pub use download::{AssetFetcher, DownloadReport};
pub use entity::{EntityId, EntityRecord, EntityStore, LockedStore};
pub use error::{HarvestError, Result};
