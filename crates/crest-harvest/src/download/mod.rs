//! Asset download phase.

pub mod fetcher;
pub mod naming;
pub mod retry;

pub use fetcher::AssetFetcher;
pub use naming::normalize_file_name;
pub use retry::RetryPolicy;

use crate::entity::{EntityId, EntityRecord};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct Downloaded {
    pub id: EntityId,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadFailure {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub error: String,
}

/// Result of a download phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub downloaded: Vec<Downloaded>,
    pub failed: Vec<DownloadFailure>,
    /// Records without an asset URL.
    pub skipped: usize,
    /// HTTP requests issued, retries included.
    pub requests: usize,
    /// Most transfers observed on the wire at once.
    pub peak_in_flight: usize,
}

impl DownloadReport {
    /// Record each downloaded asset's path on its snapshot record.
    pub fn apply(&self, records: &mut [EntityRecord]) {
        for done in &self.downloaded {
            if let Some(record) = records.iter_mut().find(|r| r.id == done.id) {
                record.local_path = Some(done.path.clone());
            }
        }
    }
}
