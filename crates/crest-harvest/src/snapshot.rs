//! JSON persistence of entity records.
//!
//! The file is a pretty-printed array of
//! `{id, name, url, imgRedirectUrl, imgUrl}` objects, so a crawl can be saved
//! once and its assets downloaded later.

use crate::entity::EntityRecord;
use crate::error::Result;
use std::path::Path;
use tracing::info;

pub fn save(records: &[EntityRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), records = records.len(), "snapshot saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<EntityRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let mut records: Vec<EntityRecord> = serde_json::from_str(&raw)?;
    records.sort_by_key(|r| r.id);
    Ok(records)
}
