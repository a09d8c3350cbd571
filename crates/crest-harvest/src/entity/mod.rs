//! Entity records and the shared store the crawl stages write into.

pub mod store;

pub use store::{EntityStore, LockedStore};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sequential identifier assigned at discovery time, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One discovered entity and the URLs resolved for it so far.
///
/// Serializes to the snapshot shape `{id, name, url, imgRedirectUrl, imgUrl}`
/// with empty strings standing in for unresolved URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    /// Display name from the hub page, qualifier prefixes stripped.
    pub name: String,
    /// Absolute URL of the entity's detail page.
    #[serde(rename = "url")]
    pub source_page_url: String,
    /// Intermediate asset-description page, set by the detail stage.
    #[serde(rename = "imgRedirectUrl", default, with = "empty_as_none")]
    pub redirect_url: Option<String>,
    /// Direct asset URL, set by the redirect stage.
    #[serde(rename = "imgUrl", default, with = "empty_as_none")]
    pub asset_url: Option<String>,
    /// Where the asset was written, once downloaded.
    #[serde(rename = "path", default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl EntityRecord {
    pub fn new(id: EntityId, name: impl Into<String>, source_page_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_page_url: source_page_url.into(),
            redirect_url: None,
            asset_url: None,
            local_path: None,
        }
    }
}

/// Maps `None` to `""` and back, matching the persisted snapshot format.
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(d)?;
        Ok(value.filter(|s| !s.is_empty()))
    }
}
