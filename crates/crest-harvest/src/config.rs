//! Harvest configuration.
//!
//! Every knob has a default aimed at the Slovene municipality list on
//! sl.wikipedia.org. A JSON file may override any subset of fields; CLI flags
//! are applied on top by the binary.

use crate::error::{HarvestError, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CREST_HARVEST_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub crawl: CrawlConfig,
    pub download: DownloadConfig,
}

/// Where to crawl and what to match on each page kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub hub_url: String,
    /// Anchors on the hub page that name entities.
    pub hub_selector: String,
    /// Hub anchor text must contain this to count as an entity.
    pub entity_marker: Option<String>,
    /// Prefixes stripped from hub anchor text, in order.
    pub qualifier_prefixes: Vec<String>,
    /// Candidate links in a detail page's info panel.
    pub detail_selector: String,
    /// A candidate's `title` must contain this, when set.
    pub asset_title_marker: Option<String>,
    /// Candidates whose `title` contains this are decoys.
    pub decoy_title_marker: Option<String>,
    /// The direct asset link on a redirect page.
    pub asset_selector: String,
    /// Hosts requests may go to. Empty allows every host.
    pub allowed_domains: Vec<String>,
    /// Width of the page-fetch worker pool.
    pub parallelism: usize,
    pub page_timeout_ms: u64,
    pub page_retries: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            hub_url: "https://sl.wikipedia.org/wiki/Seznam_ob%C4%8Din_v_Sloveniji".to_string(),
            hub_selector: ".wikitable tbody tr>td:nth-child(2) a".to_string(),
            entity_marker: None,
            qualifier_prefixes: vec!["Mestna občina ".to_string(), "Občina ".to_string()],
            detail_selector: ".infobox .infobox-full-data>table>tbody span>a[title]".to_string(),
            asset_title_marker: None,
            decoy_title_marker: Some("Zastava".to_string()),
            asset_selector: "#bodyContent .fullMedia .internal".to_string(),
            allowed_domains: vec![
                "sl.wikipedia.org".to_string(),
                "upload.wikimedia.org".to_string(),
            ],
            parallelism: 8,
            page_timeout_ms: 15_000,
            page_retries: 2,
        }
    }
}

impl CrawlConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Parse the hub URL and compile every selector.
    pub fn compile(&self) -> Result<CompiledRules> {
        let hub_url =
            Url::parse(&self.hub_url).map_err(|_| HarvestError::InvalidUrl(self.hub_url.clone()))?;
        Ok(CompiledRules {
            hub_url,
            hub: parse_selector(&self.hub_selector)?,
            detail: parse_selector(&self.detail_selector)?,
            asset: parse_selector(&self.asset_selector)?,
            entity_marker: self.entity_marker.clone(),
            qualifier_prefixes: self.qualifier_prefixes.clone(),
            asset_title_marker: self.asset_title_marker.clone(),
            decoy_title_marker: self.decoy_title_marker.clone(),
        })
    }
}

/// Politeness and retry policy for asset downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub out_dir: PathBuf,
    /// Maximum simultaneous downloads.
    pub concurrency: usize,
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Backoff base; attempt `n` waits `base * 2^n`.
    pub base_delay_ms: u64,
    /// Upper bound of the random delay before a unit's first request.
    pub start_jitter_ms: u64,
    /// Upper bound of the extra random delay added to 429 backoff.
    pub rate_limit_jitter_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./data"),
            concurrency: 4,
            max_retries: 5,
            base_delay_ms: 1_000,
            start_jitter_ms: 5_000,
            rate_limit_jitter_ms: 1_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `explicit`, else from `$CREST_HARVEST_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

/// Crawl rules with the hub URL parsed and selectors compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub hub_url: Url,
    pub hub: Selector,
    pub detail: Selector,
    pub asset: Selector,
    pub entity_marker: Option<String>,
    pub qualifier_prefixes: Vec<String>,
    pub asset_title_marker: Option<String>,
    pub decoy_title_marker: Option<String>,
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HarvestError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let rules = CrawlConfig::default().compile().unwrap();
        assert_eq!(rules.hub_url.host_str(), Some("sl.wikipedia.org"));
        assert_eq!(rules.decoy_title_marker.as_deref(), Some("Zastava"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.json");
        std::fs::write(&path, r#"{"download": {"concurrency": 2}}"#).unwrap();

        let config = HarvestConfig::load(&path).unwrap();
        assert_eq!(config.download.concurrency, 2);
        assert_eq!(config.download.max_retries, 5);
        assert_eq!(config.crawl.parallelism, 8);
    }

    #[test]
    fn test_bad_selector_is_rejected() {
        let config = CrawlConfig {
            detail_selector: "a[[".to_string(),
            ..CrawlConfig::default()
        };
        match config.compile() {
            Err(HarvestError::InvalidSelector { selector, .. }) => assert_eq!(selector, "a[["),
            other => panic!("expected InvalidSelector, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_hub_url_is_rejected() {
        let config = CrawlConfig {
            hub_url: "not a url".to_string(),
            ..CrawlConfig::default()
        };
        assert!(matches!(config.compile(), Err(HarvestError::InvalidUrl(_))));
    }
}
