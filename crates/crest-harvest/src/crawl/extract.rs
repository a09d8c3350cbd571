//! CSS-selector extraction for the three page kinds.
//!
//! All functions here are synchronous: `scraper::Html` is `!Send`, so each
//! call parses, extracts, and drops the document without crossing an await.

use crate::config::CompiledRules;
use scraper::{ElementRef, Html};
use url::Url;

/// An entity link found on the hub page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEntry {
    pub name: String,
    pub url: Url,
}

// ── Hub page ─────────────────────────────────────────────────────────────────

/// Collect every entity anchor on the hub page, in document order.
pub fn hub_entries(html: &str, page_url: &Url, rules: &CompiledRules) -> Vec<HubEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for el in document.select(&rules.hub) {
        let text = element_text(&el);
        if let Some(marker) = &rules.entity_marker {
            if !text.contains(marker.as_str()) {
                continue;
            }
        }

        let name = strip_qualifiers(&text, &rules.qualifier_prefixes);
        if name.is_empty() {
            continue;
        }
        let Some(url) = el.value().attr("href").and_then(|h| page_url.join(h).ok()) else {
            continue;
        };
        entries.push(HubEntry {
            name: name.to_string(),
            url,
        });
    }

    entries
}

/// Remove leading category qualifiers ("Mestna občina ", "Urban ", ...).
pub fn strip_qualifiers<'a>(text: &'a str, prefixes: &[String]) -> &'a str {
    let mut name = text.trim();
    while let Some(rest) = prefixes
        .iter()
        .find_map(|p| name.strip_prefix(p.as_str()))
    {
        name = rest.trim_start();
    }
    name
}

// ── Detail page ──────────────────────────────────────────────────────────────

/// First info-panel link whose title names the asset type and not the decoy.
pub fn asset_page_link(html: &str, page_url: &Url, rules: &CompiledRules) -> Option<Url> {
    let document = Html::parse_document(html);

    document
        .select(&rules.detail)
        .filter(|el| {
            let title = el.value().attr("title").unwrap_or_default();
            let wanted = rules
                .asset_title_marker
                .as_deref()
                .map_or(true, |m| title.contains(m));
            let decoy = rules
                .decoy_title_marker
                .as_deref()
                .is_some_and(|m| title.contains(m));
            wanted && !decoy
        })
        .find_map(|el| el.value().attr("href").and_then(|h| page_url.join(h).ok()))
}

// ── Redirect page ────────────────────────────────────────────────────────────

/// The direct asset link on a file-description page.
pub fn asset_link(html: &str, page_url: &Url, rules: &CompiledRules) -> Option<Url> {
    let document = Html::parse_document(html);
    document
        .select(&rules.asset)
        .find_map(|el| el.value().attr("href").and_then(|h| page_url.join(h).ok()))
}

/// Visible text of an element, whitespace-collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
