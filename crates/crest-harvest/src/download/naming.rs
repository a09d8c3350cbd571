//! Output filenames for downloaded assets.

use crate::entity::EntityId;
use url::Url;

const SEPARATOR: char = '_';

/// Lowercase `name`, fold Slovene (and neighbouring) diacritics to ASCII, and
/// collapse every run of whitespace, dashes and underscores into one `_`.
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'č' | 'ć' => 'c',
            'š' => 's',
            'ž' => 'z',
            'đ' => 'd',
            c if c.is_whitespace() || is_dash(c) || c == SEPARATOR || c == '/' || c == '\\' => {
                pending_separator = true;
                continue;
            }
            c => c,
        };
        if pending_separator && !out.is_empty() {
            out.push(SEPARATOR);
        }
        pending_separator = false;
        out.push(folded);
    }

    out
}

fn is_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—' | '‐' | '−')
}

/// Extension of the last path segment of `url`, if it has one.
pub fn extension(url: &Url) -> Option<&str> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// `normalized-name.ext`, or just the normalized name when the URL has no
/// extension. The extension keeps the case it has in the URL. A name that
/// normalizes to nothing falls back to the entity id.
pub fn file_name_for(id: EntityId, name: &str, url: &Url) -> String {
    let mut stem = normalize_file_name(name);
    if stem.is_empty() {
        stem = id.to_string();
    }
    match extension(url) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_diacritics_and_case() {
        assert_eq!(normalize_file_name("Črnomelj"), "crnomelj");
        assert_eq!(normalize_file_name("Šempeter - Vrtojba"), "sempeter_vrtojba");
        assert_eq!(normalize_file_name("Žalec"), "zalec");
    }

    #[test]
    fn test_collapses_separator_runs() {
        assert_eq!(
            normalize_file_name("Hoče  –  Slivnica"),
            "hoce_slivnica"
        );
        assert_eq!(normalize_file_name("  Lenart "), "lenart");
        assert_eq!(normalize_file_name("a-_-b"), "a_b");
    }

    #[test]
    fn test_is_idempotent() {
        for name in ["Miren - Kostanjevica", "Šmarje pri Jelšah", "Loška dolina", "a__b"] {
            let once = normalize_file_name(name);
            assert_eq!(normalize_file_name(&once), once, "input {name:?}");
        }
    }

    #[test]
    fn test_extension_from_last_segment() {
        let url = Url::parse("https://upload.wikimedia.org/wikipedia/commons/1/1a/Grb.Bled.SVG").unwrap();
        assert_eq!(extension(&url), Some("SVG"));
        assert_eq!(file_name_for(EntityId(1), "Bled", &url), "bled.SVG");
    }

    #[test]
    fn test_empty_name_falls_back_to_id() {
        let url = Url::parse("https://upload.wikimedia.org/a/Grb.png").unwrap();
        assert_eq!(file_name_for(EntityId(7), "—", &url), "7.png");
        assert_eq!(file_name_for(EntityId(7), "  ", &url), "7.png");
    }

    #[test]
    fn test_extension_ignores_dots_in_host() {
        let url = Url::parse("https://upload.wikimedia.org/asset").unwrap();
        assert_eq!(extension(&url), None);
        assert_eq!(file_name_for(EntityId(1), "Bled", &url), "bled");
    }
}
