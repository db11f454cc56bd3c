//! Frontier seeding (§4.8b): the base-prefix URL plus a one-shot scan of
//! the base page's first-level links, and explicit-URL extraction from a
//! classified input file.
//!
//! The base-page scan is a cheap HTTP GET plus a regex pass over anchor
//! hrefs — the same "opaque collaborator, regex-extract" idiom the
//! sitemap discovery path already uses (`worker::discover`), rather than
//! spinning up a browser just to enumerate one page's outbound links.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::{ClassifiedInput, ColumnRole};
use crate::url_norm::{is_asset_url, matches_path_prefix, normalize_url, same_scope};

static HREF_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\s[^>]*?href\s*=\s*["']([^"'#]+)["']"#).unwrap());

/// Fetch the base page and extract same-scope, in-prefix anchor hrefs.
pub async fn seed_scan_base_page(
    base: &str,
    http: &reqwest::Client,
    path_prefix: &str,
    keep_page_param: bool,
) -> Vec<String> {
    let Ok(response) = http.get(base).send().await else {
        return Vec::new();
    };
    if !response.status().is_success() {
        return Vec::new();
    }
    let Ok(body) = response.text().await else {
        return Vec::new();
    };
    let Ok(base_url) = url::Url::parse(base) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for cap in HREF_ATTR.captures_iter(&body) {
        let Ok(joined) = base_url.join(&cap[1]) else {
            continue;
        };
        if !same_scope(&joined, &base_url) || is_asset_url(&joined) {
            continue;
        }
        if !matches_path_prefix(joined.path(), path_prefix) {
            continue;
        }
        let Some(normalized) = normalize_url(joined.as_str(), keep_page_param) else {
            continue;
        };
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

/// Extract the explicit URL list from a classified input file (§4.5/§4.7):
/// the column the classifier tagged `ColumnRole::Url`, normalized.
pub fn explicit_urls(classified: &ClassifiedInput, keep_page_param: bool) -> Vec<String> {
    let Some(url_index) = classified.shape.inferred_roles.iter().position(|r| *r == ColumnRole::Url) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in &classified.rows {
        let Some(raw) = row.get(url_index) else { continue };
        let Some(normalized) = normalize_url(raw, keep_page_param) else {
            continue;
        };
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InputShape, Row};

    #[test]
    fn explicit_urls_reads_the_url_column_and_dedupes() {
        let classified = ClassifiedInput {
            shape: InputShape {
                exists: true,
                column_count: 1,
                first_column_url_share: 1.0,
                first_row_is_url: true,
                inferred_roles: vec![ColumnRole::Url],
            },
            mode: crate::classifier::RunMode::ExplicitUrls,
            rows: vec![
                Row(vec!["https://example.com/a".to_string()]),
                Row(vec!["https://example.com/a".to_string()]),
                Row(vec!["https://example.com/b".to_string()]),
            ],
        };
        let urls = explicit_urls(&classified, false);
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn explicit_urls_empty_without_a_url_role() {
        let classified = ClassifiedInput {
            shape: InputShape {
                exists: true,
                column_count: 2,
                first_column_url_share: 0.0,
                first_row_is_url: false,
                inferred_roles: vec![ColumnRole::Title, ColumnRole::Description],
            },
            mode: crate::classifier::RunMode::Discovery,
            rows: vec![Row(vec!["Title".to_string(), "Desc".to_string()])],
        };
        assert!(explicit_urls(&classified, false).is_empty());
    }
}
