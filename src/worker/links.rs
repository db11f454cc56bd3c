//! Link candidate normalization and filtering (§4.7 steps 7–8).

use url::Url;

use crate::url_norm::{is_asset_url, matches_path_prefix, normalize_url, same_scope};
use crate::worker::browser::LinkCandidate;
use crate::worker::LinkEdge;

/// Normalize and filter one page's extracted link candidates against the
/// page it was found on: absolute URLs, same-origin, path-prefix, no
/// asset extensions, query params stripped per configuration.
pub fn normalize_candidates(
    page_url: &str,
    candidates: Vec<LinkCandidate>,
    path_prefix: &str,
    keep_page_param: bool,
) -> Vec<LinkEdge> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for candidate in candidates {
        let Ok(parsed) = Url::parse(&candidate.url) else {
            continue;
        };
        if !same_scope(&parsed, &base) {
            continue;
        }
        if is_asset_url(&parsed) {
            continue;
        }
        if !matches_path_prefix(parsed.path(), path_prefix) {
            continue;
        }
        let Some(normalized) = normalize_url(parsed.as_str(), keep_page_param) else {
            continue;
        };
        out.push(LinkEdge {
            page_url: page_url.to_string(),
            link_url: normalized,
            text: candidate.text,
            kind: candidate.kind,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, kind: &str) -> LinkCandidate {
        LinkCandidate {
            url: url.to_string(),
            text: String::new(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn filters_assets_and_cross_origin() {
        let candidates = vec![
            candidate("https://example.com/docs/a", "a"),
            candidate("https://example.com/img/logo.png", "a"),
            candidate("https://other.com/docs/b", "a"),
        ];
        let edges = normalize_candidates("https://example.com/docs/start", candidates, "/docs", false);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].link_url, "https://example.com/docs/a");
    }

    #[test]
    fn enforces_path_prefix() {
        let candidates = vec![candidate("https://example.com/blog/a", "a")];
        let edges = normalize_candidates("https://example.com/docs/start", candidates, "/docs", false);
        assert!(edges.is_empty());
    }
}
