//! URL normalization (§4.9) and bucket hashing (§4.2).

use url::Url;

const ANALYTICS_PREFIXES: &[&str] = &["utm_"];
const ANALYTICS_EXACT: &[&str] = &["gclid", "fbclid"];

/// Normalize a URL: drop fragment, drop analytics query params, drop `page`
/// unless `keep_page_param`, lowercase host, strip trailing slash unless
/// path is root.
///
/// Idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
pub fn normalize_url(raw: &str, keep_page_param: bool) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.set_fragment(None);

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        let _ = url.set_host(Some(&lowered));
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let k = k.as_ref();
            if ANALYTICS_PREFIXES.iter().any(|p| k.starts_with(p)) {
                return false;
            }
            if ANALYTICS_EXACT.contains(&k) {
                return false;
            }
            if k == "page" && !keep_page_param {
                return false;
            }
            true
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&retained);
    }

    let mut s = url.to_string();
    if url.path() != "/" && s.ends_with('/') && url.query().is_none() {
        s.pop();
    }
    Some(s)
}

/// Bucket-hash partition function: `hash(url) mod B`, stable across processes.
pub fn bucket_of(url: &str, bucket_parts: u32) -> u32 {
    let hash = xxhash_rust::xxh3::xxh3_64(url.as_bytes());
    (hash % u64::from(bucket_parts)) as u32
}

/// Asset extensions stripped from link candidates before queueing.
const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "avif", "woff", "woff2", "ttf",
    "otf", "eot", "mp3", "mp4", "wav", "ogg", "webm", "mov", "avi", "css", "js", "json", "xml",
    "pdf", "zip", "gz", "tar",
];

/// True if the URL's path extension marks it as a non-HTML asset.
pub fn is_asset_url(url: &Url) -> bool {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ASSET_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Same-origin or same-registrable-domain check between a link and its page.
pub fn same_scope(candidate: &Url, base: &Url) -> bool {
    candidate.scheme() == base.scheme() && candidate.host_str() == base.host_str()
}

/// True if `path` starts with `prefix` (both `/`-rooted); empty prefix always matches.
pub fn matches_path_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() || prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/")) || path.starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let raw = "HTTPS://Example.com/a/b/?utm_source=x&gclid=y&z=1#frag";
        let once = normalize_url(raw, false).unwrap();
        let twice = normalize_url(&once, false).unwrap();
        assert_eq!(once, twice);
        assert!(!once.contains("utm_source"));
        assert!(!once.contains("gclid"));
        assert!(once.contains("z=1"));
    }

    #[test]
    fn root_path_keeps_trailing_slash() {
        let n = normalize_url("https://example.com/", false).unwrap();
        assert_eq!(n, "https://example.com/");
    }

    #[test]
    fn drops_non_http_schemes() {
        assert!(normalize_url("mailto:a@b.com", false).is_none());
        assert!(normalize_url("javascript:void(0)", false).is_none());
    }

    #[test]
    fn page_param_kept_only_when_configured() {
        let dropped = normalize_url("https://example.com/list?page=2", false).unwrap();
        assert!(!dropped.contains("page=2"));
        let kept = normalize_url("https://example.com/list?page=2", true).unwrap();
        assert!(kept.contains("page=2"));
    }

    #[test]
    fn bucket_of_is_stable() {
        let a = bucket_of("https://example.com/x", 16);
        let b = bucket_of("https://example.com/x", 16);
        assert_eq!(a, b);
        assert!(a < 16);
    }

    #[test]
    fn asset_extensions_detected() {
        let png = Url::parse("https://example.com/img/a.PNG").unwrap();
        assert!(is_asset_url(&png));
        let html = Url::parse("https://example.com/page").unwrap();
        assert!(!is_asset_url(&html));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_url_is_idempotent(
            host in "[a-z]{3,10}\\.(com|org|net)",
            path in "(/[a-z0-9]{1,8}){0,4}",
            keep_page_param: bool,
        ) {
            let raw = format!("https://{host}{path}?utm_source=x&page=2&z=1");
            if let Some(once) = normalize_url(&raw, keep_page_param) {
                let twice = normalize_url(&once, keep_page_param).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
