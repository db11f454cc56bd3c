//! Discovery sub-phases (§4.7): sitemap-first, falling back to the
//! bucketed frontier; home-bucket-set computation for round-robin
//! bucket ownership.

use regex::Regex;

use once_cell::sync::Lazy;

static LOC_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<loc>\s*([^<\s]+)\s*</loc>").unwrap());

/// Home bucket set for worker `me` of `total`: `{me, me+W, me+2W, ...}`.
pub fn home_buckets(me: usize, total: usize, bucket_parts: u32) -> Vec<u32> {
    let total = total.max(1);
    let mut buckets = Vec::new();
    let mut r = me as u32;
    while r < bucket_parts {
        buckets.push(r);
        r += total as u32;
    }
    buckets
}

/// Attempt sitemap discovery: fetch `{base}/sitemap.xml` and extract
/// `<loc>` entries. Treated as an opaque external collaborator — on any
/// failure or absence of a sitemap this returns an empty set, triggering
/// the frontier-crawl fallback.
pub async fn discover_sitemap(base: &str, http: &reqwest::Client) -> Vec<String> {
    let url = format!("{}/sitemap.xml", base.trim_end_matches('/'));
    let Ok(response) = http.get(&url).send().await else {
        return Vec::new();
    };
    if !response.status().is_success() {
        return Vec::new();
    }
    let Ok(body) = response.text().await else {
        return Vec::new();
    };
    LOC_TAG
        .captures_iter(&body)
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_buckets_are_round_robin() {
        assert_eq!(home_buckets(0, 4, 8), vec![0, 4]);
        assert_eq!(home_buckets(1, 4, 8), vec![1, 5]);
        assert_eq!(home_buckets(3, 4, 8), vec![3, 7]);
    }

    #[test]
    fn single_worker_owns_every_bucket() {
        assert_eq!(home_buckets(0, 1, 4), vec![0, 1, 2, 3]);
    }
}
