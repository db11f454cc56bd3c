//! Fetching a single claimed URL (§4.7 "Fetching a claimed URL").

use crate::claim::{ClaimHandle, ClaimLedger, ClaimOutcome};
use crate::crawl_engine::FailureKind;
use crate::url_norm::{matches_path_prefix, normalize_url};
use crate::worker::browser::BrowserSession;
use crate::worker::links::normalize_candidates;
use crate::worker::{ExistenceRecord, LinkEdge, LinkRef, PageRecord};

const NAV_RETRY_DELAYS_MS: [u64; 2] = [600, 1200];

pub enum FetchOutcome {
    Recorded {
        page: PageRecord,
        edges: Vec<LinkEdge>,
    },
    /// Out-of-scope after redirect, malformed, or otherwise silently dropped.
    Dropped,
    /// Navigation failed outright (or would have reported status 0); a
    /// cheap HTTP probe was substituted so the URL still gets an existence
    /// record instead of vanishing without a trace (§4.7 step 3).
    Unreachable(ExistenceRecord),
}

/// Load, extract, and normalize a single claimed URL. Handles the
/// redirect re-claim dance from §4.7 step 4: if the final URL differs
/// from the seed URL, a second claim is attempted on the final URL; if
/// that fails (another worker already owns it), the seed claim is
/// abandoned (released, not completed) and the URL is dropped.
///
/// Resolves `seed_handle` itself: completed on every path that produces
/// a result (including redirects), released (by drop) on failure.
pub async fn fetch_claimed_url(
    session: &BrowserSession,
    claims: &ClaimLedger,
    http: &reqwest::Client,
    seed_handle: ClaimHandle,
    seed_url: &str,
    path_prefix: &str,
    keep_page_param: bool,
) -> anyhow::Result<Option<FetchOutcome>> {
    let mut last_err = None;
    let page_handle = 'retry: {
        for (attempt, delay_ms) in std::iter::once(0).chain(NAV_RETRY_DELAYS_MS).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
            match session.open(seed_url).await {
                Ok(page) => match page.load(seed_url).await {
                    Ok(load_result) => break 'retry Some((page, load_result)),
                    Err(e) => last_err = Some(e),
                },
                Err(e) => last_err = Some(e),
            }
        }
        None
    };

    // seed_handle drops (releases) here on every early return below unless
    // explicitly completed first.
    let Some((page, load_result)) = page_handle else {
        let kind = last_err
            .as_ref()
            .map(FailureKind::classify)
            .unwrap_or(FailureKind::Unknown);
        log::warn!("navigation failed for {seed_url}: {kind:?}, falling back to existence probe");
        let record = probe_existence(http, seed_url).await;
        seed_handle.complete()?;
        return Ok(Some(FetchOutcome::Unreachable(record)));
    };

    let Some(final_normalized) = normalize_url(&load_result.final_url, keep_page_param) else {
        return Ok(Some(FetchOutcome::Dropped));
    };

    let final_handle = if final_normalized != normalize_url(seed_url, keep_page_param).unwrap_or_default() {
        match claims.try_claim(&final_normalized)? {
            ClaimOutcome::Claimed(handle) => Some(handle),
            ClaimOutcome::AlreadyDone | ClaimOutcome::AlreadyClaimed => return Ok(None),
        }
    } else {
        None
    };

    let final_url = url::Url::parse(&final_normalized)?;
    if !matches_path_prefix(final_url.path(), path_prefix) {
        return Ok(Some(FetchOutcome::Dropped));
    }

    let meta = page.read_meta().await?;
    let candidates = page.extract_links().await?;
    page.close().await.ok();

    let edges = normalize_candidates(&final_normalized, candidates, path_prefix, keep_page_param);
    let links = edges
        .iter()
        .map(|e| LinkRef {
            url: e.link_url.clone(),
            text: e.text.clone(),
            kind: e.kind.clone(),
        })
        .collect();

    let title_normalized = meta
        .title
        .as_deref()
        .map(crate::text_norm::normalize_text)
        .unwrap_or_default();

    let record = PageRecord {
        url: final_normalized,
        title: meta.title,
        description: meta.description,
        title_normalized,
        links,
        last_fetched: now_secs(),
    };

    seed_handle.complete()?;
    if let Some(handle) = final_handle {
        handle.complete()?;
    }

    Ok(Some(FetchOutcome::Recorded { page: record, edges }))
}

/// Existence-only fast path (§4.7): a cheap HTTP probe, no rendering.
pub async fn probe_existence(http: &reqwest::Client, input_url: &str) -> ExistenceRecord {
    match http.head(input_url).send().await {
        Ok(response) => ExistenceRecord {
            input_url: input_url.to_string(),
            exists: response.status().is_success(),
            http_status: response.status().as_u16(),
            final_url: response.url().to_string(),
        },
        Err(_) => ExistenceRecord {
            input_url: input_url.to_string(),
            exists: false,
            http_status: 0,
            final_url: input_url.to_string(),
        },
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
