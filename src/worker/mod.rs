//! Worker (C7): one process. Discovers (sitemap or frontier), fetches via
//! the browser, extracts links, emits per-worker partial artifacts.

pub mod browser;
pub mod discover;
pub mod fetch;
pub mod links;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::claim::ClaimLedger;
use crate::cli::{WorkerArgs, WorkerMode};
use crate::config::RunConfig;
use crate::crawl_engine::{CircuitBreaker, DomainLimiter, extract_domain};
use crate::frontier::Frontier;
use crate::telemetry::TelemetryClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub text: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub title_normalized: String,
    pub links: Vec<LinkRef>,
    pub last_fetched: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub page_url: String,
    pub link_url: String,
    pub text: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistenceRecord {
    pub input_url: String,
    pub exists: bool,
    pub http_status: u16,
    pub final_url: String,
}

struct PartialWriter {
    fetch_cache: PathBuf,
    urls_final: PathBuf,
    internal_links: PathBuf,
    existence_csv: PathBuf,
}

impl PartialWriter {
    fn new(out_dir: &std::path::Path, index: usize) -> Self {
        PartialWriter {
            fetch_cache: out_dir.join(format!("fetch-cache.part{index}.json")),
            urls_final: out_dir.join(format!("urls-final.part{index}.json")),
            internal_links: out_dir.join(format!("internal-links.part{index}.ndjson")),
            existence_csv: out_dir.join(format!("url-existence.part{index}.csv")),
        }
    }

    fn append_page(&self, record: &PageRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record).unwrap_or_default();
        line.push(b'\n');
        crate::atomic::append_retry(&self.fetch_cache, &line)?;
        let url_line = format!("{}\n", serde_json::to_string(&record.url).unwrap_or_default());
        crate::atomic::append_retry(&self.urls_final, url_line.as_bytes())
    }

    fn append_edges(&self, edges: &[LinkEdge]) -> std::io::Result<()> {
        let mut payload = Vec::new();
        for edge in edges {
            payload.extend(serde_json::to_vec(edge).unwrap_or_default());
            payload.push(b'\n');
        }
        if payload.is_empty() {
            return Ok(());
        }
        crate::atomic::append_retry(&self.internal_links, &payload)
    }

    fn append_existence(&self, record: &ExistenceRecord) -> std::io::Result<()> {
        if !self.existence_csv.exists() {
            crate::atomic::write_retry(&self.existence_csv, b"input_url,exists,http_status,final_url\n")?;
        }
        let line = format!(
            "{},{},{},{}\n",
            record.input_url, record.exists, record.http_status, record.final_url
        );
        crate::atomic::append_retry(&self.existence_csv, line.as_bytes())
    }
}

/// Run a worker process to completion: discover, fetch, report, done.
pub async fn run(config: RunConfig, args: WorkerArgs) -> anyhow::Result<()> {
    let worker_id = format!("worker-{}", args.index);
    let telemetry = TelemetryClient::new(config.telemetry_port);
    telemetry.thread(&worker_id, "init", None, None, 0).await;

    let claims = ClaimLedger::new(
        config.claim_dir(),
        config.lock_tries,
        Duration::from_millis(config.lock_sleep_ms),
        config.max_done,
    );
    let frontier = Arc::new(Frontier::new(
        config.frontier_dir(),
        config.bucket_parts,
        config.bucket_max_bytes,
        claims,
    ));

    let http = reqwest::Client::new();
    let circuit_breaker = Arc::new(CircuitBreaker::new(5, 2, Duration::from_secs(30)));
    let domain_limiter = Arc::new(DomainLimiter::new(4));
    let page_load_permits = Arc::new(Semaphore::new(config.concurrency));

    let writer = PartialWriter::new(&config.out_dir, args.index);
    std::fs::create_dir_all(&config.out_dir)?;
    let stop_flag = config.telemetry_dir().join("stop.flag");

    let session = browser::BrowserSession::launch(config.headless).await?;

    let home_buckets = discover::home_buckets(args.index, args.total, config.bucket_parts);
    telemetry.thread(&worker_id, "discover", None, None, 0).await;

    let accept_path_prefix = {
        let prefix = config.path_prefix.clone();
        move |url: &str| -> bool {
            url::Url::parse(url)
                .map(|u| crate::url_norm::matches_path_prefix(u.path(), &prefix))
                .unwrap_or(false)
        }
    };

    if matches!(args.mode, WorkerMode::RootUrls) {
        // explicit-urls mode: the caller seeded the frontier already; this
        // worker just drains its home buckets without sitemap/steal fallback.
        drain_home_buckets(
            &frontier,
            &home_buckets,
            &accept_path_prefix,
            &session,
            &http,
            &writer,
            &config,
            &circuit_breaker,
            &domain_limiter,
            &page_load_permits,
            &telemetry,
            &worker_id,
            &stop_flag,
        )
        .await?;
    } else {
        let sitemap_urls = discover::discover_sitemap(&config.base, &http).await;
        if !sitemap_urls.is_empty() {
            frontier.append(&sitemap_urls)?;
        }

        drain_with_stealing(
            &frontier,
            &home_buckets,
            &accept_path_prefix,
            &session,
            &http,
            &writer,
            &config,
            &circuit_breaker,
            &domain_limiter,
            &page_load_permits,
            &telemetry,
            &worker_id,
            &stop_flag,
        )
        .await?;
    }

    telemetry.thread(&worker_id, "done", None, None, 0).await;
    session.close().await.ok();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn drain_home_buckets(
    frontier: &Arc<Frontier>,
    home_buckets: &[u32],
    accept: &(dyn Fn(&str) -> bool + Send + Sync),
    session: &browser::BrowserSession,
    http: &reqwest::Client,
    writer: &PartialWriter,
    config: &RunConfig,
    circuit_breaker: &Arc<CircuitBreaker>,
    domain_limiter: &Arc<DomainLimiter>,
    page_load_permits: &Arc<Semaphore>,
    telemetry: &TelemetryClient,
    worker_id: &str,
    stop_flag: &std::path::Path,
) -> anyhow::Result<()> {
    let mut claims_since_trim = 0u32;
    for &bucket in home_buckets {
        if stop_flag.exists() {
            break;
        }
        let mut idle = 0u32;
        loop {
            if idle >= crate::utils::constants::BUCKET_IDLE_RELEASE_AFTER || stop_flag.exists() {
                break;
            }
            match frontier.claim_next(bucket, accept)? {
                Some((url, handle)) => {
                    idle = 0;
                    process_claim(
                        session, frontier, http, writer, config, circuit_breaker, domain_limiter,
                        page_load_permits, telemetry, worker_id, bucket, url, handle,
                    )
                    .await;
                    maybe_trim_claims(frontier, &mut claims_since_trim);
                }
                None => idle += 1,
            }
        }
    }
    Ok(())
}

/// Periodically prune the claim ledger's `.done` files (§4.3) so a
/// long-running worker doesn't leave an unbounded directory behind.
fn maybe_trim_claims(frontier: &Arc<Frontier>, claims_since_trim: &mut u32) {
    *claims_since_trim += 1;
    if *claims_since_trim >= crate::utils::constants::CLAIM_TRIM_INTERVAL {
        *claims_since_trim = 0;
        if let Err(e) = frontier.claims().trim() {
            log::warn!("claim ledger trim failed: {e}");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn drain_with_stealing(
    frontier: &Arc<Frontier>,
    home_buckets: &[u32],
    accept: &(dyn Fn(&str) -> bool + Send + Sync),
    session: &browser::BrowserSession,
    http: &reqwest::Client,
    writer: &PartialWriter,
    config: &RunConfig,
    circuit_breaker: &Arc<CircuitBreaker>,
    domain_limiter: &Arc<DomainLimiter>,
    page_load_permits: &Arc<Semaphore>,
    telemetry: &TelemetryClient,
    worker_id: &str,
    stop_flag: &std::path::Path,
) -> anyhow::Result<()> {
    let mut worker_idle_cycles = 0u32;
    let mut claims_since_trim = 0u32;
    loop {
        if stop_flag.exists() {
            break;
        }
        let mut found_any = false;
        for &bucket in home_buckets {
            let mut bucket_idle = 0u32;
            while bucket_idle < crate::utils::constants::BUCKET_IDLE_RELEASE_AFTER && !stop_flag.exists() {
                match frontier.claim_next(bucket, accept)? {
                    Some((url, handle)) => {
                        found_any = true;
                        bucket_idle = 0;
                        process_claim(
                            session, frontier, http, writer, config, circuit_breaker, domain_limiter,
                            page_load_permits, telemetry, worker_id, bucket, url, handle,
                        )
                        .await;
                        maybe_trim_claims(frontier, &mut claims_since_trim);
                    }
                    None => bucket_idle += 1,
                }
            }
        }

        if let Some((url, handle)) = frontier.claim_next_any(home_buckets.first().copied().unwrap_or(0), accept)? {
            found_any = true;
            process_claim(
                session, frontier, http, writer, config, circuit_breaker, domain_limiter,
                page_load_permits, telemetry, worker_id, home_buckets.first().copied().unwrap_or(0), url, handle,
            )
            .await;
            maybe_trim_claims(frontier, &mut claims_since_trim);
        }

        if found_any {
            worker_idle_cycles = 0;
        } else {
            worker_idle_cycles += 1;
            if worker_idle_cycles >= crate::utils::constants::QUIESCENCE_WORKERS_IDLE {
                break;
            }
            tokio::time::sleep(Duration::from_millis(crate::utils::constants::QUIESCENCE_TICK_MS)).await;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_claim(
    session: &browser::BrowserSession,
    frontier: &Arc<Frontier>,
    http: &reqwest::Client,
    writer: &PartialWriter,
    config: &RunConfig,
    circuit_breaker: &Arc<CircuitBreaker>,
    domain_limiter: &Arc<DomainLimiter>,
    page_load_permits: &Arc<Semaphore>,
    telemetry: &TelemetryClient,
    worker_id: &str,
    bucket: u32,
    url: String,
    handle: crate::claim::ClaimHandle,
) {
    let domain = extract_domain(&url).unwrap_or_else(|_| "unknown".to_string());
    if !circuit_breaker.should_attempt(&domain) {
        drop(handle);
        return;
    }

    telemetry.thread(worker_id, "fetch", Some(url.clone()), Some(bucket), 0).await;
    let _domain_permit = domain_limiter.acquire(domain.clone()).await;
    let Ok(_load_permit) = page_load_permits.clone().acquire_owned().await else {
        drop(handle);
        return;
    };

    match fetch::fetch_claimed_url(session, frontier.claims(), http, handle, &url, &config.path_prefix, config.keep_page_param).await {
        Ok(Some(fetch::FetchOutcome::Recorded { page, edges })) => {
            circuit_breaker.record_success(&domain);
            telemetry.bump("urlsFound", 1).await;
            telemetry.bump("internalEdges", edges.len() as u64).await;
            let _ = writer.append_page(&page);
            let _ = writer.append_edges(&edges);
            let new_urls: Vec<String> = edges.iter().map(|e| e.link_url.clone()).collect();
            let _ = frontier.append(&new_urls);
        }
        Ok(Some(fetch::FetchOutcome::Dropped)) | Ok(None) => {
            circuit_breaker.record_failure(&domain, "dropped");
        }
        Ok(Some(fetch::FetchOutcome::Unreachable(record))) => {
            circuit_breaker.record_failure(&domain, "unreachable");
            let _ = writer.append_existence(&record);
        }
        Err(e) => {
            log::warn!("fetch failed for {url}: {e}");
            circuit_breaker.record_failure(&domain, &e.to_string());
        }
    }
}

/// Existence-only fast path (§4.7): skips rendering entirely.
pub async fn run_existence_only(config: &RunConfig, worker_index: usize, urls: &[String]) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let writer = PartialWriter::new(&config.out_dir, worker_index);
    for url in urls {
        let record = fetch::probe_existence(&http, url).await;
        writer.append_existence(&record)?;
    }
    Ok(())
}
