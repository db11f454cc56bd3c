//! Command-line surface, parsed with `clap`'s derive API.
//!
//! One binary serves two roles: the orchestrator process (no `--mode`
//! flag) and a worker child process (`--mode` present, spawned by the
//! orchestrator with its index/total/bucket-count baked in).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "mc-crawl", version, about = "Distributed web-crawl orchestrator")]
pub struct Cli {
    /// Base origin to crawl, e.g. https://example.com
    #[arg(long)]
    pub base: Option<String>,

    /// Optional delimited input file (CSV/TSV) of expected rows or explicit URLs.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Selected outputs, comma-separated: urls,site_catalog,internal_links,tree,existence_csv,comparison_csv.
    #[arg(long, value_delimiter = ',')]
    pub outputs: Option<Vec<String>>,

    /// Path prefix the crawl is restricted to, e.g. /docs
    #[arg(long = "pathPrefix")]
    pub path_prefix: Option<String>,

    /// Output directory for all artifacts and reports.
    #[arg(long = "outDir", default_value = "./dist")]
    pub out_dir: PathBuf,

    /// Number of worker processes.
    #[arg(long)]
    pub shards: Option<usize>,

    /// Number of frontier buckets.
    #[arg(long = "bucketParts")]
    pub bucket_parts: Option<u32>,

    /// Per-worker bounded page-load concurrency.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep the `page` query parameter (pagination) on normalized links.
    #[arg(long = "keepPageParam")]
    pub keep_page_param: Option<bool>,

    /// Force-rebuild the internal-links report even if cached.
    #[arg(long = "rebuildLinks")]
    pub rebuild_links: Option<bool>,

    /// Drop the fetch cache after a successful merge.
    #[arg(long = "dropCache")]
    pub drop_cache: Option<bool>,

    /// Run the browser headless.
    #[arg(long)]
    pub headless: Option<bool>,

    /// Port the Telemetry Hub's Control Channel listens on.
    #[arg(long = "telemetryPort", env = "TELEMETRY_PORT")]
    pub telemetry_port: Option<u16>,

    /// Worker-internal: discovery mode for this worker process.
    #[arg(long)]
    pub mode: Option<WorkerMode>,

    /// Worker-internal: this worker's 0-based index.
    #[arg(long = "workerIndex")]
    pub worker_index: Option<usize>,

    /// Worker-internal: total number of workers in this run.
    #[arg(long = "workerTotal")]
    pub worker_total: Option<usize>,

    /// Polite post-claim delay, in milliseconds.
    #[arg(long = "politeDelayMs", env = "MC_POLITE_DELAY_MS")]
    pub polite_delay_ms: Option<u64>,

    /// Bucket file rotation threshold, in bytes.
    #[arg(long = "bucketMaxBytes", env = "MC_BUCKET_MAX_BYTES")]
    pub mc_bucket_max_bytes: Option<u64>,

    /// Claim lock acquisition retry budget.
    #[arg(long = "lockTries", env = "MC_LOCK_TRIES")]
    pub mc_lock_tries: Option<u32>,

    /// Claim lock retry sleep, in milliseconds.
    #[arg(long = "lockSleep", env = "MC_LOCK_SLEEP")]
    pub mc_lock_sleep: Option<u64>,

    /// Claim ledger `.done` file retention cap.
    #[arg(long = "maxDone", env = "MC_MAX_DONE")]
    pub mc_max_done: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkerMode {
    Frontier,
    #[value(name = "root-urls")]
    RootUrls,
}

#[derive(Debug, Clone)]
pub struct WorkerArgs {
    pub mode: WorkerMode,
    pub index: usize,
    pub total: usize,
}

pub enum RunRole {
    Orchestrator,
    Worker(WorkerArgs),
}

impl Cli {
    pub fn role(&self) -> RunRole {
        match self.mode {
            Some(mode) => RunRole::Worker(WorkerArgs {
                mode,
                index: self.worker_index.unwrap_or(0),
                total: self.worker_total.unwrap_or(1),
            }),
            None => RunRole::Orchestrator,
        }
    }
}
