//! Shared configuration constants.

/// Chrome user agent string for stealth mode.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Default number of buckets partitioning the frontier.
pub const DEFAULT_BUCKET_PARTS: u32 = 16;

/// Default number of worker processes.
pub const DEFAULT_SHARDS: usize = 4;

/// Default bounded-concurrency page-load pool size, per worker.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Quiescence tick interval.
pub const QUIESCENCE_TICK_MS: u64 = 200;

/// Telemetry snapshot persistence cadence.
pub const TELEMETRY_SNAPSHOT_MS: u64 = 700;

/// Consecutive stable fingerprint ticks required to declare quiescence.
pub const QUIESCENCE_STABLE_CYCLES: u32 = 5;

/// Consecutive idle cycles (no work found) as an alternate quiescence path.
pub const QUIESCENCE_WORKERS_IDLE: u32 = 50;

/// Claims ledger trimming cap: number of `.done` files retained before pruning oldest.
pub const DEFAULT_MAX_DONE: usize = 50_000;

/// Per-bucket append-file rotation threshold, in bytes.
pub const DEFAULT_BUCKET_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Consecutive empty claim attempts on one bucket before releasing its owner lease.
pub const BUCKET_IDLE_RELEASE_AFTER: u32 = 6;

/// How often (in completed claims) a worker prunes its claim ledger's `.done` files.
pub const CLAIM_TRIM_INTERVAL: u32 = 500;
