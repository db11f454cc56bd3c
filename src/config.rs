//! Run configuration: a single validated record built from CLI args and
//! environment variables, in place of passing loose flags around.
//!
//! Follows the teacher's typestate-builder idiom: the builder can only
//! reach `.build()` once the required fields have been supplied, enforced
//! at compile time via phantom marker types.

use std::marker::PhantomData;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{McCrawlError, Result};
use crate::utils::constants::{
    DEFAULT_BUCKET_MAX_BYTES, DEFAULT_BUCKET_PARTS, DEFAULT_CONCURRENCY, DEFAULT_MAX_DONE,
    DEFAULT_SHARDS,
};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base: String,
    pub input: Option<PathBuf>,
    pub path_prefix: String,
    pub out_dir: PathBuf,
    pub shards: usize,
    pub bucket_parts: u32,
    pub concurrency: usize,
    pub keep_page_param: bool,
    pub rebuild_links: bool,
    pub drop_cache: bool,
    pub headless: bool,
    pub telemetry_port: u16,
    pub polite_delay_ms: u64,
    pub bucket_max_bytes: u64,
    pub lock_tries: u32,
    pub lock_sleep_ms: u64,
    pub max_done: usize,
    pub outputs: Vec<String>,
}

/// Outputs requested when `--outputs` is not given: the four reports that
/// are always legal regardless of input shape (§4.6).
pub fn default_outputs() -> Vec<String> {
    vec![
        "urls".to_string(),
        "site_catalog".to_string(),
        "internal_links".to_string(),
        "tree".to_string(),
    ]
}

impl RunConfig {
    /// Build a `RunConfig` from parsed CLI args, applying documented defaults.
    ///
    /// The `--base` flag is required for the orchestrator role but optional
    /// on the clap struct itself (workers don't need it to be re-specified
    /// defensively) — this is where the requirement is actually enforced.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let base = cli
            .base
            .clone()
            .ok_or_else(|| McCrawlError::Config("--base is required".into()))?;

        let mut builder = RunConfigBuilder::new().base(base);
        if let Some(input) = cli.input.clone() {
            builder = builder.input(input);
        }
        if let Some(prefix) = cli.path_prefix.clone() {
            builder = builder.path_prefix(prefix);
        }
        builder = builder.out_dir(cli.out_dir.clone());
        if let Some(v) = cli.shards {
            builder = builder.shards(v);
        }
        if let Some(v) = cli.bucket_parts {
            builder = builder.bucket_parts(v);
        }
        if let Some(v) = cli.concurrency {
            builder = builder.concurrency(v);
        }
        if let Some(v) = cli.keep_page_param {
            builder = builder.keep_page_param(v);
        }
        if let Some(v) = cli.rebuild_links {
            builder = builder.rebuild_links(v);
        }
        if let Some(v) = cli.drop_cache {
            builder = builder.drop_cache(v);
        }
        if let Some(v) = cli.headless {
            builder = builder.headless(v);
        }
        if let Some(v) = cli.telemetry_port {
            builder = builder.telemetry_port(v);
        }
        if let Some(v) = cli.polite_delay_ms {
            builder = builder.polite_delay_ms(v);
        }
        if let Some(v) = cli.mc_bucket_max_bytes {
            builder = builder.bucket_max_bytes(v);
        }
        if let Some(v) = cli.mc_lock_tries {
            builder = builder.lock_tries(v);
        }
        if let Some(v) = cli.mc_lock_sleep {
            builder = builder.lock_sleep_ms(v);
        }
        if let Some(v) = cli.mc_max_done {
            builder = builder.max_done(v);
        }
        if let Some(v) = cli.outputs.clone() {
            builder = builder.outputs(v);
        }

        Ok(builder.build())
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.out_dir.join("telemetry")
    }

    pub fn frontier_dir(&self) -> PathBuf {
        self.out_dir.join("frontier")
    }

    pub fn claim_dir(&self) -> PathBuf {
        self.out_dir.join("disco-locks")
    }
}

pub struct Unset;
pub struct WithBase;

/// Typestate builder: `.base(..)` must be called before `.build()` is
/// reachable, matching the teacher's `CrawlConfigBuilder<State>` pattern.
pub struct RunConfigBuilder<State> {
    base: Option<String>,
    input: Option<PathBuf>,
    path_prefix: String,
    out_dir: PathBuf,
    shards: usize,
    bucket_parts: u32,
    concurrency: usize,
    keep_page_param: bool,
    rebuild_links: bool,
    drop_cache: bool,
    headless: bool,
    telemetry_port: u16,
    polite_delay_ms: u64,
    bucket_max_bytes: u64,
    lock_tries: u32,
    lock_sleep_ms: u64,
    max_done: usize,
    outputs: Vec<String>,
    _state: PhantomData<State>,
}

impl RunConfigBuilder<Unset> {
    pub fn new() -> Self {
        RunConfigBuilder {
            base: None,
            input: None,
            path_prefix: String::new(),
            out_dir: PathBuf::from("./dist"),
            shards: DEFAULT_SHARDS,
            bucket_parts: DEFAULT_BUCKET_PARTS,
            concurrency: DEFAULT_CONCURRENCY,
            keep_page_param: false,
            rebuild_links: false,
            drop_cache: false,
            headless: true,
            telemetry_port: 0,
            polite_delay_ms: 0,
            bucket_max_bytes: DEFAULT_BUCKET_MAX_BYTES,
            lock_tries: 60,
            lock_sleep_ms: 100,
            max_done: DEFAULT_MAX_DONE,
            outputs: default_outputs(),
            _state: PhantomData,
        }
    }

    pub fn base(self, base: impl Into<String>) -> RunConfigBuilder<WithBase> {
        RunConfigBuilder {
            base: Some(base.into()),
            input: self.input,
            path_prefix: self.path_prefix,
            out_dir: self.out_dir,
            shards: self.shards,
            bucket_parts: self.bucket_parts,
            concurrency: self.concurrency,
            keep_page_param: self.keep_page_param,
            rebuild_links: self.rebuild_links,
            drop_cache: self.drop_cache,
            headless: self.headless,
            telemetry_port: self.telemetry_port,
            polite_delay_ms: self.polite_delay_ms,
            bucket_max_bytes: self.bucket_max_bytes,
            lock_tries: self.lock_tries,
            lock_sleep_ms: self.lock_sleep_ms,
            max_done: self.max_done,
            outputs: self.outputs,
            _state: PhantomData,
        }
    }
}

impl Default for RunConfigBuilder<Unset> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = value;
            self
        }
    };
}

impl<State> RunConfigBuilder<State> {
    pub fn input(mut self, input: PathBuf) -> Self {
        self.input = Some(input);
        self
    }

    setter!(path_prefix, String);
    setter!(out_dir, PathBuf);
    setter!(shards, usize);
    setter!(bucket_parts, u32);
    setter!(concurrency, usize);
    setter!(keep_page_param, bool);
    setter!(rebuild_links, bool);
    setter!(drop_cache, bool);
    setter!(headless, bool);
    setter!(telemetry_port, u16);
    setter!(polite_delay_ms, u64);
    setter!(bucket_max_bytes, u64);
    setter!(lock_tries, u32);
    setter!(lock_sleep_ms, u64);
    setter!(max_done, usize);
    setter!(outputs, Vec<String>);
}

impl RunConfigBuilder<WithBase> {
    pub fn build(self) -> RunConfig {
        RunConfig {
            base: self.base.expect("WithBase guarantees base is set"),
            input: self.input,
            path_prefix: self.path_prefix,
            out_dir: self.out_dir,
            shards: self.shards,
            bucket_parts: self.bucket_parts,
            concurrency: self.concurrency,
            keep_page_param: self.keep_page_param,
            rebuild_links: self.rebuild_links,
            drop_cache: self.drop_cache,
            headless: self.headless,
            telemetry_port: self.telemetry_port,
            polite_delay_ms: self.polite_delay_ms,
            bucket_max_bytes: self.bucket_max_bytes,
            lock_tries: self.lock_tries,
            lock_sleep_ms: self.lock_sleep_ms,
            max_done: self.max_done,
            outputs: self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn builder_requires_base_at_the_type_level() {
        let cfg = RunConfigBuilder::new()
            .base("https://example.com")
            .shards(8)
            .build();
        assert_eq!(cfg.base, "https://example.com");
        assert_eq!(cfg.shards, 8);
        assert_eq!(cfg.bucket_parts, DEFAULT_BUCKET_PARTS);
    }

    #[test]
    fn from_cli_rejects_missing_base() {
        let cli = Cli::parse_from(["mc-crawl"]);
        assert!(RunConfig::from_cli(&cli).is_err());
    }
}
