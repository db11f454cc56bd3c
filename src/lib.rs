//! Filesystem-coordinated distributed web-crawl orchestrator.
//!
//! A pool of worker processes discovers, fetches, and validates the
//! meta-content of a target site. Coordination happens entirely through
//! the filesystem (the bucketed frontier and the URL claim ledger) plus
//! a local HTTP control/telemetry channel — no shared database, no
//! cross-process memory.

pub mod atomic;
pub mod browser_setup;
pub mod claim;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod crawl_engine;
pub mod error;
pub mod frontier;
pub mod gate;
pub mod orchestrator;
pub mod reports;
pub mod telemetry;
pub mod text_norm;
pub mod url_norm;
pub mod utils;
pub mod worker;

pub use error::{McCrawlError, Result};
