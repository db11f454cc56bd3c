//! Crate-wide error type.
//!
//! Only the fatal classes from the error-handling design get a variant
//! here — transient contention, competitive claim acquisition, failed
//! navigations, and out-of-scope URLs are represented as ordinary
//! `Result`/`Option` values at their call sites and never reach this type.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, McCrawlError>;

#[derive(Debug, thiserror::Error)]
pub enum McCrawlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("output directory is not writable: {0}")]
    OutDirUnwritable(PathBuf),

    #[error("input classification failed: {0}")]
    Classifier(String),

    #[error("output gate rejected the requested reports: {0:?}")]
    Gate(Vec<GateError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single `{key, reason}` rejection from the Output Gate (C6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GateError {
    pub key: String,
    pub reason: String,
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}
