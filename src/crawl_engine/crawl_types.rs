//! Core types shared by the worker's fetch loop.

/// Categorizes page failures for intelligent retry decisions.
///
/// Different failure types have different retry characteristics:
/// - Network errors are usually transient -> high retry value
/// - Browser errors may recover with backoff -> medium retry value
/// - Content errors are usually permanent -> low/no retry value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network-level failure (timeout, DNS, connection refused)
    Network,
    /// Browser/page failure (crash, resource exhaustion, CDP error)
    Browser,
    /// Content extraction failure (invalid HTML, missing elements)
    ContentExtraction,
    /// Rate limiting detected (HTTP 429)
    RateLimited,
    /// Unknown/unclassified error
    Unknown,
}

impl FailureKind {
    /// Classify an error into a failure kind based on error message patterns.
    #[must_use]
    pub fn classify(error: &anyhow::Error) -> Self {
        let msg = error.to_string().to_lowercase();

        if msg.contains("429") || msg.contains("too many requests") || msg.contains("rate limit") {
            return Self::RateLimited;
        }

        if msg.contains("timeout")
            || msg.contains("timed out")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("dns")
            || msg.contains("network")
            || msg.contains("unreachable")
            || msg.contains("eof")
        {
            return Self::Network;
        }

        if msg.contains("browser")
            || msg.contains("page")
            || msg.contains("chrome")
            || msg.contains("cdp")
            || msg.contains("target")
            || msg.contains("session")
        {
            return Self::Browser;
        }

        if msg.contains("extract")
            || msg.contains("validation")
            || msg.contains("content")
            || msg.contains("html")
            || msg.contains("parse")
            || msg.contains("selector")
        {
            return Self::ContentExtraction;
        }

        Self::Unknown
    }

    /// Whether this failure kind should be retried by default.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Browser | Self::RateLimited | Self::Unknown => true,
            Self::ContentExtraction => false,
        }
    }

    /// Base delay multiplier for this failure kind.
    #[must_use]
    pub const fn delay_multiplier(&self) -> f64 {
        match self {
            Self::Network => 1.0,
            Self::Browser => 1.5,
            Self::RateLimited => 3.0,
            Self::ContentExtraction | Self::Unknown => 1.0,
        }
    }
}
