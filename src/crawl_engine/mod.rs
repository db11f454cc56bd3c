//! Per-worker fetch machinery shared by the crawl loop.
//!
//! These pieces are process-local (one instance per worker): the circuit
//! breaker and domain limiter protect a single worker's outbound requests,
//! they do not coordinate across processes. Cross-process coordination is
//! the job of [`crate::frontier`] and [`crate::claim`].

pub mod circuit_breaker;
pub mod crawl_types;
pub mod domain_limiter;
pub mod page_timeout;

pub use circuit_breaker::{CircuitBreaker, CircuitState, DomainHealth, extract_domain};
pub use crawl_types::FailureKind;
pub use domain_limiter::DomainLimiter;
pub use page_timeout::with_page_timeout;
