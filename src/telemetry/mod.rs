//! Telemetry Hub (C4): process-local state aggregator plus its Control
//! Channel transport.

pub mod client;
pub mod hub;
pub mod server;
pub mod types;

pub use client::TelemetryClient;
pub use hub::Hub;
pub use types::{BucketRecord, TelemetrySnapshot, ThreadRecord, UpdateMessage};
