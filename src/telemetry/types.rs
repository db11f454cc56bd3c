//! Wire types for the Telemetry Hub's Control Channel (§4.4, §6).
//!
//! Worker → hub updates are tagged variants over a single RPC endpoint,
//! matching the design note in spec §9: one discriminator field, one
//! handler per variant, wire format JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdateMessage {
    Thread {
        worker_id: String,
        phase: String,
        url: Option<String>,
        bucket: Option<u32>,
        idle_counter: u32,
    },
    Bucket {
        bucket: u32,
        owner: Option<String>,
        processed: u64,
        pending: u64,
        last_url: Option<String>,
    },
    Tree {
        path: String,
        sample_url: String,
    },
    Bump {
        counter: String,
        by: u64,
    },
    Step {
        index: usize,
        total: usize,
        label: String,
    },
    Mode {
        mode: String,
    },
    Event {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadRecord {
    pub phase: String,
    pub url: Option<String>,
    pub bucket: Option<u32>,
    pub idle_counter: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BucketRecord {
    pub owner: Option<String>,
    pub processed: u64,
    pub pending: u64,
    pub last_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stepper {
    pub steps: Vec<String>,
    pub current_index: usize,
}

const EVENT_RING_CAPACITY: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetrySnapshot {
    pub mode: String,
    pub stepper: Stepper,
    pub totals: BTreeMap<String, u64>,
    pub threads: BTreeMap<String, ThreadRecord>,
    pub buckets: BTreeMap<u32, BucketRecord>,
    pub tree: Vec<(String, String)>,
    pub events: Vec<String>,
    pub started: bool,
}

impl TelemetrySnapshot {
    pub fn push_event(&mut self, message: String) {
        self.events.push(message);
        if self.events.len() > EVENT_RING_CAPACITY {
            let excess = self.events.len() - EVENT_RING_CAPACITY;
            self.events.drain(0..excess);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightResponse {
    pub shape: crate::classifier::InputShape,
    pub selected: Vec<String>,
    pub applied: bool,
    pub started: bool,
}
