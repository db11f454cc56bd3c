//! Process-local state aggregator (C4). Lives in the orchestrator process;
//! workers push updates to it over the Control Channel (`server.rs`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::atomic;
use crate::telemetry::types::{TelemetrySnapshot, UpdateMessage};

pub struct Hub {
    state: RwLock<TelemetrySnapshot>,
    snapshot_path: PathBuf,
    stop_flag_path: PathBuf,
}

impl Hub {
    pub fn new(telemetry_dir: impl Into<PathBuf>) -> Arc<Self> {
        let dir = telemetry_dir.into();
        Arc::new(Hub {
            state: RwLock::new(TelemetrySnapshot::default()),
            snapshot_path: dir.join("state.json"),
            stop_flag_path: dir.join("stop.flag"),
        })
    }

    /// Apply a tagged-variant update from a worker.
    pub fn apply(&self, update: UpdateMessage) {
        let mut state = self.state.write();
        match update {
            UpdateMessage::Thread {
                worker_id,
                phase,
                url,
                bucket,
                idle_counter,
            } => {
                state.threads.insert(
                    worker_id,
                    crate::telemetry::types::ThreadRecord {
                        phase,
                        url,
                        bucket,
                        idle_counter,
                    },
                );
            }
            UpdateMessage::Bucket {
                bucket,
                owner,
                processed,
                pending,
                last_url,
            } => {
                state.buckets.insert(
                    bucket,
                    crate::telemetry::types::BucketRecord {
                        owner,
                        processed,
                        pending,
                        last_url,
                    },
                );
            }
            UpdateMessage::Tree { path, sample_url } => {
                state.tree.push((path, sample_url));
            }
            UpdateMessage::Bump { counter, by } => {
                *state.totals.entry(counter).or_insert(0) += by;
            }
            UpdateMessage::Step { index, total, label } => {
                state.stepper.current_index = index;
                if state.stepper.steps.len() != total {
                    state.stepper.steps = (0..total).map(|i| format!("step-{i}")).collect();
                }
                if let Some(slot) = state.stepper.steps.get_mut(index) {
                    *slot = label;
                }
            }
            UpdateMessage::Mode { mode } => {
                state.mode = mode;
            }
            UpdateMessage::Event { message } => {
                state.push_event(message);
            }
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.read().clone()
    }

    pub fn mark_started(&self) {
        self.state.write().started = true;
    }

    /// Persist a JSON snapshot atomically so external readers can observe
    /// state without live RPC.
    pub fn persist(&self) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        let bytes = serde_json::to_vec_pretty(&snapshot).unwrap_or_default();
        atomic::write_retry(&self.snapshot_path, &bytes)
    }

    pub fn write_stop_flag(&self) -> std::io::Result<()> {
        atomic::write_retry(&self.stop_flag_path, b"stop")
    }

    pub fn clear_stop_flag(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.stop_flag_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_flag_path.exists()
    }

    pub fn stop_flag_path(&self) -> &Path {
        &self.stop_flag_path
    }

    /// Spawn a background task that persists a snapshot at a fixed cadence.
    pub fn spawn_snapshot_task(self: &Arc<Self>, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = hub.persist() {
                    log::warn!("telemetry snapshot persistence failed: {e}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_accumulates_totals() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Hub::new(dir.path());
        hub.apply(UpdateMessage::Bump {
            counter: "urlsFound".into(),
            by: 3,
        });
        hub.apply(UpdateMessage::Bump {
            counter: "urlsFound".into(),
            by: 4,
        });
        assert_eq!(hub.snapshot().totals.get("urlsFound"), Some(&7));
    }

    #[test]
    fn stop_flag_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Hub::new(dir.path());
        assert!(!hub.stop_requested());
        hub.write_stop_flag().unwrap();
        assert!(hub.stop_requested());
        hub.clear_stop_flag().unwrap();
        assert!(!hub.stop_requested());
    }

    #[test]
    fn persist_writes_a_readable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        let hub = Hub::new(dir.path());
        hub.apply(UpdateMessage::Mode { mode: "discovery".into() });
        hub.persist().unwrap();
        let bytes = std::fs::read(dir.path().join("state.json")).unwrap();
        let snapshot: TelemetrySnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(snapshot.mode, "discovery");
    }
}
