//! Worker-side telemetry client: pushes `UpdateMessage`s to the
//! orchestrator's Control Channel over plain HTTP via `reqwest`.
//!
//! Telemetry delivery is best-effort: a failed `POST /update` never fails
//! the worker's fetch loop, it only logs a warning.

use crate::telemetry::types::UpdateMessage;

#[derive(Clone)]
pub struct TelemetryClient {
    base_url: String,
    http: reqwest::Client,
}

impl TelemetryClient {
    pub fn new(port: u16) -> Self {
        TelemetryClient {
            base_url: format!("http://127.0.0.1:{port}"),
            http: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, update: UpdateMessage) {
        let url = format!("{}/update", self.base_url);
        if let Err(e) = self.http.post(&url).json(&update).send().await {
            log::warn!("telemetry update failed: {e}");
        }
    }

    pub async fn thread(&self, worker_id: impl Into<String>, phase: impl Into<String>, url: Option<String>, bucket: Option<u32>, idle_counter: u32) {
        self.send(UpdateMessage::Thread {
            worker_id: worker_id.into(),
            phase: phase.into(),
            url,
            bucket,
            idle_counter,
        })
        .await;
    }

    pub async fn bump(&self, counter: impl Into<String>, by: u64) {
        self.send(UpdateMessage::Bump {
            counter: counter.into(),
            by,
        })
        .await;
    }

    pub async fn event(&self, message: impl Into<String>) {
        self.send(UpdateMessage::Event {
            message: message.into(),
        })
        .await;
    }
}
