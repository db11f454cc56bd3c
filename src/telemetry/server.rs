//! Control Channel HTTP server (§6), built on `axum`.
//!
//! Runs in the Orchestrator process. Workers push updates via
//! `telemetry::client`; external readers (dashboard, tests) poll
//! `/snapshot` or read the persisted snapshot file directly.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::classifier::InputShape;
use crate::gate;
use crate::telemetry::hub::Hub;
use crate::telemetry::types::{TelemetrySnapshot, UpdateMessage};

#[derive(Clone)]
pub struct ServerState {
    pub hub: Arc<Hub>,
    pub out_dir: PathBuf,
    pub shape: Arc<InputShape>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/preflight", get(preflight))
        .route("/config", post(post_config))
        .route("/start", post(post_start))
        .route("/stop", post(post_stop))
        .route("/reset", post(post_reset))
        .route("/update", post(post_update))
        .route("/snapshot", get(get_snapshot))
        .route("/files", get(get_files))
        .route("/download", get(get_download))
        .with_state(state)
}

#[derive(Serialize)]
struct PreflightBody {
    shape: InputShape,
    options: Vec<&'static str>,
    selected: Vec<String>,
    applied: bool,
    started: bool,
}

async fn preflight(State(state): State<ServerState>) -> Json<PreflightBody> {
    let snapshot = state.hub.snapshot();
    Json(PreflightBody {
        shape: (*state.shape).clone(),
        options: ["urls", "site_catalog", "internal_links", "tree", "existence_csv", "comparison_csv"].into(),
        selected: Vec::new(),
        applied: false,
        started: snapshot.started,
    })
}

#[derive(Deserialize)]
struct ConfigRequest {
    outputs: Vec<String>,
}

#[derive(Serialize)]
struct ConfigResponse {
    valid: bool,
    errors: Vec<crate::error::GateError>,
}

async fn post_config(
    State(state): State<ServerState>,
    Json(body): Json<ConfigRequest>,
) -> Json<ConfigResponse> {
    let selected = gate::parse_selected(&body.outputs);
    let result = gate::validate(&state.shape, &selected);
    if result.ok {
        let payload = serde_json::to_vec_pretty(&body.outputs).unwrap_or_default();
        let _ = crate::atomic::write_retry(&state.out_dir.join("telemetry").join("config.json"), &payload);
    }
    Json(ConfigResponse {
        valid: result.ok,
        errors: result.errors,
    })
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

async fn post_start(State(state): State<ServerState>) -> Json<OkResponse> {
    state.hub.mark_started();
    Json(OkResponse { ok: true })
}

async fn post_stop(State(state): State<ServerState>) -> Json<OkResponse> {
    let ok = state.hub.write_stop_flag().is_ok();
    Json(OkResponse { ok })
}

async fn post_reset(State(state): State<ServerState>) -> Json<OkResponse> {
    let ok = state.hub.clear_stop_flag().is_ok();
    Json(OkResponse { ok })
}

async fn post_update(
    State(state): State<ServerState>,
    Json(update): Json<UpdateMessage>,
) -> StatusCode {
    state.hub.apply(update);
    StatusCode::NO_CONTENT
}

async fn get_snapshot(State(state): State<ServerState>) -> Json<TelemetrySnapshot> {
    Json(state.hub.snapshot())
}

#[derive(Serialize)]
struct FilesResponse {
    files: Vec<String>,
}

async fn get_files(State(state): State<ServerState>) -> Json<FilesResponse> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&state.out_dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }
    }
    Json(FilesResponse { files })
}

#[derive(Deserialize)]
struct DownloadQuery {
    file: String,
}

/// Scope-restricted download: the requested file must resolve to a path
/// still inside `out_dir` — no `..` escapes.
async fn get_download(
    State(state): State<ServerState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Vec<u8>, StatusCode> {
    let requested = state.out_dir.join(&query.file);
    let canonical_root = state
        .out_dir
        .canonicalize()
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let canonical = requested
        .canonicalize()
        .map_err(|_| StatusCode::NOT_FOUND)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(StatusCode::FORBIDDEN);
    }
    std::fs::read(&canonical).map_err(|_| StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(dir: &std::path::Path) -> ServerState {
        std::fs::create_dir_all(dir.join("telemetry")).unwrap();
        ServerState {
            hub: Hub::new(dir.join("telemetry")),
            out_dir: dir.to_path_buf(),
            shape: Arc::new(InputShape::absent()),
        }
    }

    #[tokio::test]
    async fn update_then_snapshot_reflects_bump() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path()));

        let update = serde_json::json!({"type": "bump", "counter": "urlsFound", "by": 5});
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/update")
                    .header("content-type", "application/json")
                    .body(Body::from(update.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::builder().uri("/snapshot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn download_rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download?file=../../etc/passwd")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::OK);
    }
}
