//! Kernel control surface.
//!
//! - `POST /__kernel/control` → control protocol, body `{"type": ...}`
//! - `GET /__kernel/workers` → worker names and pending calls
//! - `POST /__kernel/workers/{name}` → dispatch `{"type", "payload"}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::control::{handle_control, ControlReply};
use crate::http::server::AppState;
use crate::workers::{WorkerError, WorkerInfo};

/// Path prefix reserved for the kernel's own endpoints.
pub const CONTROL_PREFIX: &str = "/__kernel";

pub fn control_router() -> Router<AppState> {
    Router::new()
        .route("/__kernel/control", post(post_control))
        .route("/__kernel/workers", get(get_workers))
        .route("/__kernel/workers/{name}", post(post_dispatch))
}

async fn post_control(State(state): State<AppState>, Json(raw): Json<Value>) -> Response {
    let (tx, rx) = oneshot::channel();
    handle_control(&state.kernel, raw, tx).await;

    match rx.await {
        Ok(reply) => {
            let status = if reply.is_success() {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(reply)).into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ControlReply::failure("control handler dropped the reply")),
        )
            .into_response(),
    }
}

async fn get_workers(State(state): State<AppState>) -> Json<Vec<WorkerInfo>> {
    Json(state.kernel.workers().info())
}

#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

async fn post_dispatch(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<DispatchBody>,
) -> Response {
    match state.kernel.workers().dispatch(&name, &body.kind, body.payload).await {
        Ok(result) => (StatusCode::OK, Json(json!({ "worker": name, "result": result }))).into_response(),
        Err(e) => {
            let status = dispatch_status(&e);
            tracing::debug!(worker = %name, error = %e, status = %status, "Worker dispatch failed");
            (status, Json(json!({ "worker": name, "error": e.to_string() }))).into_response()
        }
    }
}

fn dispatch_status(error: &WorkerError) -> StatusCode {
    match error {
        WorkerError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
        WorkerError::UnknownWorker(_) => StatusCode::NOT_FOUND,
        WorkerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        WorkerError::Failed(_) | WorkerError::Disconnected(_) => StatusCode::BAD_GATEWAY,
        WorkerError::Spawn { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
