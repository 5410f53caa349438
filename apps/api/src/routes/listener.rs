use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::pipeline::listener::ListenerStatus;
use crate::pipeline::run::PipelineStatus;
use crate::state::AppState;

/// POST /api/v1/listener/start
pub async fn handle_start_listener(State(state): State<AppState>) -> Json<Value> {
    let message = if state.listener.start() {
        "Ranking request listener started"
    } else {
        "Listener is already running"
    };
    Json(json!({ "message": message }))
}

/// POST /api/v1/listener/stop
pub async fn handle_stop_listener(State(state): State<AppState>) -> Json<Value> {
    let message = if state.listener.stop().await {
        "Ranking request listener stopped"
    } else {
        "Listener is not running"
    };
    Json(json!({ "message": message }))
}

/// GET /api/v1/listener/status
pub async fn handle_listener_status(State(state): State<AppState>) -> Json<ListenerStatus> {
    Json(state.listener.status())
}

/// GET /api/v1/pipeline/status
pub async fn handle_pipeline_status(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(state.pipeline.status())
}
