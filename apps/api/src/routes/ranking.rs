//! Ranking request endpoints. Requests are only queued here; the listener runs them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::ports::CreateRequestOutcome;
use crate::state::AppState;

fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid posting id")))
}

/// POST /api/v1/postings/:post_id/ranking
pub async fn handle_request_ranking(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let post_id = parse_post_id(&post_id)?;

    match state.requests.create_request(post_id, "api").await? {
        CreateRequestOutcome::Created { request_id } => {
            info!(%post_id, %request_id, "ranking request queued");
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "message": "Ranking request created successfully",
                    "request_id": request_id,
                    "post_id": post_id,
                    "status": "pending"
                })),
            ))
        }
        CreateRequestOutcome::Existing { request_id, status } => Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Ranking request already exists for this post",
                "request_id": request_id,
                "post_id": post_id,
                "status": status.unwrap_or_else(|| "pending".to_string())
            })),
        )),
    }
}

/// GET /api/v1/postings/:post_id/ranking
pub async fn handle_get_ranking(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let request = state
        .requests
        .find_request(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No ranking request for posting {post_id}")))?;

    Ok(Json(json!({
        "request_id": request.id,
        "post_id": request.post_id,
        "status": request.status.unwrap_or_else(|| "pending".to_string()),
        "requested_via": request.requested_via,
        "created_at": request.created_at,
        "processed_at": request.processed_at,
        "result": request.result
    })))
}
