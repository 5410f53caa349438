pub mod health;
pub mod listener;
pub mod ranking;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ranking requests
        .route(
            "/api/v1/postings/:post_id/ranking",
            post(ranking::handle_request_ranking).get(ranking::handle_get_ranking),
        )
        // Listener control
        .route(
            "/api/v1/listener/start",
            post(listener::handle_start_listener),
        )
        .route("/api/v1/listener/stop", post(listener::handle_stop_listener))
        .route(
            "/api/v1/listener/status",
            get(listener::handle_listener_status),
        )
        .route(
            "/api/v1/pipeline/status",
            get(listener::handle_pipeline_status),
        )
        .with_state(state)
}
