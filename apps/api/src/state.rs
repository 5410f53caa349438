use std::sync::Arc;

use crate::pipeline::listener::RequestListener;
use crate::pipeline::ports::RequestQueue;
use crate::pipeline::run::RankingPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RankingPipeline>,
    pub listener: Arc<RequestListener>,
    pub requests: Arc<dyn RequestQueue>,
}
