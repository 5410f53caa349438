mod config;
mod db;
mod enrichment;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod ranking;
mod repository;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, PipelineConfig};
use crate::db::create_pool;
use crate::enrichment::{build_enrichers, http_client};
use crate::llm_client::{LlmClient, TextModel};
use crate::pipeline::enricher::EnricherSet;
use crate::pipeline::listener::RequestListener;
use crate::pipeline::per_applicant::PerApplicantDispatcher;
use crate::pipeline::per_source::PerSourceDispatcher;
use crate::pipeline::run::RankingPipeline;
use crate::pipeline::{DispatchStrategy, Dispatcher};
use crate::ranking::llm::LlmRankingClient;
use crate::repository::PgRepository;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting shortlist API v{}", env!("CARGO_PKG_VERSION"));

    let pipeline_config = &config.pipeline;
    // Every worker may hold a connection while persisting; leave headroom for HTTP handlers.
    let max_connections = (pipeline_config.max_workers as u32).saturating_add(5);
    let db = create_pool(&config.database_url, max_connections).await?;
    let repository = Arc::new(PgRepository::new(db));

    let llm: Arc<dyn TextModel> = Arc::new(
        LlmClient::new(config.anthropic_api_key.clone()).context("failed to build LLM client")?,
    );
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let http = http_client(pipeline_config.source_timeout).context("failed to build HTTP client")?;
    let enrichers = build_enrichers(http, llm.clone(), &config.scrapers);
    let dispatcher = build_dispatcher(pipeline_config, enrichers);
    info!(
        strategy = dispatcher.name(),
        max_workers = pipeline_config.max_workers,
        source_timeout_secs = pipeline_config.source_timeout.as_secs_f64(),
        "dispatcher configured"
    );

    let pipeline = Arc::new(RankingPipeline::new(
        repository.clone(),
        repository.clone(),
        Arc::new(LlmRankingClient::new(llm)),
        dispatcher,
        pipeline_config.ranking_top_n,
    ));
    let listener = Arc::new(RequestListener::new(
        pipeline.clone(),
        repository.clone(),
        pipeline_config.polling_interval,
    ));
    listener.start();

    let state = AppState {
        pipeline,
        listener: listener.clone(),
        requests: repository,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let tcp = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    listener.stop().await;
    info!("Shutdown complete");
    Ok(())
}

fn build_dispatcher(config: &PipelineConfig, enrichers: EnricherSet) -> Arc<dyn Dispatcher> {
    match config.strategy {
        DispatchStrategy::PerApplicant => Arc::new(PerApplicantDispatcher::new(
            enrichers,
            config.max_workers,
            config.source_timeout,
        )),
        DispatchStrategy::PerSource => Arc::new(PerSourceDispatcher::new(
            enrichers,
            config.max_workers,
            config.workers,
            config.source_timeout,
            config.queue_idle_timeout,
        )),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
