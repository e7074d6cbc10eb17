mod auth;
mod config;
mod db;
mod errors;
mod interview;
mod jobs;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scheduler;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::dispatcher::HttpCallDispatcher;
use crate::interview::evaluator::LlmInterviewEvaluator;
use crate::llm_client::LlmClient;
use crate::pipeline::locks::LockRegistry;
use crate::routes::build_router;
use crate::scheduler::{sink::DispatchSink, CallScheduler, InMemoryTaskStore};
use crate::scoring::semantic::LlmSemanticScorer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pipeline API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client (shared by the resume scorer and the evaluator)
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let semantic_scorer = Arc::new(LlmSemanticScorer::new(llm.clone()));
    let evaluator = Arc::new(LlmInterviewEvaluator::new(llm));

    // Call scheduler: in-memory task store draining into the telephony
    // dispatcher, which re-checks application status before dialing.
    let dispatcher = Arc::new(HttpCallDispatcher::new(&config));
    let sink = Arc::new(DispatchSink::new(db.clone(), dispatcher));
    let scheduler = CallScheduler::new(Arc::new(InMemoryTaskStore::default()), sink);
    let scheduler_handle = scheduler.start();

    let state = AppState {
        db,
        semantic_scorer,
        evaluator,
        scheduler: scheduler.clone(),
        locks: LockRegistry::new(),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    scheduler.stop();
    scheduler_handle.await?;

    Ok(())
}
