mod chat;
mod config;
mod errors;
mod generation;
mod llm_client;
mod resume;
mod retrieval;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::controller::ConversationController;
use crate::chat::store::SessionStore;
use crate::config::Config;
use crate::generation::LlmResponseGenerator;
use crate::llm_client::LlmClient;
use crate::resume::PdfResumeExtractor;
use crate::retrieval::embedding::EmbeddingClient;
use crate::retrieval::index::{load_postings, JobIndex};
use crate::retrieval::EmbeddingRetriever;
use crate::routes::build_router;
use crate::state::AppState;

/// How often idle sessions are swept.
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration is read exactly once, before anything else.
    let config = Config::from_env()?;

    // Initialize structured logging
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

    info!("Starting Jobs AI API v{}", env!("CARGO_PKG_VERSION"));

    // Retrieval: embed the posting corpus up front
    let embedder = EmbeddingClient::new(
        config.embedding_api_url.clone(),
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
    )?;
    let postings = load_postings(&config.jobs_path)?;
    info!(
        "Loaded {} job postings from {}",
        postings.len(),
        config.jobs_path.display()
    );
    let index = JobIndex::build(postings, &embedder)
        .await
        .context("Failed to build job index")?;
    info!(
        "Job index ready: {} postings (embedding model: {})",
        index.len(),
        embedder.model()
    );
    let retrieval = EmbeddingRetriever::new(embedder, index, config.retrieval_top_k);

    // Generation
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let controller = ConversationController::new(
        Arc::new(PdfResumeExtractor),
        Arc::new(retrieval),
        Arc::new(LlmResponseGenerator::new(llm)),
    );

    let sessions = SessionStore::new();
    spawn_session_reaper(sessions.clone(), config.session_idle_timeout()?);

    let state = AppState {
        controller: Arc::new(controller),
        sessions,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Ends sessions that have been idle longer than `max_idle`.
fn spawn_session_reaper(sessions: SessionStore, max_idle: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAPER_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.evict_idle(max_idle).await;
        }
    });
}
