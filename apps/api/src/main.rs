mod config;
mod errors;
mod generation;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::orchestrator::GenerationOrchestrator;
use crate::llm_client::{LazyModelClient, ModelClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed numeric settings)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerPath API v{}", env!("CARGO_PKG_VERSION"));

    // Model client is built on first use; a missing key only fails generation calls
    let model: Arc<dyn ModelClient> = Arc::new(LazyModelClient::new(config.model.clone()));
    info!(
        "Model client configured (provider: {}, model: {}, fallback: {})",
        model.provider(),
        model.model_id(),
        config.fallback_enabled
    );
    if config.model.api_key.is_none() {
        warn!("MODEL_API_KEY is not set; hosted providers will report unavailable");
    }

    let orchestrator = Arc::new(GenerationOrchestrator::from_config(&config, model));
    info!(
        "Cache ttl {}s (max {} entries), rate limit {} requests per {}s",
        config.cache_ttl_secs,
        config.cache_max_size,
        config.rate_limit_max_requests,
        config.rate_limit_window_secs
    );

    let state = AppState {
        orchestrator,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
