use std::sync::Arc;

use crate::config::Config;
use crate::generation::orchestrator::GenerationOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the response cache, rate limiter and model client for the process.
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub config: Config,
}
