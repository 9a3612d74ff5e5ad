use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model_identifier: String,
    pub provider: String,
    pub fallback_enabled: bool,
    pub environment: &'static str,
    pub cache_entries: usize,
    pub version: &'static str,
}

/// GET /health
/// Reports configuration only; it never calls the model backend.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    Json(HealthResponse {
        ok: true,
        model_identifier: orchestrator.model().model_id().to_string(),
        provider: orchestrator.model().provider().to_string(),
        fallback_enabled: orchestrator.settings().fallback_enabled,
        environment: state.config.environment.as_str(),
        cache_entries: orchestrator.cache().len(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
