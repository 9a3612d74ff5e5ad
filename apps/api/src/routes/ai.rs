//! Axum route handlers for the roadmap generation API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{ApiError, AppError};
use crate::generation::orchestrator::document_from_text;
use crate::models::roadmap::{GeneratedRoadmap, RoadmapDocument};
use crate::routes::client_identity::ClientIdentity;
use crate::routes::json_body::JsonBody;
use crate::state::AppState;

/// Upper bound on caller-supplied text for `/normalize`.
const MAX_NORMALIZE_BYTES: usize = 64 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub raw: String,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub entries_removed: usize,
}

#[derive(Debug, Serialize)]
pub struct AiStatusResponse {
    pub ok: bool,
    pub provider: String,
    pub model_identifier: String,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ai/generate
///
/// Turns a free-text career query into a normalized roadmap. Served from the
/// cache when an identical prompt was generated within the TTL.
pub async fn handle_generate(
    State(state): State<AppState>,
    ClientIdentity(client): ClientIdentity,
    JsonBody(request): JsonBody<GenerateRequest>,
) -> Result<Json<GeneratedRoadmap>, ApiError> {
    state
        .orchestrator
        .generate(&client, &request.prompt)
        .await
        .map(Json)
        .map_err(|e| e.in_env(state.config.environment))
}

/// POST /api/ai/normalize
///
/// Runs extraction and normalization over caller-supplied text. Failures here
/// are the caller's, so they surface as 400.
pub async fn handle_normalize(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NormalizeRequest>,
) -> Result<Json<RoadmapDocument>, ApiError> {
    let env = state.config.environment;
    if request.raw.trim().is_empty() {
        return Err(AppError::Validation("raw cannot be empty".to_string()).in_env(env));
    }
    if request.raw.len() > MAX_NORMALIZE_BYTES {
        return Err(AppError::Validation(format!(
            "raw exceeds {MAX_NORMALIZE_BYTES} bytes"
        ))
        .in_env(env));
    }

    document_from_text(&request.raw, state.orchestrator.settings().schema_profile)
        .map(Json)
        .map_err(|e| match e {
            AppError::UnparseableResponse { .. } => {
                AppError::Validation("no JSON object could be recovered from raw".to_string())
            }
            other => AppError::Validation(other.to_string()),
        })
        .map_err(|e| e.in_env(env))
}

/// DELETE /api/ai/cache
///
/// Development/administrative use only; put it behind auth in any real deployment.
pub async fn handle_clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let entries_removed = state.orchestrator.cache().clear();
    info!(entries_removed, "Response cache cleared");
    Json(ClearCacheResponse { entries_removed })
}

/// GET /api/ai/status
///
/// Forces lazy model client construction and reports whether it succeeded.
pub async fn handle_ai_status(State(state): State<AppState>) -> Json<AiStatusResponse> {
    let model = state.orchestrator.model();
    let (ok, message) = match model.probe().await {
        Ok(()) => (true, "Model client is ready".to_string()),
        Err(e) => (false, e.to_string()),
    };
    Json(AiStatusResponse {
        ok,
        provider: model.provider().to_string(),
        model_identifier: model.model_id().to_string(),
        message,
    })
}
