use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::Environment;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Rate limit exceeded: at most {limit} requests per {window_secs} seconds")]
    RateLimited {
        limit: usize,
        window_secs: u64,
        retry_after_secs: u64,
    },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model invocation failed: {message}")]
    ModelInvocation {
        message: String,
        credential_or_quota: bool,
    },

    #[error("Could not recover a JSON object from model output: {snippet}")]
    UnparseableResponse { snippet: String },

    #[error("Incomplete roadmap document, missing: {}", .0.join(", "))]
    IncompleteDocument(Vec<String>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Binds the error to an environment profile so the response can decide
    /// whether to echo the underlying message.
    pub fn in_env(self, environment: Environment) -> ApiError {
        ApiError {
            error: self,
            environment,
        }
    }
}

/// An `AppError` paired with the environment profile it is rendered under.
/// Development echoes upstream failure detail; production never does.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    environment: Environment,
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        error.in_env(Environment::Production)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let echo = self.environment == Environment::Development;
        let detail = self.error.to_string();
        let upstream = |generic: &str| {
            if echo {
                detail.clone()
            } else {
                generic.to_string()
            }
        };

        let (status, code, message) = match &self.error {
            AppError::InvalidPrompt(msg) => (StatusCode::BAD_REQUEST, "INVALID_PROMPT", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", detail.clone())
            }
            AppError::ModelUnavailable(msg) => {
                tracing::error!("Model unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MODEL_UNAVAILABLE",
                    upstream("The AI generator is unavailable"),
                )
            }
            AppError::ModelInvocation {
                message,
                credential_or_quota,
            } => {
                tracing::error!("Model invocation error: {message}");
                let status = if *credential_or_quota {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, "MODEL_ERROR", upstream("AI generation failed"))
            }
            AppError::UnparseableResponse { snippet } => {
                tracing::error!("Unparseable model response (snippet): {snippet}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNPARSEABLE_RESPONSE",
                    upstream("AI generation returned an unreadable response"),
                )
            }
            AppError::IncompleteDocument(missing) => {
                tracing::error!("Incomplete roadmap document, missing: {missing:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INCOMPLETE_DOCUMENT",
                    upstream("AI generation returned an incomplete roadmap"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    upstream("An internal server error occurred"),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let AppError::RateLimited {
            retry_after_secs, ..
        } = &self.error
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
