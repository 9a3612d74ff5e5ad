//! `Json` extractor whose rejections use the API error envelope.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::errors::{ApiError, AppError};

/// Like `axum::Json`, but a missing content type, malformed JSON or a
/// missing field is a 400 `VALIDATION_ERROR` instead of axum's plain-text
/// rejection.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text()).into()),
        }
    }
}
