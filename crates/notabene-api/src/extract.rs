//! Request body extraction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor whose rejections render as `{"error": message}`.
///
/// Wraps [`axum::Json`] so a malformed body, a wrong field type or a missing
/// content type answers 400 in the same shape as every other API error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(
            subsystem = "api",
            status = rejection.status().as_u16(),
            error = %rejection.body_text(),
            "Rejected request body"
        );
        ApiError::BadRequest(rejection.body_text())
    }
}
