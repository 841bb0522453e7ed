//! Registration and login endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::{self, AuthResponse};
use crate::extract::ApiJson;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Create an account and return a session token.
///
/// # Returns
/// - 201 Created with `{token, user}`
/// - 400 Bad Request if username or password is blank
/// - 409 Conflict if the username is taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = auth::register(&state, &body.username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for a session token.
///
/// # Returns
/// - 200 OK with `{token, user}`
/// - 401 Unauthorized for an unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = auth::login(&state, &body.username, &body.password).await?;
    Ok(Json(response))
}
