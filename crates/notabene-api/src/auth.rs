//! Authentication: the bearer-token request gate and session issuance.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use notabene_core::{SessionRepository, User, UserProfile, UserRepository};
use notabene_crypto::{
    generate_access_token, hash_password, hash_token, looks_like_access_token, verify_password,
    PasswordParams,
};

use crate::{ApiError, AppState};

pub const MISSING_TOKEN: &str = "Access token required";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Extractor for authenticated requests.
///
/// Missing or non-Bearer credentials are rejected with 401; a token that
/// does not resolve to a live session is rejected with 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

impl From<UserProfile> for AuthUser {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id,
            username: profile.username,
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    let value = header_value?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = bearer_token(header_value)
            .ok_or_else(|| ApiError::Unauthorized(MISSING_TOKEN.to_string()))?;

        if !looks_like_access_token(token) {
            return Err(ApiError::Forbidden(INVALID_TOKEN.to_string()));
        }

        let profile = state
            .db
            .sessions
            .resolve(&hash_token(token), Utc::now())
            .await?
            .ok_or_else(|| ApiError::Forbidden(INVALID_TOKEN.to_string()))?;

        Ok(profile.into())
    }
}

/// A freshly issued bearer token for a user.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

async fn hash_password_blocking(password: String, params: PasswordParams) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, &params))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task: {}", e)))?
        .map_err(ApiError::from)
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task: {}", e)))?
        .map_err(ApiError::from)
}

/// Create a session for `user` and return its bearer token.
pub async fn issue_session(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let token = generate_access_token();
    let expires_at = Utc::now() + state.config.token_ttl();
    state
        .db
        .sessions
        .create(user.id, &hash_token(&token), expires_at)
        .await?;

    Ok(AuthResponse {
        token,
        user: user.profile(),
    })
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Register a new account and sign it in.
pub async fn register(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthResponse, ApiError> {
    validate_credentials(username, password)?;
    let username = username.trim();

    let hash = hash_password_blocking(password.to_string(), state.password_params.clone()).await?;
    let user = state.db.users.create(username, &hash).await?;

    info!(
        subsystem = "auth",
        op = "register",
        user_id = %user.id,
        "User registered"
    );
    issue_session(state, &user).await
}

/// Check credentials and issue a new session.
///
/// Unknown users and wrong passwords fail identically.
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthResponse, ApiError> {
    validate_credentials(username, password)?;

    let Some(user) = state.db.users.find_by_username(username.trim()).await? else {
        debug!(subsystem = "auth", op = "login", "Unknown username");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let valid = verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;
    if !valid {
        debug!(subsystem = "auth", op = "login", user_id = %user.id, "Password mismatch");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!(subsystem = "auth", op = "login", user_id = %user.id, "User logged in");
    issue_session(state, &user).await
}

/// Create the configured bootstrap account if it does not exist yet.
pub async fn ensure_bootstrap_admin(state: &AppState) -> Result<(), ApiError> {
    let Some(admin) = state.config.bootstrap_admin.clone() else {
        return Ok(());
    };

    if state
        .db
        .users
        .find_by_username(&admin.username)
        .await?
        .is_some()
    {
        debug!(subsystem = "auth", username = %admin.username, "Bootstrap user already present");
        return Ok(());
    }

    let hash = hash_password_blocking(admin.password, state.password_params.clone()).await?;
    let user = state.db.users.create(&admin.username, &hash).await?;
    info!(
        subsystem = "auth",
        op = "bootstrap",
        user_id = %user.id,
        username = %user.username,
        "Bootstrap user created"
    );
    Ok(())
}
