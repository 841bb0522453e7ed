//! Route table and middleware stack.

use std::path::Path;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers::{auth, health, notes, tags, tasks};
use crate::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// RATE LIMITING
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!(subsystem = "api", path = %request.uri().path(), "Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

// =============================================================================
// ROUTER
// =============================================================================

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health_check))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // Notes
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/api/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/api/notes/:id/archive", patch(notes::toggle_archive))
        .route("/api/notes/:id/favorite", patch(notes::toggle_favorite))
        .route(
            "/api/notes/:id/tags",
            get(notes::get_note_tags).put(notes::set_note_tags),
        )
        // Tags
        .route("/api/tags", get(tags::list_tags))
        .route(
            "/api/tags/:id",
            axum::routing::put(tags::update_tag).delete(tags::delete_tag),
        )
        .route("/api/tags/:id/color", patch(tags::update_tag_color))
        // Tasks
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/stats", get(tasks::task_stats))
        .route("/api/tasks/by-note/:note_id", get(tasks::tasks_for_note))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/:id/toggle", patch(tasks::toggle_task))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.allowed_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Serve a built client with `index.html` as the fallback for client-side
/// routes. Returns `None` when the directory is missing.
fn static_service(dir: &Path) -> Option<ServeDir<ServeFile>> {
    if !dir.is_dir() {
        warn!(
            subsystem = "api",
            static_dir = %dir.display(),
            "Static directory not found, static serving disabled"
        );
        return None;
    }
    info!(subsystem = "api", static_dir = %dir.display(), "Serving static client");
    Some(ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))))
}

/// Build the application router with its full middleware stack.
pub fn build_router(state: AppState) -> Router {
    let mut app = api_routes();

    if let Some(service) = state.config.static_dir.as_deref().and_then(static_service) {
        app = app.fallback_service(service);
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        rate_limit_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
    .layer(cors_layer(&state))
    .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
    .with_state(state)
}
