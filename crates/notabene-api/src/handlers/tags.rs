//! Tag HTTP handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use notabene_core::{Tag, TagRepository, UpdateTagRequest};

use super::MessageResponse;
use crate::auth::AuthUser;
use crate::extract::ApiJson;
use crate::query_types::patch_value;
use crate::{ApiError, AppState};

/// Request body for `PUT /api/tags/:id`.
#[derive(Debug, Deserialize)]
pub struct UpdateTagBody {
    pub name: Option<String>,
    /// `null` clears the color
    #[serde(default, deserialize_with = "patch_value")]
    pub color: Option<Option<String>>,
}

/// Request body for `PATCH /api/tags/:id/color`.
#[derive(Debug, Deserialize)]
pub struct TagColorBody {
    #[serde(default)]
    pub color: Option<String>,
}

fn normalize_color(color: Option<String>) -> Option<String> {
    color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// List the caller's tags by name, each with its note count.
pub async fn list_tags(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.db.tags.list(user.user_id).await?;
    Ok(Json(tags))
}

/// Rename and/or recolor a tag.
///
/// # Returns
/// - 200 OK with the updated tag
/// - 400 Bad Request if neither field is given or the name is blank
/// - 404 Not Found if the tag doesn't exist
/// - 409 Conflict if another tag already has the new name
pub async fn update_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateTagBody>,
) -> Result<Json<Tag>, ApiError> {
    let req = UpdateTagRequest {
        name: body.name.map(|n| n.trim().to_string()),
        color: body.color.map(normalize_color),
    };
    req.validate()?;
    let tag = state.db.tags.update(user.user_id, id, req).await?;
    Ok(Json(tag))
}

/// Set or clear a tag's color.
pub async fn update_tag_color(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<TagColorBody>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state
        .db
        .tags
        .set_color(user.user_id, id, normalize_color(body.color))
        .await?;
    Ok(Json(tag))
}

/// Delete a tag; notes carrying it simply lose it.
pub async fn delete_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.tags.delete(user.user_id, id).await?;
    Ok(Json(MessageResponse::new("Tag deleted successfully")))
}
