//! Note HTTP handlers.
//!
//! Every handler is scoped to the authenticated user; another user's note
//! id answers 404 exactly like a missing one.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use notabene_core::{
    CreateNoteRequest, Note, NoteRepository, NoteTag, TagRepository, UpdateNoteRequest,
};

use super::MessageResponse;
use crate::auth::AuthUser;
use crate::extract::ApiJson;
use crate::query_types::{note_list_query, patch_value};
use crate::{ApiError, AppState};

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Request body for creating a note.
#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    #[serde(default)]
    pub title: String,
    pub content: Option<String>,
    /// Tag names; unknown names create new tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreateNoteBody> for CreateNoteRequest {
    fn from(body: CreateNoteBody) -> Self {
        Self {
            title: body.title,
            content: body.content,
            tags: body.tags,
        }
    }
}

/// Request body for updating a note. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateNoteBody {
    pub title: Option<String>,
    /// `null` clears the content
    #[serde(default, deserialize_with = "patch_value")]
    pub content: Option<Option<String>>,
    /// Replaces the note's whole tag set
    pub tags: Option<Vec<String>>,
}

impl From<UpdateNoteBody> for UpdateNoteRequest {
    fn from(body: UpdateNoteBody) -> Self {
        Self {
            title: body.title,
            content: body.content,
            tags: body.tags,
        }
    }
}

/// Request body for replacing a note's tag set.
#[derive(Debug, Deserialize)]
pub struct NoteTagsBody {
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// List the caller's notes.
///
/// # Query Parameters
/// - `search`: case-insensitive substring of title or content
/// - `tags`: tag ids; a note must carry every one of them
/// - `sort`: `updated_at` (default), `created_at` or `title`
/// - `order`: `desc` (default) or `asc`
/// - `archived`: `true`/`1` lists archived notes instead of active ones
///
/// # Returns
/// - 200 OK with array of notes
/// - 400 Bad Request if a tag id is not a UUID
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let query = note_list_query(&params)?;
    let notes = state.db.notes.list(user.user_id, &query).await?;
    debug!(
        subsystem = "api",
        op = "list_notes",
        user_id = %user.user_id,
        result_count = notes.len(),
        "Listed notes"
    );
    Ok(Json(notes))
}

/// Get a single note with its tags.
///
/// # Returns
/// - 200 OK with the note
/// - 404 Not Found if the note doesn't exist or belongs to someone else
pub async fn get_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    let note = state.db.notes.fetch(user.user_id, id).await?;
    Ok(Json(note))
}

/// Create a note.
///
/// # Request Body
/// - `title`: required, non-blank
/// - `content`: optional
/// - `tags`: optional array of tag names
///
/// # Returns
/// - 201 Created with the note
/// - 400 Bad Request if the title is blank
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateNoteBody>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let req = CreateNoteRequest::from(body);
    req.validate()?;
    let note = state.db.notes.insert(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Partially update a note. Supplying `tags` replaces the tag set.
///
/// # Returns
/// - 200 OK with the updated note
/// - 400 Bad Request if the title is blank
/// - 404 Not Found if the note doesn't exist
pub async fn update_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateNoteBody>,
) -> Result<Json<Note>, ApiError> {
    let req = UpdateNoteRequest::from(body);
    req.validate()?;
    let note = state.db.notes.update(user.user_id, id, req).await?;
    Ok(Json(note))
}

/// Delete a note. Linked tasks survive with their note link cleared.
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.notes.delete(user.user_id, id).await?;
    Ok(Json(MessageResponse::new("Note deleted successfully")))
}

/// Flip a note's archived flag.
pub async fn toggle_archive(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    let note = state.db.notes.toggle_archived(user.user_id, id).await?;
    Ok(Json(note))
}

/// Flip a note's favorite flag.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    let note = state.db.notes.toggle_favorite(user.user_id, id).await?;
    Ok(Json(note))
}

/// List the tags attached to a note, ordered by name.
///
/// # Returns
/// - 200 OK with array of `{id, name, color}`
/// - 404 Not Found if the note doesn't exist or belongs to someone else
pub async fn get_note_tags(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<NoteTag>>, ApiError> {
    let tags = state.db.tags.for_note(user.user_id, id).await?;
    Ok(Json(tags))
}

/// Replace a note's tag set by name, creating unknown tags.
///
/// # Request Body
/// - `tags`: array of tag names; an empty array detaches every tag
///
/// # Returns
/// - 200 OK with the note's new tags
/// - 404 Not Found if the note doesn't exist
pub async fn set_note_tags(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<NoteTagsBody>,
) -> Result<Json<Vec<NoteTag>>, ApiError> {
    let tags = state
        .db
        .tags
        .reconcile_for_note(user.user_id, id, &body.tags)
        .await?;
    debug!(
        subsystem = "api",
        op = "set_note_tags",
        note_id = %id,
        tag_count = tags.len(),
        "Replaced note tags"
    );
    Ok(Json(tags))
}
