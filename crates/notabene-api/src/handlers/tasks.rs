//! Task HTTP handlers.
//!
//! Request bodies use camelCase keys (`dueDate`, `noteId`, `recurringType`,
//! `recurringInterval`); snake_case spellings are accepted as aliases.
//! Listing and statistics are evaluated against the server's local clock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use notabene_core::{
    CreateTaskRequest, Priority, RecurringType, Task, TaskRepository, TaskStats,
    UpdateTaskRequest,
};

use super::MessageResponse;
use crate::auth::AuthUser;
use crate::extract::ApiJson;
use crate::query_types::{
    optional_datetime, optional_uuid, patch_datetime, patch_uuid, patch_value, task_list_query,
};
use crate::{ApiError, AppState};

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "due_date", deserialize_with = "optional_datetime")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "note_id", deserialize_with = "optional_uuid")]
    pub note_id: Option<Uuid>,
    #[serde(default, alias = "recurring_type")]
    pub recurring_type: Option<String>,
    #[serde(default, alias = "recurring_interval")]
    pub recurring_interval: Option<i32>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub reminder: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "patch_value")]
    pub description: Option<Option<String>>,
    #[serde(default, alias = "due_date", deserialize_with = "patch_datetime")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<String>,
    #[serde(default, alias = "note_id", deserialize_with = "patch_uuid")]
    pub note_id: Option<Option<Uuid>>,
    #[serde(default, alias = "recurring_type")]
    pub recurring_type: Option<String>,
    #[serde(default, alias = "recurring_interval")]
    pub recurring_interval: Option<i32>,
    #[serde(default, deserialize_with = "patch_datetime")]
    pub reminder: Option<Option<DateTime<Utc>>>,
}

/// Blank strings count as "not given".
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_priority(value: Option<String>) -> Result<Option<Priority>, ApiError> {
    non_blank(value)
        .map(|v| v.parse::<Priority>())
        .transpose()
        .map_err(ApiError::from)
}

fn parse_recurring_type(value: Option<String>) -> Result<Option<RecurringType>, ApiError> {
    non_blank(value)
        .map(|v| v.parse::<RecurringType>())
        .transpose()
        .map_err(ApiError::from)
}

impl TryFrom<CreateTaskBody> for CreateTaskRequest {
    type Error = ApiError;

    fn try_from(body: CreateTaskBody) -> Result<Self, Self::Error> {
        let defaults = CreateTaskRequest::default();
        Ok(Self {
            title: body.title,
            description: non_blank(body.description),
            due_date: body.due_date,
            priority: parse_priority(body.priority)?.unwrap_or(defaults.priority),
            note_id: body.note_id,
            recurring_type: parse_recurring_type(body.recurring_type)?
                .unwrap_or(defaults.recurring_type),
            recurring_interval: body
                .recurring_interval
                .unwrap_or(defaults.recurring_interval),
            reminder: body.reminder,
        })
    }
}

impl TryFrom<UpdateTaskBody> for UpdateTaskRequest {
    type Error = ApiError;

    fn try_from(body: UpdateTaskBody) -> Result<Self, Self::Error> {
        Ok(Self {
            title: body.title,
            description: body.description.map(non_blank),
            due_date: body.due_date,
            priority: parse_priority(body.priority)?,
            note_id: body.note_id,
            recurring_type: parse_recurring_type(body.recurring_type)?,
            recurring_interval: body.recurring_interval,
            reminder: body.reminder,
        })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// List the caller's tasks.
///
/// # Query Parameters
/// - `filter`: `all` (default), `today`, `overdue`, `upcoming`, `completed`
/// - `sort`: `due_date` (default), `priority`, `created_at`, `title`
/// - `order`: `asc` (default) or `desc`
///
/// Unknown values fall back to the defaults.
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let query = task_list_query(&params);
    let tasks = state
        .db
        .tasks
        .list(user.user_id, &query, Local::now())
        .await?;
    debug!(
        subsystem = "api",
        op = "list_tasks",
        user_id = %user.user_id,
        filter = ?query.filter,
        result_count = tasks.len(),
        "Listed tasks"
    );
    Ok(Json(tasks))
}

/// Counts of total, completed, due-today, overdue and upcoming tasks.
pub async fn task_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskStats>, ApiError> {
    let stats = state.db.tasks.stats(user.user_id, Local::now()).await?;
    Ok(Json(stats))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.db.tasks.fetch(user.user_id, id).await?;
    Ok(Json(task))
}

/// Tasks linked to one note, due date ascending.
///
/// # Returns
/// - 200 OK with array of tasks
/// - 404 Not Found if the note doesn't exist or belongs to someone else
pub async fn tasks_for_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(note_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.db.tasks.list_for_note(user.user_id, note_id).await?;
    Ok(Json(tasks))
}

/// Create a task.
///
/// # Returns
/// - 201 Created with the task
/// - 400 Bad Request for a blank title, unknown priority or recurrence,
///   an interval below 1, or an unparseable date
/// - 404 Not Found if `noteId` names a note the caller doesn't own
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateTaskBody>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let req = CreateTaskRequest::try_from(body)?;
    req.validate()?;
    let task = state.db.tasks.insert(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Partially update a task. `null` clears nullable fields.
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateTaskBody>,
) -> Result<Json<Task>, ApiError> {
    let req = UpdateTaskRequest::try_from(body)?;
    req.validate()?;
    let task = state.db.tasks.update(user.user_id, id, req).await?;
    Ok(Json(task))
}

/// Flip a task's completed flag.
pub async fn toggle_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.db.tasks.toggle_completed(user.user_id, id).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.tasks.delete(user.user_id, id).await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
