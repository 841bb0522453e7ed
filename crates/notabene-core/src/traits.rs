//! Core traits for notabene abstractions.
//!
//! These traits define the repository interfaces that storage backends
//! implement. Every method takes the owning user's id; a row owned by
//! someone else is indistinguishable from a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::notes_query::NoteListQuery;
use crate::tasks::TaskListQuery;

// =============================================================================
// USER & SESSION REPOSITORY TRAITS
// =============================================================================

/// Credential store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. Fails with Conflict if the username is taken.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User>;

    /// Look up a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Storage for bearer-token sessions. Tokens arrive already hashed.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Record a new session for `user_id`.
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    /// Resolve a token hash to its user, if the session exists and has not
    /// expired at `now`.
    async fn resolve(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserProfile>>;

    /// Remove sessions that expired before `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Request for creating a new note.
#[derive(Debug, Clone, Default)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: Option<String>,
    /// Tag names; trimmed, blanks skipped, created on first use.
    pub tags: Vec<String>,
}

impl CreateNoteRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        Ok(())
    }
}

/// Partial note update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    /// `Some(None)` clears the content.
    pub content: Option<Option<String>>,
    /// Replaces the whole tag set when present.
    pub tags: Option<Vec<String>>,
}

impl UpdateNoteRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Title cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Filtered, sorted listing of one user's notes with their tags.
    async fn list(&self, user_id: Uuid, query: &NoteListQuery) -> Result<Vec<Note>>;

    /// Fetch a single note with tags.
    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Note>;

    /// Insert a note and reconcile its tags.
    async fn insert(&self, user_id: Uuid, req: CreateNoteRequest) -> Result<Note>;

    /// Apply a partial update; `updated_at` always advances.
    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Delete a note. Associations cascade; linked tasks lose their note_id.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    /// Flip `is_archived`.
    async fn toggle_archived(&self, user_id: Uuid, id: Uuid) -> Result<Note>;

    /// Flip `is_favorite`.
    async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Note>;
}

// =============================================================================
// TAG REPOSITORY TRAITS
// =============================================================================

/// Request for updating a tag.
#[derive(Debug, Clone, Default)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<String>>,
}

impl UpdateTagRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_none() && self.color.is_none() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Repository for tag operations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All of the user's tags, ordered by name, with computed note counts.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>>;

    /// Fetch one tag with its note count.
    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Tag>;

    /// Tags attached to a note, ordered by name.
    async fn for_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<NoteTag>>;

    /// Resolve names to tags (creating missing ones) and make them the
    /// note's complete tag set.
    async fn reconcile_for_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        names: &[String],
    ) -> Result<Vec<NoteTag>>;

    /// Rename and/or recolor a tag.
    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateTagRequest) -> Result<Tag>;

    /// Set or clear a tag's color.
    async fn set_color(&self, user_id: Uuid, id: Uuid, color: Option<String>) -> Result<Tag>;

    /// Delete a tag and detach it from every note.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// TASK REPOSITORY TRAITS
// =============================================================================

/// Request for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub note_id: Option<Uuid>,
    pub recurring_type: RecurringType,
    pub recurring_interval: i32,
    pub reminder: Option<DateTime<Utc>>,
}

impl Default for CreateTaskRequest {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
            note_id: None,
            recurring_type: RecurringType::None,
            recurring_interval: 1,
            reminder: None,
        }
    }
}

fn validate_interval(interval: i32) -> Result<()> {
    if interval < 1 {
        return Err(Error::InvalidInput(
            "Recurring interval must be at least 1".to_string(),
        ));
    }
    Ok(())
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        validate_interval(self.recurring_interval)
    }
}

/// Partial task update. Outer `None` leaves a field unchanged; inner `None`
/// clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub note_id: Option<Option<Uuid>>,
    pub recurring_type: Option<RecurringType>,
    pub recurring_interval: Option<i32>,
    pub reminder: Option<Option<DateTime<Utc>>>,
}

impl UpdateTaskRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.note_id.is_none()
            && self.recurring_type.is_none()
            && self.recurring_interval.is_none()
            && self.reminder.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Title cannot be empty".to_string()));
            }
        }
        if let Some(interval) = self.recurring_interval {
            validate_interval(interval)?;
        }
        Ok(())
    }
}

/// Repository for task operations.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Filtered, sorted listing evaluated against `now`.
    async fn list(
        &self,
        user_id: Uuid,
        query: &TaskListQuery,
        now: DateTime<Local>,
    ) -> Result<Vec<Task>>;

    /// Tasks linked to one of the user's notes, due date ascending.
    async fn list_for_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<Task>>;

    /// Aggregate counts evaluated against `now`.
    async fn stats(&self, user_id: Uuid, now: DateTime<Local>) -> Result<TaskStats>;

    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Task>;

    async fn insert(&self, user_id: Uuid, req: CreateTaskRequest) -> Result<Task>;

    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateTaskRequest) -> Result<Task>;

    /// Flip `completed`. Due date and recurrence fields are left alone.
    async fn toggle_completed(&self, user_id: Uuid, id: Uuid) -> Result<Task>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_note_requires_title() {
        let req = CreateNoteRequest {
            title: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_update_note_allows_missing_title() {
        let req = UpdateNoteRequest {
            content: Some(None),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_tag_requires_a_field() {
        let err = UpdateTagRequest::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No fields to update");
    }

    #[test]
    fn test_update_tag_clearing_color_is_a_change() {
        let req = UpdateTagRequest {
            name: None,
            color: Some(None),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_task_validation() {
        let ok = CreateTaskRequest {
            title: "Pay rent".to_string(),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let untitled = CreateTaskRequest::default();
        assert!(untitled.validate().is_err());

        let zero_interval = CreateTaskRequest {
            title: "x".to_string(),
            recurring_interval: 0,
            ..Default::default()
        };
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn test_update_task_empty_is_invalid() {
        let req = UpdateTaskRequest::default();
        assert!(req.is_empty());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_task_clearing_due_date_is_not_empty() {
        let req = UpdateTaskRequest {
            due_date: Some(None),
            ..Default::default()
        };
        assert!(!req.is_empty());
        assert!(req.validate().is_ok());
    }
}
