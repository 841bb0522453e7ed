//! Task repository implementation.
//!
//! Listing and statistics load the user's tasks in creation order and hand
//! them to the bucketing and ordering logic in `notabene_core::tasks`, so
//! the day boundary is evaluated in the server's local time zone.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use notabene_core::{
    CreateTaskRequest, Error, Priority, RecurringType, Result, Task, TaskListQuery,
    TaskRepository, TaskStats, UpdateTaskRequest,
};

use crate::map_foreign_key_violation;

const TASK_SELECT: &str = r#"
    SELECT
        t.id, t.user_id, t.title, t.description, t.completed, t.due_date,
        t.priority, t.note_id, t.recurring_type, t.recurring_interval,
        t.reminder, t.created_at, t.updated_at,
        n.title AS note_title
    FROM tasks t
    LEFT JOIN notes n ON n.id = t.note_id
"#;

fn map_task_row(row: PgRow) -> Task {
    let priority: Option<String> = row.get("priority");
    let recurring_type: Option<String> = row.get("recurring_type");
    Task {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        completed: row.get("completed"),
        due_date: row.get("due_date"),
        priority: Priority::from_stored(priority.as_deref()),
        note_id: row.get("note_id"),
        recurring_type: RecurringType::from_stored(recurring_type.as_deref()),
        recurring_interval: row.get("recurring_interval"),
        reminder: row.get("reminder"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        note_title: row.get("note_title"),
    }
}

/// PostgreSQL implementation of TaskRepository.
pub struct PgTaskRepository {
    pool: Pool<Postgres>,
}

impl PgTaskRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All of a user's tasks in creation order.
    async fn fetch_all_for_user(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let query = format!(
            "{} WHERE t.user_id = $1 ORDER BY t.created_at, t.id",
            TASK_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_task_row).collect())
    }

    /// NotFound("Note not found") unless `note_id` belongs to `user_id`.
    async fn ensure_note_owned(&self, user_id: Uuid, note_id: Uuid) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE id = $1 AND user_id = $2)")
                .bind(note_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        if !exists {
            return Err(Error::not_found("Note"));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list(
        &self,
        user_id: Uuid,
        query: &TaskListQuery,
        now: DateTime<Local>,
    ) -> Result<Vec<Task>> {
        let start = Instant::now();
        let tasks = query.apply(self.fetch_all_for_user(user_id).await?, &now);

        debug!(
            subsystem = "database",
            component = "tasks",
            op = "list",
            user_id = %user_id,
            filter = ?query.filter,
            sort = ?query.sort,
            result_count = tasks.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tasks listed"
        );
        Ok(tasks)
    }

    async fn list_for_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<Task>> {
        self.ensure_note_owned(user_id, note_id).await?;

        let query = format!(
            "{} WHERE t.user_id = $1 AND t.note_id = $2
             ORDER BY t.due_date ASC NULLS LAST, t.created_at, t.id",
            TASK_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(note_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_task_row).collect())
    }

    async fn stats(&self, user_id: Uuid, now: DateTime<Local>) -> Result<TaskStats> {
        let tasks = self.fetch_all_for_user(user_id).await?;
        Ok(TaskStats::tally(&tasks, &now))
    }

    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Task> {
        let query = format!("{} WHERE t.id = $1 AND t.user_id = $2", TASK_SELECT);
        sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_task_row)
            .ok_or_else(|| Error::not_found("Task"))
    }

    async fn insert(&self, user_id: Uuid, req: CreateTaskRequest) -> Result<Task> {
        req.validate()?;
        if let Some(note_id) = req.note_id {
            self.ensure_note_owned(user_id, note_id).await?;
        }

        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO tasks (
                id, user_id, title, description, completed, due_date, priority,
                note_id, recurring_type, recurring_interval, reminder,
                created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7, $8, $9, $10, $11, $11)",
        )
        .bind(id)
        .bind(user_id)
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(req.due_date)
        .bind(req.priority.as_str())
        .bind(req.note_id)
        .bind(req.recurring_type.as_str())
        .bind(req.recurring_interval)
        .bind(req.reminder)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_foreign_key_violation(e, "Note"))?;

        info!(
            subsystem = "database",
            component = "tasks",
            op = "insert",
            task_id = %id,
            has_due_date = req.due_date.is_some(),
            "Task created"
        );
        self.fetch(user_id, id).await
    }

    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateTaskRequest) -> Result<Task> {
        req.validate()?;
        if let Some(Some(note_id)) = req.note_id {
            self.ensure_note_owned(user_id, note_id).await?;
        }

        let result = sqlx::query(
            "UPDATE tasks
             SET title = COALESCE($3, title),
                 description = CASE WHEN $4 THEN $5 ELSE description END,
                 due_date = CASE WHEN $6 THEN $7 ELSE due_date END,
                 priority = COALESCE($8, priority),
                 note_id = CASE WHEN $9 THEN $10 ELSE note_id END,
                 recurring_type = COALESCE($11, recurring_type),
                 recurring_interval = COALESCE($12, recurring_interval),
                 reminder = CASE WHEN $13 THEN $14 ELSE reminder END,
                 updated_at = $15
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.description.is_some())
        .bind(req.description.clone().flatten())
        .bind(req.due_date.is_some())
        .bind(req.due_date.flatten())
        .bind(req.priority.map(Priority::as_str))
        .bind(req.note_id.is_some())
        .bind(req.note_id.flatten())
        .bind(req.recurring_type.map(RecurringType::as_str))
        .bind(req.recurring_interval)
        .bind(req.reminder.is_some())
        .bind(req.reminder.flatten())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_foreign_key_violation(e, "Note"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Task"));
        }
        self.fetch(user_id, id).await
    }

    async fn toggle_completed(&self, user_id: Uuid, id: Uuid) -> Result<Task> {
        let result = sqlx::query(
            "UPDATE tasks SET completed = NOT completed, updated_at = $3
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Task"));
        }
        self.fetch(user_id, id).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Task"));
        }
        Ok(())
    }
}
