//! Note repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use notabene_core::{
    CreateNoteRequest, Error, Note, NoteListQuery, NoteRepository, NoteSortField, NoteTag,
    Result, SortOrder, UpdateNoteRequest,
};

use crate::escape_like;
use crate::tags::reconcile_tags_tx;

/// Note columns plus the tag projection, ordered by tag name.
const NOTE_SELECT: &str = r#"
    SELECT
        n.id, n.user_id, n.title, n.content, n.created_at, n.updated_at,
        n.is_archived, n.is_favorite,
        COALESCE(
            (SELECT json_agg(
                        json_build_object('id', t.id, 'name', t.name, 'color', t.color)
                        ORDER BY t.name)
             FROM note_tags nt
             JOIN tags t ON t.id = nt.tag_id
             WHERE nt.note_id = n.id),
            '[]'::json
        ) AS tags
    FROM notes n
"#;

fn map_note_row(row: PgRow) -> Note {
    let tags: Json<Vec<NoteTag>> = row.get("tags");
    Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_archived: row.get("is_archived"),
        is_favorite: row.get("is_favorite"),
        tags: tags.0,
    }
}

/// ORDER BY clause for a validated sort field. Ties fall back to id.
fn build_order_clause(sort: NoteSortField, order: SortOrder) -> String {
    let dir = order.as_sql();
    let column = match sort {
        NoteSortField::CreatedAt => "n.created_at",
        NoteSortField::UpdatedAt => "n.updated_at",
        NoteSortField::Title => "LOWER(n.title)",
    };
    format!("{} {}, n.id {}", column, dir, dir)
}

/// Add one EXISTS clause per required tag id.
fn add_tag_filters(query: &mut String, param_idx: &mut usize, tag_count: usize) {
    for _ in 0..tag_count {
        query.push_str(&format!(
            "AND EXISTS (SELECT 1 FROM note_tags nt WHERE nt.note_id = n.id AND nt.tag_id = ${}) ",
            param_idx
        ));
        *param_idx += 1;
    }
}

/// Build the listing SQL. `$1` is the user id, `$2` the archived flag.
fn build_list_query(q: &NoteListQuery) -> String {
    let mut query = format!(
        "{} WHERE n.user_id = $1 AND n.is_archived = $2 ",
        NOTE_SELECT
    );
    let mut param_idx = 3;

    if q.search.is_some() {
        query.push_str(&format!(
            "AND (n.title ILIKE ${0} ESCAPE '\\' OR n.content ILIKE ${0} ESCAPE '\\') ",
            param_idx
        ));
        param_idx += 1;
    }
    add_tag_filters(&mut query, &mut param_idx, q.tag_ids.len());

    query.push_str(&format!("ORDER BY {}", build_order_clause(q.sort, q.order)));
    query
}

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch a note within an existing transaction.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Note> {
        let query = format!("{} WHERE n.id = $1 AND n.user_id = $2", NOTE_SELECT);
        sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .map(map_note_row)
            .ok_or_else(|| Error::not_found("Note"))
    }

    /// Insert a note within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        req: CreateNoteRequest,
    ) -> Result<Uuid> {
        req.validate()?;

        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO notes (id, user_id, title, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(id)
        .bind(user_id)
        .bind(req.title.trim())
        .bind(&req.content)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        reconcile_tags_tx(tx, user_id, id, &req.tags).await?;
        Ok(id)
    }

    /// Apply a partial update within an existing transaction.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<()> {
        req.validate()?;

        let title = req.title.as_deref().map(str::trim);
        let result = sqlx::query(
            "UPDATE notes
             SET title = COALESCE($3, title),
                 content = CASE WHEN $4 THEN $5 ELSE content END,
                 updated_at = $6
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(req.content.is_some())
        .bind(req.content.clone().flatten())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Note"));
        }

        if let Some(tags) = &req.tags {
            reconcile_tags_tx(tx, user_id, id, tags).await?;
        }
        Ok(())
    }

    async fn toggle_flag(&self, user_id: Uuid, id: Uuid, column: &str) -> Result<Note> {
        let query = format!(
            "UPDATE notes SET {0} = NOT {0} WHERE id = $1 AND user_id = $2",
            column
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Note"));
        }
        self.fetch(user_id, id).await
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, user_id: Uuid, q: &NoteListQuery) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = build_list_query(q);

        let mut sql = sqlx::query(&query).bind(user_id).bind(q.archived);
        if let Some(search) = &q.search {
            sql = sql.bind(format!("%{}%", escape_like(search)));
        }
        for tag_id in &q.tag_ids {
            sql = sql.bind(*tag_id);
        }

        let rows = sql.fetch_all(&self.pool).await.map_err(Error::Database)?;
        let notes: Vec<Note> = rows.into_iter().map(map_note_row).collect();

        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            user_id = %user_id,
            tag_count = q.tag_ids.len(),
            has_search = q.search.is_some(),
            sort = q.sort.as_str(),
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Notes listed"
        );
        Ok(notes)
    }

    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Note> {
        let query = format!("{} WHERE n.id = $1 AND n.user_id = $2", NOTE_SELECT);
        sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_note_row)
            .ok_or_else(|| Error::not_found("Note"))
    }

    async fn insert(&self, user_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = self.insert_tx(&mut tx, user_id, req).await?;
        let note = self.fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %note.id,
            tag_count = note.tags.len(),
            "Note created"
        );
        Ok(note)
    }

    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.update_tx(&mut tx, user_id, id, req).await?;
        let note = self.fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Note"));
        }

        info!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = %id,
            "Note deleted"
        );
        Ok(())
    }

    async fn toggle_archived(&self, user_id: Uuid, id: Uuid) -> Result<Note> {
        self.toggle_flag(user_id, id, "is_archived").await
    }

    async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Note> {
        self.toggle_flag(user_id, id, "is_favorite").await
    }
}
