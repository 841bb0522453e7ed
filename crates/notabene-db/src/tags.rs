//! Tag repository implementation.
//!
//! Tags are created on first use by a note and are unique per user by exact
//! (case-sensitive) name.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use notabene_core::{Error, NoteTag, Result, Tag, TagRepository, UpdateTagRequest};

use crate::map_unique_violation;

const TAG_COLUMNS_WITH_COUNT: &str = r#"
    t.id, t.user_id, t.name, t.color, t.created_at,
    COUNT(nt.note_id) AS note_count
"#;

/// Trim names, drop blanks and collapse duplicates.
///
/// The result is sorted. Tag rows are always locked in this order, so two
/// writers creating the same new tags queue behind each other instead of
/// deadlocking.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn map_tag_row(row: PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: row.get("created_at"),
        note_count: row.get("note_count"),
    }
}

fn map_note_tag_row(row: PgRow) -> NoteTag {
    NoteTag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
    }
}

/// Resolve `names` to tag rows, creating missing ones.
///
/// One batched insert in name order, then one read of every requested row.
/// Rows that already existed, or that a concurrent writer just created, are
/// picked up by the read.
pub(crate) async fn resolve_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    names: &[String],
) -> Result<Vec<NoteTag>> {
    let names = normalize_tag_names(names);
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = names.iter().map(|_| Uuid::now_v7()).collect();

    let created = sqlx::query(
        "INSERT INTO tags (id, user_id, name, created_at)
         SELECT incoming.id, $1, incoming.name, $4
         FROM unnest($2::uuid[], $3::text[]) AS incoming(id, name)
         ORDER BY incoming.name
         ON CONFLICT (user_id, name) DO NOTHING",
    )
    .bind(user_id)
    .bind(&ids)
    .bind(&names)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    let rows = sqlx::query(
        "SELECT id, name, color FROM tags
         WHERE user_id = $1 AND name = ANY($2)
         ORDER BY name",
    )
    .bind(user_id)
    .bind(&names)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;

    debug!(
        subsystem = "database",
        component = "tags",
        op = "resolve",
        requested = names.len(),
        created = created.rows_affected(),
        "Tags resolved"
    );
    Ok(rows.into_iter().map(map_note_tag_row).collect())
}

/// Make `names` the complete tag set of `note_id`.
///
/// The caller owns the transaction and must have checked note ownership.
pub(crate) async fn reconcile_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    note_id: Uuid,
    names: &[String],
) -> Result<Vec<NoteTag>> {
    let mut tags = resolve_tags_tx(tx, user_id, names).await?;

    sqlx::query("DELETE FROM note_tags WHERE note_id = $1 AND user_id = $2")
        .bind(note_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    for tag in &tags {
        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id, user_id) VALUES ($1, $2, $3)
             ON CONFLICT (note_id, tag_id) DO NOTHING",
        )
        .bind(note_id)
        .bind(tag.id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    }

    tags.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        subsystem = "database",
        component = "tags",
        op = "reconcile",
        note_id = %note_id,
        result_count = tags.len(),
        "Note tags reconciled"
    );
    Ok(tags)
}

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        let query = format!(
            "SELECT {}
             FROM tags t
             LEFT JOIN note_tags nt ON nt.tag_id = t.id
             WHERE t.user_id = $1
             GROUP BY t.id
             ORDER BY t.name",
            TAG_COLUMNS_WITH_COUNT
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_tag_row).collect())
    }

    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<Tag> {
        let query = format!(
            "SELECT {}
             FROM tags t
             LEFT JOIN note_tags nt ON nt.tag_id = t.id
             WHERE t.id = $1 AND t.user_id = $2
             GROUP BY t.id",
            TAG_COLUMNS_WITH_COUNT
        );
        sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_tag_row)
            .ok_or_else(|| Error::not_found("Tag"))
    }

    async fn for_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<NoteTag>> {
        let owned: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE id = $1 AND user_id = $2)")
                .bind(note_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        if !owned {
            return Err(Error::not_found("Note"));
        }

        let rows = sqlx::query(
            "SELECT t.id, t.name, t.color
             FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = $1 AND nt.user_id = $2
             ORDER BY t.name",
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_note_tag_row).collect())
    }

    async fn reconcile_for_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        names: &[String],
    ) -> Result<Vec<NoteTag>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let touched = sqlx::query("UPDATE notes SET updated_at = $3 WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if touched.rows_affected() == 0 {
            return Err(Error::not_found("Note"));
        }

        let tags = reconcile_tags_tx(&mut tx, user_id, note_id, names).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(tags)
    }

    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateTagRequest) -> Result<Tag> {
        req.validate()?;

        let name = req.name.as_deref().map(str::trim);
        let result = sqlx::query(
            "UPDATE tags
             SET name = COALESCE($3, name),
                 color = CASE WHEN $4 THEN $5 ELSE color END
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .bind(req.color.is_some())
        .bind(req.color.flatten())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Tag name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Tag"));
        }
        self.fetch(user_id, id).await
    }

    async fn set_color(&self, user_id: Uuid, id: Uuid, color: Option<String>) -> Result<Tag> {
        let result = sqlx::query("UPDATE tags SET color = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .bind(color)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Tag"));
        }
        self.fetch(user_id, id).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        // note_tags rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("Tag"));
        }

        debug!(
            subsystem = "database",
            component = "tags",
            op = "delete",
            tag_id = %id,
            "Tag deleted"
        );
        Ok(())
    }
}
