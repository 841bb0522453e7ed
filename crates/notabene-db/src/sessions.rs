//! Session repository: bearer tokens stored as SHA-256 digests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use notabene_core::{Error, Result, Session, SessionRepository, UserProfile};

/// PostgreSQL implementation of SessionRepository.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, created_at, expires_at",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(token_hash)
        .bind(Utc::now())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "sessions",
            op = "create",
            user_id = %user_id,
            session_id = %session.id,
            "Session created"
        );
        Ok(session)
    }

    async fn resolve(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT u.id, u.username
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = $1 AND s.expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| UserProfile {
            id: r.get("id"),
            username: r.get("username"),
        }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(
                subsystem = "database",
                component = "sessions",
                op = "purge_expired",
                result_count = removed,
                "Expired sessions removed"
            );
        }
        Ok(removed)
    }
}
