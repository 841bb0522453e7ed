//! # notabene-db
//!
//! PostgreSQL database layer for notabene.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, sessions, notes, tags and tasks
//! - Schema migrations (behind the `migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use notabene_db::{CreateNoteRequest, Database, NoteRepository, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect_with_config("postgres://localhost/notabene", PoolConfig::default()).await?;
//!
//!     let note = db.notes.insert(user_id, CreateNoteRequest {
//!         title: "Groceries".to_string(),
//!         content: Some("milk, eggs".to_string()),
//!         tags: vec!["home".to_string()],
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod notes;
pub mod pool;
pub mod sessions;
pub mod tags;
pub mod tasks;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use notabene_core::*;

pub use notes::PgNoteRepository;
pub use pool::{create_lazy_pool, create_pool, log_pool_metrics, PoolConfig};
pub use sessions::PgSessionRepository;
pub use tags::PgTagRepository;
pub use tasks::PgTaskRepository;
pub use users::PgUserRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Map a sqlx error, turning unique violations into `Conflict(message)`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> Error {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::Database(e),
    }
}

/// Map a sqlx error, turning foreign key violations into `NotFound(entity)`.
///
/// Covers a referenced row that disappeared between an ownership check and
/// the write that points at it.
pub(crate) fn map_foreign_key_violation(e: sqlx::Error, entity: &str) -> Error {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Error::not_found(entity)
        }
        _ => Error::Database(e),
    }
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Credential store.
    pub users: PgUserRepository,
    /// Bearer-token sessions.
    pub sessions: PgSessionRepository,
    /// Note repository for CRUD and filtered listing.
    pub notes: PgNoteRepository,
    /// Per-user tag catalog.
    pub tags: PgTagRepository,
    /// Task repository.
    pub tasks: PgTaskRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            tasks: PgTaskRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given URL with the given pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
