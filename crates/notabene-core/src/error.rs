//! Error types for notabene.

use thiserror::Error;

/// Result type alias using notabene's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notabene operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource absent, or owned by another user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate value for a unique field (username, tag name)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credential present but not usable (invalid or expired)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// NotFound for a named entity kind ("Note", "Task", "Tag").
    pub fn not_found(entity: &str) -> Self {
        Error::NotFound(format!("{} not found", entity))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {}", e))
    }
}
