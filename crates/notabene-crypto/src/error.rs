//! Error types for credential operations.

use thiserror::Error;

/// Credential hashing and token errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored hash is not a valid PHC string.
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    /// Invalid Argon2 parameters.
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Password is empty or otherwise unusable.
    #[error("Invalid password: {0}")]
    InvalidPassword(String),
}

/// Result type for credential operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
