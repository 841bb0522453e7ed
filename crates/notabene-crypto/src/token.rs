//! Opaque bearer tokens.
//!
//! Tokens are random alphanumeric strings with a recognizable prefix. Only
//! their SHA-256 digest is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix for session access tokens.
pub const ACCESS_TOKEN_PREFIX: &str = "nb_at_";

/// Number of random characters after the prefix.
pub const ACCESS_TOKEN_SECRET_LEN: usize = 48;

/// Generate a random alphanumeric secret of the given length.
pub fn generate_secret(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a new access token.
pub fn generate_access_token() -> String {
    format!(
        "{}{}",
        ACCESS_TOKEN_PREFIX,
        generate_secret(ACCESS_TOKEN_SECRET_LEN)
    )
}

/// Hash a token using SHA-256 (hex encoded).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap syntactic check before touching storage.
pub fn looks_like_access_token(token: &str) -> bool {
    token
        .strip_prefix(ACCESS_TOKEN_PREFIX)
        .map(|rest| {
            rest.len() == ACCESS_TOKEN_SECRET_LEN && rest.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or(false)
}
