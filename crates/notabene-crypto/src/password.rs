//! Password hashing using Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...`), so the
//! parameters used at registration travel with the hash and verification
//! keeps working after the defaults change.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};

/// Argon2id parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory in KiB (default: 19456 = 19 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 2).
    pub iterations: u32,
    /// Parallelism degree (default: 1).
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordParams {
    /// Minimal-cost parameters for tests and local development.
    pub fn fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str, params: &PasswordParams) -> CryptoResult<String> {
    if password.is_empty() {
        return Err(CryptoError::InvalidPassword(
            "Password cannot be empty".to_string(),
        ));
    }

    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    salt_bytes.zeroize();

    let hash = params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; errors only when the stored hash is
/// unparseable.
pub fn verify_password(password: &str, stored_hash: &str) -> CryptoResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CryptoError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
