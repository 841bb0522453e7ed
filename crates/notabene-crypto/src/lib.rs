//! # notabene-crypto
//!
//! Credential primitives for notabene.
//!
//! - **Password hashing**: Argon2id, stored as PHC strings
//! - **Access tokens**: random opaque bearer tokens, persisted as SHA-256 digests
//!
//! ## Example
//!
//! ```rust
//! use notabene_crypto::{hash_password, verify_password, PasswordParams};
//!
//! let hash = hash_password("hunter2", &PasswordParams::fast()).unwrap();
//! assert!(verify_password("hunter2", &hash).unwrap());
//! ```

pub mod error;
pub mod password;
pub mod token;

pub use error::{CryptoError, CryptoResult};
pub use password::{hash_password, verify_password, PasswordParams};
pub use token::{generate_access_token, hash_token, looks_like_access_token};
