//! notabene-api library.
//!
//! HTTP layer for notabene: configuration, authentication, handlers and the
//! router. The `notabene-api` binary wires these together.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod query_types;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
