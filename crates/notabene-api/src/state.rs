//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use notabene_crypto::PasswordParams;
use notabene_db::Database;

use crate::config::{RateLimitConfig, ServerConfig};

pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    /// Argon2 cost used for new password hashes.
    pub password_params: PasswordParams,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(build_rate_limiter);
        Self {
            db,
            config: Arc::new(config),
            password_params: PasswordParams::default(),
            rate_limiter,
        }
    }

    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password_params = params;
        self
    }
}

fn build_rate_limiter(config: &RateLimitConfig) -> Arc<GlobalRateLimiter> {
    let burst = NonZeroU32::new(config.requests).unwrap_or(NonZeroU32::MIN);
    // Full bucket refills once per period
    let quota = Quota::with_period(config.period / burst.get())
        .unwrap_or_else(|| Quota::per_minute(burst))
        .allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}
