//! notabene-api - HTTP API server for notabene.

use std::net::SocketAddr;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notabene_api::{auth, build_router, AppState, ServerConfig};
use notabene_db::{log_pool_metrics, Database, PoolConfig, SessionRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notabene_api=debug,notabene_db=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notabene-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // no ANSI in files unless asked for
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        db_max_connections = config.db_max_connections,
        db_acquire_timeout_secs = config.db_acquire_timeout.as_secs(),
        token_ttl_hours = config.token_ttl_hours,
        allowed_origins = config.allowed_origins.len(),
        rate_limit = ?config.rate_limit,
        static_dir = ?config.static_dir,
        "Configuration loaded"
    );

    // Database
    let pool_config = PoolConfig::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout);
    let db = Database::connect_with_config(&config.database_url, pool_config).await?;
    db.migrate().await?;
    info!("Database migrations applied");
    log_pool_metrics(db.pool());

    match db.sessions.purge_expired(Utc::now()).await {
        Ok(0) => {}
        Ok(purged) => info!(subsystem = "auth", purged, "Expired sessions removed"),
        Err(e) => warn!(subsystem = "auth", error = %e, "Failed to purge expired sessions"),
    }

    let addr: SocketAddr = config.bind_address().parse()?;
    let state = AppState::new(db, config);
    auth::ensure_bootstrap_admin(&state)
        .await
        .map_err(|e| anyhow::anyhow!("bootstrap user: {:?}", e))?;

    let app = build_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
