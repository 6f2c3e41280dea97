//! Boomtown service binary.
//!
//! Wires together the configuration, the database pool, the API server,
//! and the scheduled tick.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `boomtown-config.yaml` (env overrides
//!    apply for `DATABASE_URL`, `SESSION_SECRET`, `MODERATION_URL`,
//!    `MAIL_API_URL`)
//! 3. Connect the pool and run migrations
//! 4. Bootstrap the master admin if no users exist
//! 5. Spawn the tick scheduler at the configured cadence
//! 6. Serve the API until the process stops

mod bootstrap;
mod scheduler;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use boomtown_api::AppState;
use boomtown_core::AppConfig;
use boomtown_db::{PostgresConfig, PostgresPool};

/// The default configuration file path, relative to the working
/// directory.
const CONFIG_PATH: &str = "boomtown-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails; the API serve
/// loop itself only returns on listener failure.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("boomtown-server starting");

    // 2. Configuration.
    let config_path = Path::new(CONFIG_PATH);
    let config = if config_path.exists() {
        AppConfig::from_file(config_path)?
    } else {
        info!("no config file found, using defaults with env overrides");
        AppConfig::parse("{}")?
    };
    info!(
        cadence_minutes = config.tick.cadence_minutes,
        max_parallel_maps = config.tick.max_parallel_maps,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Database.
    let pg_config = PostgresConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;

    // 4. Bootstrap.
    bootstrap::ensure_master_admin(&pool, &config).await?;

    // 5. Scheduler.
    let scheduler_pool = pool.clone();
    let scheduler_config = config.clone();
    tokio::spawn(async move {
        scheduler::run_forever(scheduler_pool, scheduler_config).await;
    });
    info!("tick scheduler started");

    // 6. API.
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(pool, config)?;
    boomtown_api::serve(state, &host, port).await?;

    Ok(())
}
