//! The cron tick scheduler.
//!
//! One invocation per cadence firing: compute the tick boundary for
//! "now" and advance every active map toward it. Per-map work is
//! serialized by the transaction-scoped advisory lock; across maps the
//! fan-out is bounded by a semaphore. A map that fails (or is locked by
//! an overlapping invocation) is logged and skipped -- sibling maps
//! proceed, and the skipped map's marker keeps it first in line next
//! firing.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use boomtown_core::tick::TickContext;
use boomtown_core::{AppConfig, tick_boundary};
use boomtown_db::{DbError, PostgresPool, advance_map, map_store};

/// Errors that stop a whole scheduler invocation (per-map errors are
/// contained and logged instead).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Listing the active maps failed.
    #[error("could not list maps: {0}")]
    ListMaps(#[from] DbError),

    /// The clock configuration is unusable.
    #[error("clock error: {0}")]
    Clock(#[from] boomtown_core::ClockError),

    /// The pool refused a connection.
    #[error("pool error: {0}")]
    Pool(#[from] sqlx::Error),
}

/// Run one scheduled invocation: advance every active map to the
/// current boundary. Returns how many maps applied the tick.
pub async fn run_invocation(pool: &PostgresPool, config: &AppConfig) -> Result<u32, SchedulerError> {
    let tick = tick_boundary(Utc::now(), config.tick.cadence_minutes)?;

    let maps = {
        let mut conn = pool.pool().acquire().await?;
        map_store::list_active_maps(&mut *conn).await?
    };
    if maps.is_empty() {
        return Ok(0);
    }

    let semaphore = Arc::new(Semaphore::new(config.tick.max_parallel_maps.max(1)));
    let mut joins = Vec::with_capacity(maps.len());

    for map in maps {
        let pool = pool.clone();
        let config = config.clone();
        let semaphore = Arc::clone(&semaphore);
        joins.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return (map.id, false);
            };
            let ctx = TickContext {
                profit_table: &config.profit,
                decay: &config.decay,
                tables: &config.game,
            };
            match advance_map(pool.pool(), map.id.into_inner(), tick, ctx).await {
                Ok(outcome) => (map.id, outcome.applied),
                Err(e) => {
                    // A locked or failed map never aborts its siblings.
                    warn!(map = %map.id, error = %e, "map tick failed, skipping this round");
                    (map.id, false)
                }
            }
        }));
    }

    let mut applied = 0u32;
    for join in joins {
        match join.await {
            Ok((_, true)) => applied = applied.saturating_add(1),
            Ok((_, false)) => {}
            Err(e) => warn!(error = %e, "map tick task panicked"),
        }
    }

    // Opportunistic maintenance alongside the tick.
    if let Ok(mut conn) = pool.pool().acquire().await {
        if let Err(e) = boomtown_db::game_store::maintenance_sweep(&mut *conn, Utc::now()).await {
            warn!(error = %e, "maintenance sweep failed");
        }
    }

    info!(tick, applied, "scheduler invocation complete");
    Ok(applied)
}

/// Run the scheduler loop forever at the configured cadence.
pub async fn run_forever(pool: PostgresPool, config: AppConfig) {
    let cadence_secs = u64::from(config.tick.cadence_minutes.max(1)).saturating_mul(60);
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(cadence_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if let Err(e) = run_invocation(&pool, &config).await {
            warn!(error = %e, "scheduler invocation failed");
        }
    }
}
