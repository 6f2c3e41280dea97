//! Per-map tick orchestration: load, advance, persist -- one
//! transaction per map under its advisory lock.
//!
//! # Architecture
//!
//! ```text
//! scheduler fire
//!   |
//!   +-- for each active map (bounded fan-out):
//!         BEGIN
//!           pg_try_advisory_xact_lock(map)   -- serializes per map
//!           load MapTickState                -- tick-start snapshot
//!           run_map_tick()                   -- pure passes 1..7
//!           write buildings/companies/
//!                 transactions/statistics
//!           update map_ticks marker
//!         COMMIT                              -- or ROLLBACK on error
//! ```
//!
//! A mid-map failure rolls the whole map back; sibling maps are
//! unaffected. A crash between maps leaves the unadvanced ones for the
//! next invocation, which resumes from the first unadvanced map by
//! construction (their markers are still behind).

use std::collections::BTreeMap;

use sqlx::PgPool;
use uuid::Uuid;

use boomtown_core::tick::{MapTickState, TickContext, TickOutcome, run_map_tick};

use crate::error::DbError;
use crate::{game_store, map_store, transaction_store};

/// Errors that can occur while advancing a map.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// A data-layer operation failed.
    #[error("data layer error: {0}")]
    Db(#[from] DbError),

    /// The pure tick computation failed.
    #[error("tick error: {0}")]
    Tick(#[from] boomtown_core::tick::TickError),

    /// The map row disappeared between listing and locking.
    #[error("map {0} not found")]
    MapGone(Uuid),
}

/// Advance one map to `tick` in a single transaction.
///
/// Returns the outcome (with `applied = false` when the boundary was
/// already processed). The per-map advisory lock makes overlapping
/// invocations for the same map impossible; the loser gets
/// [`DbError::MapLocked`] and should simply skip the map this round.
///
/// # Errors
///
/// Any error rolls the map's transaction back in full.
pub async fn advance_map(
    pool: &PgPool,
    map_id: Uuid,
    tick: i64,
    ctx: TickContext<'_>,
) -> Result<TickOutcome, PersistError> {
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    map_store::try_lock_map(&mut *tx, map_id).await?;

    let map = map_store::find_map(&mut *tx, map_id)
        .await?
        .ok_or(PersistError::MapGone(map_id))?;
    let last_tick_applied = map_store::map_last_tick(&mut *tx, map_id).await?;
    let tiles = map_store::map_tiles(&mut *tx, map_id).await?;
    let buildings = game_store::map_buildings(&mut *tx, map_id).await?;
    let securities: BTreeMap<_, _> = game_store::map_securities(&mut *tx, map_id)
        .await?
        .into_iter()
        .map(|(id, s)| (boomtown_types::BuildingId::from(id), s))
        .collect();
    let companies = game_store::companies_on_map(&mut *tx, map_id)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let state = MapTickState {
        map,
        last_tick_applied,
        tiles,
        buildings,
        securities,
        companies,
    };

    let outcome = run_map_tick(state, tick, ctx)?;

    if outcome.applied {
        for building in &outcome.buildings {
            game_store::update_building(&mut *tx, building).await?;
        }
        for company in &outcome.companies {
            game_store::update_company(&mut *tx, company).await?;
        }
        transaction_store::insert_transactions(&mut *tx, &outcome.transactions).await?;
        for stats in &outcome.statistics {
            transaction_store::upsert_statistics(&mut *tx, stats).await?;
        }
        map_store::set_map_last_tick(&mut *tx, map_id, outcome.map_last_tick).await?;
    }

    tx.commit().await.map_err(DbError::from)?;
    Ok(outcome)
}
