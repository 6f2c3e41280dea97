//! Transactions, company statistics, and leaderboards.

use sqlx::PgConnection;
use uuid::Uuid;

use boomtown_types::{CompanyStatistics, TransactionRecord};

use crate::error::DbError;
use crate::postgres::enum_to_db;
use crate::rows::TransactionRow;

/// Append one transaction record.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    record: &TransactionRecord,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO transactions (id, kind, company_id, map_id, tile_id, building_id,
                                    amount, details, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id.into_inner())
    .bind(enum_to_db(&record.kind)?)
    .bind(record.company.into_inner())
    .bind(record.map_id.map(boomtown_types::MapId::into_inner))
    .bind(record.tile_id.map(boomtown_types::TileId::into_inner))
    .bind(record.building_id.map(boomtown_types::BuildingId::into_inner))
    .bind(record.amount.minor())
    .bind(&record.details)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Append a batch of transaction records (tick earnings).
pub async fn insert_transactions(
    conn: &mut PgConnection,
    records: &[TransactionRecord],
) -> Result<(), DbError> {
    for record in records {
        insert_transaction(conn, record).await?;
    }
    if !records.is_empty() {
        tracing::debug!(count = records.len(), "Inserted transactions");
    }
    Ok(())
}

/// A company's recent transactions, newest first.
pub async fn company_transactions(
    conn: &mut PgConnection,
    company_id: Uuid,
    limit: i64,
) -> Result<Vec<TransactionRecord>, DbError> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        r"SELECT * FROM transactions WHERE company_id = $1
          ORDER BY created_at DESC LIMIT $2",
    )
    .bind(company_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(TransactionRow::into_domain).collect()
}

/// Upsert the per-(company, map) statistics row for a tick.
pub async fn upsert_statistics(
    conn: &mut PgConnection,
    stats: &CompanyStatistics,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO company_statistics (company_id, map_id, tick, net_worth, cash, buildings,
                                          tiles, land_permille, income, damage_total, updated_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
          ON CONFLICT (company_id, map_id) DO UPDATE
          SET tick = EXCLUDED.tick, net_worth = EXCLUDED.net_worth, cash = EXCLUDED.cash,
              buildings = EXCLUDED.buildings, tiles = EXCLUDED.tiles,
              land_permille = EXCLUDED.land_permille, income = EXCLUDED.income,
              damage_total = EXCLUDED.damage_total, updated_at = EXCLUDED.updated_at",
    )
    .bind(stats.company.into_inner())
    .bind(stats.map_id.into_inner())
    .bind(stats.tick)
    .bind(stats.net_worth.minor())
    .bind(stats.cash.minor())
    .bind(i32::try_from(stats.buildings).unwrap_or(i32::MAX))
    .bind(i32::try_from(stats.tiles).unwrap_or(i32::MAX))
    .bind(i16::try_from(stats.land_permille).unwrap_or(i16::MAX))
    .bind(stats.income.minor())
    .bind(i32::try_from(stats.damage_total).unwrap_or(i32::MAX))
    .bind(stats.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// One ranking line: company name and its sort figure.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankingRow {
    /// The ranked company.
    pub company_id: Uuid,
    /// Display name.
    pub name: String,
    /// The figure ranked on (net worth or donated total).
    pub figure: i64,
}

/// The net-worth ranking for a map.
pub async fn map_rankings(
    conn: &mut PgConnection,
    map_id: Uuid,
    limit: i64,
) -> Result<Vec<RankingRow>, DbError> {
    let rows = sqlx::query_as::<_, RankingRow>(
        r"SELECT s.company_id AS company_id, c.name AS name, s.net_worth AS figure
          FROM company_statistics s
          JOIN game_companies c ON c.id = s.company_id
          WHERE s.map_id = $1
          ORDER BY s.net_worth DESC
          LIMIT $2",
    )
    .bind(map_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// The global temple-donation leaderboard (summed `donation` records).
pub async fn donation_leaderboard(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<RankingRow>, DbError> {
    let rows = sqlx::query_as::<_, RankingRow>(
        r"SELECT t.company_id AS company_id, c.name AS name, -sum(t.amount) AS figure
          FROM transactions t
          JOIN game_companies c ON c.id = t.company_id
          WHERE t.kind = 'donation'
          GROUP BY t.company_id, c.name
          ORDER BY figure DESC
          LIMIT $1",
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// The tick of a company's most recent takeover (cooldowns).
///
/// Takeover records carry their tick boundary in the details blob; a
/// company with no takeovers on record has no cooldown.
pub async fn last_takeover_tick(
    conn: &mut PgConnection,
    company_id: Uuid,
) -> Result<Option<i64>, DbError> {
    let tick: Option<i64> = sqlx::query_scalar(
        r"SELECT max((details->>'tick')::bigint) FROM transactions
          WHERE company_id = $1 AND kind = 'takeover'",
    )
    .bind(company_id)
    .fetch_one(conn)
    .await?;
    Ok(tick)
}

/// Whether a company holds the unlock token for a tier, as recorded by a
/// hero-out transaction. The company row caches the unlock list; this is
/// the authoritative audit-side check a join falls back to when the
/// cache disagrees.
pub async fn has_unlock_record(
    conn: &mut PgConnection,
    company_id: Uuid,
    tier_key: &str,
) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        r"SELECT count(*) FROM transactions
          WHERE company_id = $1 AND kind = 'hero_out' AND details->>'unlocks' = $2",
    )
    .bind(company_id)
    .bind(tier_key)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}
