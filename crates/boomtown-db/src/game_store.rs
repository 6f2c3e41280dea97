//! Game companies, buildings, security layers, listings, attacks, and
//! chat.
//!
//! Mutating functions take `&mut PgConnection` so the API layer can run
//! each action as one transaction: lock rows, run the pure handler,
//! write the outcome, commit.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use boomtown_types::{
    Attack, BuildingInstance, BuildingSecurity, ChatMessage, GameCompany, ListingSubject,
    MarketListing, Tile,
};

use crate::error::DbError;
use crate::postgres::enum_to_db;
use crate::rows::{AttackRow, BuildingRow, ChatRow, CompanyRow, ListingRow, SecurityRow};

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Insert a game company.
pub async fn insert_company(
    conn: &mut PgConnection,
    company: &GameCompany,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO game_companies (id, user_id, name, boss_name, cash, offshore, level,
                                      total_actions, ticks_since_action, in_prison, fine,
                                      land_streak, map_id, tier_joined, hero_unlocks, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(company.id.into_inner())
    .bind(company.user_id.into_inner())
    .bind(&company.name)
    .bind(&company.boss_name)
    .bind(company.cash.minor())
    .bind(company.offshore.minor())
    .bind(i16::from(company.level))
    .bind(i32::try_from(company.total_actions).unwrap_or(i32::MAX))
    .bind(i32::try_from(company.ticks_since_action).unwrap_or(i32::MAX))
    .bind(company.in_prison)
    .bind(company.fine.minor())
    .bind(i32::try_from(company.land_streak).unwrap_or(i32::MAX))
    .bind(company.map_id.map(boomtown_types::MapId::into_inner))
    .bind(company.tier_joined.as_ref().map(enum_to_db).transpose()?)
    .bind(serde_json::to_value(&company.hero_unlocks)?)
    .bind(company.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Write back every mutable field of a company.
pub async fn update_company(
    conn: &mut PgConnection,
    company: &GameCompany,
) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE game_companies
          SET name = $2, boss_name = $3, cash = $4, offshore = $5, level = $6,
              total_actions = $7, ticks_since_action = $8, in_prison = $9, fine = $10,
              land_streak = $11, map_id = $12, tier_joined = $13, hero_unlocks = $14
          WHERE id = $1",
    )
    .bind(company.id.into_inner())
    .bind(&company.name)
    .bind(&company.boss_name)
    .bind(company.cash.minor())
    .bind(company.offshore.minor())
    .bind(i16::from(company.level))
    .bind(i32::try_from(company.total_actions).unwrap_or(i32::MAX))
    .bind(i32::try_from(company.ticks_since_action).unwrap_or(i32::MAX))
    .bind(company.in_prison)
    .bind(company.fine.minor())
    .bind(i32::try_from(company.land_streak).unwrap_or(i32::MAX))
    .bind(company.map_id.map(boomtown_types::MapId::into_inner))
    .bind(company.tier_joined.as_ref().map(enum_to_db).transpose()?)
    .bind(serde_json::to_value(&company.hero_unlocks)?)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a company, locking its row for the enclosing transaction.
///
/// Every action-layer operation starts here: the row lock serializes
/// concurrent actions by the same actor.
pub async fn lock_company(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<GameCompany>, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(
        "SELECT * FROM game_companies WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(CompanyRow::into_domain).transpose()
}

/// Fetch a company without locking.
pub async fn find_company(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<GameCompany>, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>("SELECT * FROM game_companies WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(CompanyRow::into_domain).transpose()
}

/// Every company a user owns.
pub async fn user_companies(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<GameCompany>, DbError> {
    let rows = sqlx::query_as::<_, CompanyRow>(
        "SELECT * FROM game_companies WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(CompanyRow::into_domain).collect()
}

/// Every company currently on a map.
pub async fn companies_on_map(
    conn: &mut PgConnection,
    map_id: Uuid,
) -> Result<Vec<GameCompany>, DbError> {
    let rows = sqlx::query_as::<_, CompanyRow>(
        "SELECT * FROM game_companies WHERE map_id = $1 ORDER BY created_at",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(CompanyRow::into_domain).collect()
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// Insert a building instance.
pub async fn insert_building(
    conn: &mut PgConnection,
    building: &BuildingInstance,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO buildings (id, tile_id, map_id, kind, owner_id, variant,
                                 calculated_profit, calculated_value, breakdown, damage,
                                 collapsed, burning, overlay, needs_profit_recalc,
                                 last_tick_applied, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(building.id.into_inner())
    .bind(building.tile_id.into_inner())
    .bind(building.map_id.into_inner())
    .bind(enum_to_db(&building.kind)?)
    .bind(building.owner.into_inner())
    .bind(&building.variant)
    .bind(building.calculated_profit.minor())
    .bind(building.calculated_value.minor())
    .bind(serde_json::to_value(&building.breakdown)?)
    .bind(i16::from(building.damage.value()))
    .bind(building.collapsed)
    .bind(building.burning)
    .bind(building.overlay.as_ref().map(enum_to_db).transpose()?)
    .bind(building.needs_profit_recalc)
    .bind(building.last_tick_applied)
    .bind(building.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Write back every mutable field of a building.
pub async fn update_building(
    conn: &mut PgConnection,
    building: &BuildingInstance,
) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE buildings
          SET owner_id = $2, variant = $3, calculated_profit = $4, calculated_value = $5,
              breakdown = $6, damage = $7, collapsed = $8, burning = $9, overlay = $10,
              needs_profit_recalc = $11, last_tick_applied = $12
          WHERE id = $1",
    )
    .bind(building.id.into_inner())
    .bind(building.owner.into_inner())
    .bind(&building.variant)
    .bind(building.calculated_profit.minor())
    .bind(building.calculated_value.minor())
    .bind(serde_json::to_value(&building.breakdown)?)
    .bind(i16::from(building.damage.value()))
    .bind(building.collapsed)
    .bind(building.burning)
    .bind(building.overlay.as_ref().map(enum_to_db).transpose()?)
    .bind(building.needs_profit_recalc)
    .bind(building.last_tick_applied)
    .execute(conn)
    .await?;
    Ok(())
}

/// Delete a building instance.
pub async fn delete_building(conn: &mut PgConnection, id: Uuid) -> Result<(), DbError> {
    sqlx::query("DELETE FROM buildings WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete every building a company owns on a map (location leave).
pub async fn delete_company_buildings(
    conn: &mut PgConnection,
    map_id: Uuid,
    company_id: Uuid,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM buildings WHERE map_id = $1 AND owner_id = $2")
        .bind(map_id)
        .bind(company_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// The building standing on a tile, locked for the transaction.
///
/// Collapsed buildings are returned too: they still block the tile
/// until repaired or demolished.
pub async fn lock_building_on_tile(
    conn: &mut PgConnection,
    tile_id: Uuid,
) -> Result<Option<BuildingInstance>, DbError> {
    let row = sqlx::query_as::<_, BuildingRow>(
        "SELECT * FROM buildings WHERE tile_id = $1 FOR UPDATE",
    )
    .bind(tile_id)
    .fetch_optional(conn)
    .await?;
    row.map(BuildingRow::into_domain).transpose()
}

/// A building by id, locked for the transaction. Attacks take the same
/// row lock actions do before applying damage.
pub async fn lock_building(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<BuildingInstance>, DbError> {
    let row = sqlx::query_as::<_, BuildingRow>("SELECT * FROM buildings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(BuildingRow::into_domain).transpose()
}

/// All buildings on a map.
pub async fn map_buildings(
    conn: &mut PgConnection,
    map_id: Uuid,
) -> Result<Vec<BuildingInstance>, DbError> {
    let rows = sqlx::query_as::<_, BuildingRow>(
        "SELECT * FROM buildings WHERE map_id = $1 ORDER BY created_at",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(BuildingRow::into_domain).collect()
}

/// Count live instances of a kind on a map (the license check, run
/// inside the build transaction's lock scope).
pub async fn count_kind_on_map(
    conn: &mut PgConnection,
    map_id: Uuid,
    kind_key: &str,
) -> Result<u32, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM buildings WHERE map_id = $1 AND kind = $2 AND NOT collapsed",
    )
    .bind(map_id)
    .bind(kind_key)
    .fetch_one(conn)
    .await?;
    Ok(u32::try_from(count).unwrap_or(0))
}

/// Dirty-mark every building standing on the given coordinates.
pub async fn mark_dirty_at(
    conn: &mut PgConnection,
    map_id: Uuid,
    coords: &[(u32, u32)],
) -> Result<u64, DbError> {
    let mut total = 0u64;
    for &(x, y) in coords {
        let result = sqlx::query(
            r"UPDATE buildings b SET needs_profit_recalc = TRUE
              FROM tiles t
              WHERE b.tile_id = t.id AND t.map_id = $1 AND t.x = $2 AND t.y = $3",
        )
        .bind(map_id)
        .bind(i32::try_from(x).unwrap_or(0))
        .bind(i32::try_from(y).unwrap_or(0))
        .execute(&mut *conn)
        .await?;
        total = total.saturating_add(result.rows_affected());
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// The security layer on a building, if any.
pub async fn building_security(
    conn: &mut PgConnection,
    building_id: Uuid,
) -> Result<Option<BuildingSecurity>, DbError> {
    let row = sqlx::query_as::<_, SecurityRow>(
        "SELECT * FROM building_security WHERE building_id = $1",
    )
    .bind(building_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(SecurityRow::into_domain))
}

/// Attach a security layer.
pub async fn insert_security(
    conn: &mut PgConnection,
    building_id: Uuid,
    security: &BuildingSecurity,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO building_security (building_id, level, upkeep, resistance_pct)
          VALUES ($1, $2, $3, $4)",
    )
    .bind(building_id)
    .bind(i16::from(security.level))
    .bind(security.upkeep.minor())
    .bind(i16::from(security.resistance_pct))
    .execute(conn)
    .await?;
    Ok(())
}

/// Detach a building's security layer.
pub async fn delete_security(conn: &mut PgConnection, building_id: Uuid) -> Result<(), DbError> {
    sqlx::query("DELETE FROM building_security WHERE building_id = $1")
        .bind(building_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Every security layer on a map, keyed by building.
pub async fn map_securities(
    conn: &mut PgConnection,
    map_id: Uuid,
) -> Result<Vec<(Uuid, BuildingSecurity)>, DbError> {
    let rows = sqlx::query_as::<_, SecurityRow>(
        r"SELECT s.* FROM building_security s
          JOIN buildings b ON b.id = s.building_id
          WHERE b.map_id = $1",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.building_id, r.into_domain()))
        .collect())
}

// ---------------------------------------------------------------------------
// Attacks
// ---------------------------------------------------------------------------

/// Record an attack, tagged with its tick for cooldown queries.
pub async fn insert_attack(
    conn: &mut PgConnection,
    attack: &Attack,
    tick: i64,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO attacks (id, attacker_id, target_building_id, trick, message,
                               moderation_status, detected, damage_dealt, tick, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(attack.id.into_inner())
    .bind(attack.attacker.into_inner())
    .bind(attack.target_building.into_inner())
    .bind(enum_to_db(&attack.trick)?)
    .bind(&attack.message)
    .bind(enum_to_db(&attack.moderation_status)?)
    .bind(attack.detected)
    .bind(i16::from(attack.damage_dealt))
    .bind(tick)
    .bind(attack.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// The tick of an attacker's most recent use of a trick (cooldowns).
pub async fn last_trick_tick(
    conn: &mut PgConnection,
    attacker_id: Uuid,
    trick_key: &str,
) -> Result<Option<i64>, DbError> {
    let tick: Option<i64> = sqlx::query_scalar(
        "SELECT max(tick) FROM attacks WHERE attacker_id = $1 AND trick = $2",
    )
    .bind(attacker_id)
    .bind(trick_key)
    .fetch_one(conn)
    .await?;
    Ok(tick)
}

/// Attacks awaiting a moderation decision, oldest first.
pub async fn pending_attacks(conn: &mut PgConnection, limit: i64) -> Result<Vec<Attack>, DbError> {
    let rows = sqlx::query_as::<_, AttackRow>(
        r"SELECT * FROM attacks WHERE moderation_status = 'pending'
          ORDER BY created_at LIMIT $1",
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(AttackRow::into_domain).collect()
}

/// Settle a pending attack message (admin review).
pub async fn set_attack_moderation(
    conn: &mut PgConnection,
    attack_id: Uuid,
    status_key: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE attacks SET moderation_status = $2 WHERE id = $1")
        .bind(attack_id)
        .bind(status_key)
        .execute(conn)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Market listings
// ---------------------------------------------------------------------------

/// Insert a listing.
pub async fn insert_listing(
    conn: &mut PgConnection,
    listing: &MarketListing,
) -> Result<(), DbError> {
    let (subject_type, subject_id) = subject_parts(listing.subject);
    sqlx::query(
        r"INSERT INTO market_listings (id, map_id, subject_type, subject_id, asking_price,
                                       seller_id, status, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(listing.id.into_inner())
    .bind(listing.map_id.into_inner())
    .bind(subject_type)
    .bind(subject_id)
    .bind(listing.asking_price.minor())
    .bind(listing.seller.into_inner())
    .bind(enum_to_db(&listing.status)?)
    .bind(listing.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Write back a listing's status.
pub async fn update_listing_status(
    conn: &mut PgConnection,
    listing: &MarketListing,
) -> Result<(), DbError> {
    sqlx::query("UPDATE market_listings SET status = $2 WHERE id = $1")
        .bind(listing.id.into_inner())
        .bind(enum_to_db(&listing.status)?)
        .execute(conn)
        .await?;
    Ok(())
}

/// A listing by id, locked for the transaction.
pub async fn lock_listing(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<MarketListing>, DbError> {
    let row =
        sqlx::query_as::<_, ListingRow>("SELECT * FROM market_listings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    row.map(ListingRow::into_domain).transpose()
}

/// Whether the subject already has an active listing.
pub async fn subject_listed(conn: &mut PgConnection, subject_id: Uuid) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM market_listings WHERE subject_id = $1 AND status = 'active'",
    )
    .bind(subject_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Active listings on a map, newest first.
pub async fn active_listings(
    conn: &mut PgConnection,
    map_id: Uuid,
) -> Result<Vec<MarketListing>, DbError> {
    let rows = sqlx::query_as::<_, ListingRow>(
        r"SELECT * FROM market_listings WHERE map_id = $1 AND status = 'active'
          ORDER BY created_at DESC",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(ListingRow::into_domain).collect()
}

/// The `(subject_type, subject_id)` columns for a listing subject.
fn subject_parts(subject: ListingSubject) -> (&'static str, Uuid) {
    match subject {
        ListingSubject::Tile(id) => ("tile", id.into_inner()),
        ListingSubject::Building(id) => ("building", id.into_inner()),
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Insert a chat or hero message.
pub async fn insert_chat(conn: &mut PgConnection, message: &ChatMessage) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO chat_messages (id, map_id, company_id, kind, body, moderation_status,
                                     created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(message.id.into_inner())
    .bind(message.map_id.into_inner())
    .bind(message.company.into_inner())
    .bind(enum_to_db(&message.kind)?)
    .bind(&message.body)
    .bind(enum_to_db(&message.moderation_status)?)
    .bind(message.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Approved messages on a map, newest first.
pub async fn visible_chat(
    conn: &mut PgConnection,
    map_id: Uuid,
    limit: i64,
) -> Result<Vec<ChatMessage>, DbError> {
    let rows = sqlx::query_as::<_, ChatRow>(
        r"SELECT * FROM chat_messages
          WHERE map_id = $1 AND moderation_status = 'approved'
          ORDER BY created_at DESC LIMIT $2",
    )
    .bind(map_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(ChatRow::into_domain).collect()
}

// ---------------------------------------------------------------------------
// Helpers shared with the action executor
// ---------------------------------------------------------------------------

/// Resolve a tile row by id (already-known target).
pub async fn find_tile(conn: &mut PgConnection, id: Uuid) -> Result<Option<Tile>, DbError> {
    let row = sqlx::query_as::<_, crate::rows::TileRow>("SELECT * FROM tiles WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(crate::rows::TileRow::into_domain).transpose()
}

/// Sweep obsolete sessions and stale magic links in one maintenance
/// call; invoked opportunistically by the scheduler.
pub async fn maintenance_sweep(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<(), DbError> {
    let swept = crate::user_store::sweep_expired_sessions(conn, now).await?;
    if swept > 0 {
        tracing::debug!(swept, "expired sessions removed");
    }
    sqlx::query(
        r"UPDATE users SET magic_token = NULL, magic_code = NULL, magic_expires_at = NULL
          WHERE magic_expires_at IS NOT NULL AND magic_expires_at <= $1",
    )
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
