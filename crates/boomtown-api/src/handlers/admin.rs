//! `/admin/*` handlers -- master-admin operations: map creation, the
//! moderation review queue, the audit trail, and hard deletions.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use boomtown_db::{game_store, map_store, user_store};
use boomtown_ledger::audit_event;
use boomtown_types::{
    AuditEventKind, GameError, GameMap, HeroThresholds, MapId, MapTier, ModerationStatus, Money,
};
use boomtown_world::generate_tiles;

use crate::error::{ApiError, created, ok};
use crate::guard::{authenticate, client_ip, require_admin, require_master};
use crate::state::AppState;

/// Map creation body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMap {
    /// Country label.
    #[validate(length(min = 2, max = 60))]
    pub country: String,
    /// The map's tier.
    pub tier: MapTier,
    /// Grid width, `1..=100`.
    #[validate(range(min = 1, max = 100))]
    pub width: u32,
    /// Grid height, `1..=100`.
    #[validate(range(min = 1, max = 100))]
    pub height: u32,
    /// Terrain seed; defaults to a fresh one.
    pub seed: Option<u64>,
    /// Hero-out net-worth threshold.
    pub hero_net_worth: i64,
    /// Hero-out cash threshold.
    pub hero_cash: i64,
    /// Hero-out land share, in per-mille.
    pub hero_land_permille: u16,
    /// Weekday (0 = Monday) on which detection is skipped.
    pub police_strike_day: Option<u8>,
}

/// `POST /admin/maps`
///
/// Creates the map row plus its full tile set (chunked batch insert).
/// Dimensions are immutable afterwards.
pub async fn create_map(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateMap>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    let map = GameMap {
        id: MapId::new(),
        country: body.country,
        tier: body.tier,
        width: body.width,
        height: body.height,
        hero_thresholds: HeroThresholds {
            net_worth: Money::from_minor(body.hero_net_worth),
            cash: Money::from_minor(body.hero_cash),
            land_permille: body.hero_land_permille,
        },
        police_strike_day: body.police_strike_day.unwrap_or(6).min(6),
        active: true,
        created_at: Utc::now(),
    };
    let seed = body.seed.unwrap_or_else(|| {
        // Derive a seed from the map id so regeneration is reproducible.
        let bytes = map.id.into_inner().as_u128();
        u64::try_from(bytes & u128::from(u64::MAX)).unwrap_or(7)
    });
    let tiles = generate_tiles(map.id, map.width, map.height, seed)
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    map_store::insert_map(&mut *tx, &map).await?;
    map_store::insert_tiles(&mut *tx, &tiles).await?;
    tx.commit().await.map_err(db_err)?;

    Ok(created(json!({
        "id": map.id,
        "tiles": tiles.len(),
        "tier": map.tier,
    })))
}

/// `GET /admin/moderation/attacks` -- messages awaiting review.
pub async fn pending_attacks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let attacks = game_store::pending_attacks(&mut *conn, 100).await?;
    Ok(ok(attacks))
}

/// Review decision body.
#[derive(Debug, Deserialize)]
pub struct ReviewDecision {
    /// `true` approves the message, `false` rejects it.
    pub approve: bool,
}

/// `POST /admin/moderation/attacks/{id}`
pub async fn review_attack(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(attack_id): Path<Uuid>,
    Json(body): Json<ReviewDecision>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let status = if body.approve {
        ModerationStatus::Approved
    } else {
        ModerationStatus::Rejected
    };
    let status_key = boomtown_db::enum_to_db(&status)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    game_store::set_attack_moderation(&mut *tx, attack_id, &status_key).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "id": attack_id, "status": status })))
}

/// `GET /admin/audit` -- the denormalized security trail.
pub async fn audit_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let tenant_filter = if ctx.is_master() {
        None
    } else {
        ctx.user.tenant_id.map(boomtown_types::TenantId::into_inner)
    };
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let entries = user_store::list_audit_display(&mut *conn, tenant_filter, 200).await?;
    Ok(ok(entries))
}

/// `POST /admin/users/{id}/purge` -- hard delete (master only; ordinary
/// removal is the soft archive).
pub async fn purge_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::purge_user(&mut *tx, user_id).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::UserArchived,
            Some(ctx.user.id),
            None,
            Some(client_ip(&headers)),
            format!("user {user_id} purged"),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "purged": true })))
}

/// Name-override body.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameCompany {
    /// The new display name.
    #[validate(length(min = 2, max = 60))]
    pub name: String,
    /// The new boss name.
    #[validate(length(min = 2, max = 60))]
    pub boss_name: Option<String>,
}

/// `POST /admin/companies/{id}/rename`
///
/// The master-admin override: game-company names are otherwise
/// immutable. The override still passes the moderation gate.
pub async fn rename_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<RenameCompany>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    state
        .moderation
        .moderate_name(boomtown_types::ModerationCategory::CompanyName, &body.name)
        .await?;
    if let Some(boss) = &body.boss_name {
        state
            .moderation
            .moderate_name(boomtown_types::ModerationCategory::BossName, boss)
            .await?;
    }

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut company = game_store::lock_company(&mut *tx, company_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such company")))?;
    company.name = body.name;
    if let Some(boss) = body.boss_name {
        company.boss_name = boss;
    }
    game_store::update_company(&mut *tx, &company).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "id": company.id, "name": company.name })))
}

/// Map a raw sqlx error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}
