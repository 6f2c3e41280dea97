//! `/game/*` handlers: maps, companies, the action layer, attacks,
//! progression, market, casino, chat.
//!
//! Every action runs as one database transaction: lock the acting
//! company row (and the target building row where applicable), build the
//! inputs, invoke the pure handler from `boomtown-game`, persist the
//! outcome, commit. A failed precondition rolls back with nothing
//! applied.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use boomtown_core::{tick_boundary, weekday_utc};
use boomtown_db::{game_store, map_store, transaction_store};
use boomtown_game::actions::handlers as actions;
use boomtown_game::casino::{BlackjackGame, BlackjackPhase, RouletteBet, hand_value, spin_roulette};
use boomtown_game::{progression, social, tricks};
use boomtown_ledger::{TransactionBuilder, credit, debit};
use boomtown_types::{
    BuildingKind, ChatKind, GameCompany, GameCompanyId, GameError, GameMap, ListingSubject,
    ModerationCategory, Money, TransactionKind, TrickKind,
};

use crate::error::{ApiError, created, ok};
use crate::guard::{AuthContext, authenticate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// `GET /game/maps` -- the active map roster.
pub async fn list_maps(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let maps = map_store::list_active_maps(&mut *conn).await?;
    let listed: Vec<_> = maps
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "country": m.country,
                "tier": m.tier,
                "width": m.width,
                "height": m.height,
            })
        })
        .collect();
    Ok(ok(listed))
}

/// `GET /game/maps/{id}` -- tiles and buildings for the board view.
pub async fn map_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(map_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let map = map_store::find_map(&mut *conn, map_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such map")))?;
    let tiles = map_store::map_tiles(&mut *conn, map_id).await?;
    let buildings = game_store::map_buildings(&mut *conn, map_id).await?;
    Ok(ok(json!({
        "map": map,
        "tiles": tiles,
        "buildings": buildings,
    })))
}

/// `GET /game/maps/{id}/listings`
pub async fn listings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(map_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let listings = game_store::active_listings(&mut *conn, map_id).await?;
    Ok(ok(listings))
}

/// `GET /game/maps/{id}/chat`
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(map_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let messages = game_store::visible_chat(&mut *conn, map_id, 100).await?;
    Ok(ok(messages))
}

/// `GET /game/maps/{id}/rankings`
pub async fn rankings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(map_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let rows = transaction_store::map_rankings(&mut *conn, map_id, 50).await?;
    let listed: Vec<_> = rows
        .iter()
        .map(|r| json!({ "company_id": r.company_id, "name": r.name, "net_worth": r.figure }))
        .collect();
    Ok(ok(listed))
}

/// `GET /game/donations` -- the global temple leaderboard.
pub async fn donations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let _ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let rows = transaction_store::donation_leaderboard(&mut *conn, 50).await?;
    let listed: Vec<_> = rows
        .iter()
        .map(|r| json!({ "company_id": r.company_id, "name": r.name, "donated": r.figure }))
        .collect();
    Ok(ok(listed))
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Game-company creation body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompany {
    /// Display name (moderated; immutable afterwards).
    #[validate(length(min = 2, max = 60))]
    pub name: String,
    /// Boss name (moderated; immutable afterwards).
    #[validate(length(min = 2, max = 60))]
    pub boss_name: String,
}

/// `POST /game/companies`
///
/// A user owns at most three game companies; both names block on a
/// definitive moderation verdict.
pub async fn create_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateCompany>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;

    state
        .moderation
        .moderate_name(ModerationCategory::CompanyName, &body.name)
        .await?;
    state
        .moderation
        .moderate_name(ModerationCategory::BossName, &body.boss_name)
        .await?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let existing = game_store::user_companies(&mut *tx, ctx.user.id.into_inner()).await?;
    if existing.len() >= 3 {
        return Err(GameError::precondition("you already own three companies").into());
    }

    let company = GameCompany {
        id: GameCompanyId::new(),
        user_id: ctx.user.id,
        name: body.name,
        boss_name: body.boss_name,
        cash: Money::ZERO,
        offshore: Money::ZERO,
        level: 1,
        total_actions: 0,
        ticks_since_action: 0,
        in_prison: false,
        fine: Money::ZERO,
        land_streak: 0,
        map_id: None,
        tier_joined: None,
        hero_unlocks: Vec::new(),
        created_at: Utc::now(),
    };
    game_store::insert_company(&mut *tx, &company).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(created(json!({ "id": company.id, "name": company.name })))
}

/// `GET /game/companies/{id}`
pub async fn get_company(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let company = game_store::find_company(&mut *conn, company_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such company")))?;
    if company.user_id != ctx.user.id && !ctx.is_master() {
        return Err(GameError::forbidden("not your company").into());
    }
    Ok(ok(company))
}

/// Map-join body.
#[derive(Debug, Deserialize)]
pub struct JoinMap {
    /// The map to join.
    pub map_id: Uuid,
}

/// `POST /game/companies/{id}/join`
pub async fn join(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<JoinMap>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = map_store::find_map(&mut *tx, body.map_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such map")))?;

    // The company row caches its unlock tokens; the hero-out transaction
    // is the authoritative record, so consult it before refusing a join.
    if !company.has_unlocked(map.tier) {
        let tier_key = boomtown_db::enum_to_db(&map.tier)?;
        if transaction_store::has_unlock_record(&mut *tx, company.id.into_inner(), &tier_key)
            .await?
        {
            company.hero_unlocks.push(map.tier);
        }
    }

    let outcome = progression::join_location(company, &map, &state.config.game.economy)?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;

    // Joining initializes the statistics row; ticks take over from here.
    let stats = boomtown_types::CompanyStatistics {
        company: outcome.company.id,
        map_id: map.id,
        tick: 0,
        net_worth: outcome.company.cash,
        cash: outcome.company.cash,
        buildings: 0,
        tiles: 0,
        land_permille: 0,
        income: Money::ZERO,
        damage_total: 0,
        updated_at: Utc::now(),
    };
    transaction_store::upsert_statistics(&mut *tx, &stats).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "map_id": map.id,
        "cash": outcome.company.cash,
        "tier": map.tier,
    })))
}

/// `POST /game/companies/{id}/leave`
///
/// Forfeits all cash and buildings on the current map.
pub async fn leave(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    let tiles = map_store::map_tiles(&mut *tx, map.id.into_inner()).await?;
    let owned_tiles: Vec<_> = tiles
        .iter()
        .filter(|t| t.owner == Some(company.id))
        .map(|t| t.id)
        .collect();
    let buildings = game_store::map_buildings(&mut *tx, map.id.into_inner()).await?;
    let owned_buildings: Vec<_> = buildings
        .iter()
        .filter(|b| b.owner == company.id)
        .map(|b| b.id)
        .collect();

    let outcome = progression::leave_location(company, &map, owned_tiles, owned_buildings)?;
    game_store::delete_company_buildings(
        &mut *tx,
        map.id.into_inner(),
        outcome.company.id.into_inner(),
    )
    .await?;
    map_store::release_company_tiles(
        &mut *tx,
        map.id.into_inner(),
        outcome.company.id.into_inner(),
    )
    .await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "left": true })))
}

// ---------------------------------------------------------------------------
// Land & construction
// ---------------------------------------------------------------------------

/// Coordinates body shared by tile-addressed actions.
#[derive(Debug, Deserialize)]
pub struct TileRef {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

/// `POST /game/companies/{id}/buy-land`
pub async fn buy_land(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<TileRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let unbuilt =
        map_store::count_unbuilt_tiles(&mut *tx, map.id.into_inner(), company.id.into_inner())
            .await?;

    let outcome = actions::buy_land(company, &map, tile, unbuilt, &state.config.game)?;
    map_store::update_tile_owner(&mut *tx, &outcome.tile).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "tile": outcome.tile,
        "cash": outcome.company.cash,
        "level_up": outcome.level_up,
    })))
}

/// Construction body.
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// What to build.
    pub kind: BuildingKind,
    /// Specialty variant, for kinds that declare variants.
    pub variant: Option<String>,
}

/// `POST /game/companies/{id}/build`
pub async fn build(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuildRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let existing = game_store::lock_building_on_tile(&mut *tx, tile.id.into_inner()).await?;

    // License count under the same lock scope as the insert.
    let kind_key = boomtown_db::enum_to_db(&body.kind)?;
    let licensed_count =
        game_store::count_kind_on_map(&mut *tx, map.id.into_inner(), &kind_key).await?;

    let tiles = map_store::map_tiles(&mut *tx, map.id.into_inner()).await?;
    let buildings = game_store::map_buildings(&mut *tx, map.id.into_inner()).await?;
    let grid = boomtown_world::TileGrid::from_entities(map.width, map.height, &tiles, &buildings)
        .map_err(|e| ApiError::from(GameError::internal(e.to_string())))?;

    let outcome = actions::build(
        company,
        actions::BuildParams {
            map: &map,
            tile: &tile,
            existing: existing.as_ref(),
            kind: body.kind,
            variant: body.variant,
            licensed_count,
            grid: &grid,
            profit_table: &state.config.profit,
        },
        &state.config.game,
    )?;

    if let Some(marker) = outcome.replaced_marker {
        game_store::delete_building(&mut *tx, marker.into_inner()).await?;
    }
    game_store::insert_building(&mut *tx, &outcome.building).await?;
    game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(created(json!({
        "building": outcome.building,
        "cash": outcome.company.cash,
        "level_up": outcome.level_up,
    })))
}

/// `POST /game/companies/{id}/demolish`
pub async fn demolish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<TileRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let building = game_store::lock_building_on_tile(&mut *tx, tile.id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no building on that tile")))?;

    let outcome = actions::demolish(company, &map, &tile, building, &state.config.game)?;
    game_store::delete_building(&mut *tx, outcome.removed.into_inner()).await?;
    if let Some(marker) = &outcome.marker {
        game_store::insert_building(&mut *tx, marker).await?;
    }
    game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "demolished": true, "level_up": outcome.level_up })))
}

/// `POST /game/companies/{id}/sell-building`
pub async fn sell_building(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<TileRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let building = game_store::lock_building_on_tile(&mut *tx, tile.id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no building on that tile")))?;
    let listed = game_store::subject_listed(&mut *tx, building.id.into_inner()).await?;

    let outcome =
        actions::sell_building_to_state(company, &map, &tile, building, listed, &state.config.game)?;
    game_store::delete_building(&mut *tx, outcome.removed.into_inner()).await?;
    game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "cash": outcome.company.cash, "level_up": outcome.level_up })))
}

/// `POST /game/companies/{id}/sell-land`
pub async fn sell_land(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<TileRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let standing = game_store::lock_building_on_tile(&mut *tx, tile.id.into_inner()).await?;
    let has_building = standing
        .as_ref()
        .is_some_and(|b| !boomtown_world::is_marker(b.kind));
    let listed = game_store::subject_listed(&mut *tx, tile.id.into_inner()).await?;

    let outcome =
        actions::sell_land_to_state(company, &map, tile, has_building, listed, &state.config.game)?;
    map_store::update_tile_owner(&mut *tx, &outcome.tile).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "cash": outcome.company.cash, "level_up": outcome.level_up })))
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Listing body.
#[derive(Debug, Deserialize)]
pub struct ListProperty {
    /// Column of the subject tile.
    pub x: u32,
    /// Row of the subject tile.
    pub y: u32,
    /// `true` to list the building on the tile, `false` for bare land.
    pub building: bool,
    /// The asking price.
    pub price: i64,
}

/// `POST /game/companies/{id}/list`
pub async fn list_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<ListProperty>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let tile = map_store::lock_tile(&mut *tx, map.id.into_inner(), body.x, body.y)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tile")))?;
    let standing = game_store::lock_building_on_tile(&mut *tx, tile.id.into_inner()).await?;

    let subject = if body.building {
        let building = standing
            .as_ref()
            .filter(|b| !boomtown_world::is_marker(b.kind))
            .ok_or_else(|| ApiError::from(GameError::not_found("no building on that tile")))?;
        ListingSubject::Building(building.id)
    } else {
        ListingSubject::Tile(tile.id)
    };
    let subject_id = match subject {
        ListingSubject::Tile(id) => id.into_inner(),
        ListingSubject::Building(id) => id.into_inner(),
    };
    let already = game_store::subject_listed(&mut *tx, subject_id).await?;

    let listing = actions::list_for_sale(
        &company,
        &map,
        subject,
        &tile,
        standing.as_ref(),
        Money::from_minor(body.price),
        already,
    )?;
    game_store::insert_listing(&mut *tx, &listing).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(created(listing))
}

/// Listing-reference body.
#[derive(Debug, Deserialize)]
pub struct ListingRef {
    /// The listing in question.
    pub listing_id: Uuid,
}

/// `POST /game/companies/{id}/cancel-listing`
pub async fn cancel_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<ListingRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let listing = game_store::lock_listing(&mut *tx, body.listing_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such listing")))?;

    let cancelled = actions::cancel_listing(&company, listing)?;
    game_store::update_listing_status(&mut *tx, &cancelled).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "cancelled": true })))
}

/// Purchase body: the offered price must match the asking price.
#[derive(Debug, Deserialize)]
pub struct BuyListing {
    /// The listing to buy.
    pub listing_id: Uuid,
    /// The price the buyer saw; must equal the current asking price.
    pub price: i64,
}

/// `POST /game/companies/{id}/buy-listing`
pub async fn buy_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuyListing>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let buyer = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let listing = game_store::lock_listing(&mut *tx, body.listing_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such listing")))?;
    let seller = game_store::lock_company(&mut *tx, listing.seller.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("seller no longer exists")))?;
    let map = map_store::find_map(&mut *tx, listing.map_id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("map no longer exists")))?;

    let (tile, building) = match listing.subject {
        ListingSubject::Tile(tile_id) => {
            let tile = game_store::find_tile(&mut *tx, tile_id.into_inner())
                .await?
                .ok_or_else(|| ApiError::from(GameError::not_found("listed tile is gone")))?;
            (tile, None)
        }
        ListingSubject::Building(building_id) => {
            let building = game_store::lock_building(&mut *tx, building_id.into_inner())
                .await?
                .ok_or_else(|| ApiError::from(GameError::not_found("listed building is gone")))?;
            let tile = game_store::find_tile(&mut *tx, building.tile_id.into_inner())
                .await?
                .ok_or_else(|| ApiError::from(GameError::not_found("listed tile is gone")))?;
            (tile, Some(building))
        }
    };

    let outcome = actions::buy_listing(
        buyer,
        seller,
        listing,
        tile,
        building,
        Money::from_minor(body.price),
        &map,
        &state.config.game,
    )?;

    map_store::update_tile_owner(&mut *tx, &outcome.tile).await?;
    if let Some(building) = &outcome.building {
        game_store::update_building(&mut *tx, building).await?;
    }
    game_store::update_listing_status(&mut *tx, &outcome.listing).await?;
    game_store::update_company(&mut *tx, &outcome.buyer).await?;
    game_store::update_company(&mut *tx, &outcome.seller).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.buyer_transaction).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.seller_transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "tile": outcome.tile,
        "cash": outcome.buyer.cash,
        "level_up": outcome.level_up,
    })))
}

// ---------------------------------------------------------------------------
// Attacks, security, remediation
// ---------------------------------------------------------------------------

/// Attack body.
#[derive(Debug, Deserialize)]
pub struct AttackRequest {
    /// The building under attack.
    pub building_id: Uuid,
    /// The trick to perform.
    pub trick: TrickKind,
    /// Optional taunt, routed through the moderation gate.
    pub message: Option<String>,
}

/// `POST /game/companies/{id}/attack`
pub async fn attack(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<AttackRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    // Moderation first: a rejected message fails the attack outright.
    let message_status = match &body.message {
        Some(text) => {
            state
                .moderation
                .moderate_message(ModerationCategory::AttackMessage, text)
                .await?
        }
        None => boomtown_types::ModerationStatus::Approved,
    };

    let now = Utc::now();
    let tick = tick_boundary(now, state.config.tick.cadence_minutes)
        .map_err(|e| ApiError::from(GameError::internal(e.to_string())))?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let attacker = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &attacker).await?;
    let target = game_store::lock_building(&mut *tx, body.building_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such building")))?;
    let tile = game_store::find_tile(&mut *tx, target.tile_id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("target tile is gone")))?;
    let security = game_store::building_security(&mut *tx, target.id.into_inner()).await?;
    let trick_key = boomtown_db::enum_to_db(&body.trick)?;
    let last_tick =
        game_store::last_trick_tick(&mut *tx, attacker.id.into_inner(), &trick_key).await?;

    let outcome = {
        let mut rng = state.rng.lock().await;
        tricks::perform_trick(
            attacker,
            tricks::TrickParamsIn {
                map: &map,
                target_coords: (tile.x, tile.y),
                target,
                security,
                trick: body.trick,
                message: body.message,
                message_status,
                current_tick: tick,
                last_same_trick_tick: last_tick,
                weekday: weekday_utc(now),
            },
            &state.config.game,
            &mut rng,
        )?
    };

    game_store::update_building(&mut *tx, &outcome.building).await?;
    game_store::update_company(&mut *tx, &outcome.attacker).await?;
    game_store::insert_attack(&mut *tx, &outcome.attack, tick).await?;
    if !outcome.dirty.is_empty() {
        game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    }
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "damage_dealt": outcome.attack.damage_dealt,
        "detected": outcome.attack.detected,
        "collapsed": outcome.building.collapsed,
        "in_prison": outcome.attacker.in_prison,
        "fine": outcome.attacker.fine,
        "cash": outcome.attacker.cash,
    })))
}

/// `POST /game/companies/{id}/pay-fine`
pub async fn pay_fine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;

    let outcome = tricks::pay_fine(company, &state.config.game)?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "released": true, "cash": outcome.company.cash })))
}

/// Takeover body.
#[derive(Debug, Deserialize)]
pub struct TakeoverRequest {
    /// The building to seize.
    pub building_id: Uuid,
    /// Optional taunt, routed through the moderation gate like an
    /// attack message.
    pub message: Option<String>,
}

/// `POST /game/companies/{id}/takeover`
pub async fn takeover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<TakeoverRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    // Attack-style moderation: a rejected taunt fails the takeover.
    let message_status = match &body.message {
        Some(text) => {
            state
                .moderation
                .moderate_message(ModerationCategory::AttackMessage, text)
                .await?
        }
        None => boomtown_types::ModerationStatus::Approved,
    };

    let tick = tick_boundary(Utc::now(), state.config.tick.cadence_minutes)
        .map_err(|e| ApiError::from(GameError::internal(e.to_string())))?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let attacker = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &attacker).await?;
    let building = game_store::lock_building(&mut *tx, body.building_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such building")))?;
    let tile = game_store::find_tile(&mut *tx, building.tile_id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("target tile is gone")))?;
    let owner = game_store::find_company(&mut *tx, building.owner.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("owner no longer exists")))?;
    let last_takeover =
        transaction_store::last_takeover_tick(&mut *tx, attacker.id.into_inner()).await?;

    let outcome = actions::takeover(
        attacker,
        actions::TakeoverParams {
            map: &map,
            tile,
            building,
            owner_ticks_since_action: owner.ticks_since_action,
            current_tick: tick,
            last_takeover_tick: last_takeover,
            message: body.message,
            message_status,
        },
        &state.config.game,
    )?;
    map_store::update_tile_owner(&mut *tx, &outcome.tile).await?;
    game_store::update_building(&mut *tx, &outcome.building).await?;
    game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "taken": true, "cash": outcome.company.cash })))
}

/// Security body.
#[derive(Debug, Deserialize)]
pub struct SecurityRequest {
    /// The building to protect.
    pub building_id: Uuid,
    /// Guard tier to hire.
    pub level: u8,
}

/// `POST /game/companies/{id}/security`
pub async fn buy_security(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<SecurityRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let building = game_store::lock_building(&mut *tx, body.building_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such building")))?;
    let existing = game_store::building_security(&mut *tx, building.id.into_inner()).await?;

    let outcome = actions::purchase_security(
        company,
        &map,
        &building,
        existing.as_ref(),
        body.level,
        &state.config.game,
    )?;
    if let Some(security) = &outcome.security {
        game_store::insert_security(&mut *tx, building.id.into_inner(), security).await?;
    }
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "security": outcome.security, "cash": outcome.company.cash })))
}

/// Building-reference body.
#[derive(Debug, Deserialize)]
pub struct BuildingRef {
    /// The building in question.
    pub building_id: Uuid,
}

/// `DELETE /game/companies/{id}/security` (body-addressed).
pub async fn remove_security(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuildingRef>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let building = game_store::lock_building(&mut *tx, body.building_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such building")))?;
    let existing = game_store::building_security(&mut *tx, building.id.into_inner()).await?;

    let outcome = actions::remove_security(
        company,
        &map,
        &building,
        existing.as_ref(),
        &state.config.game,
    )?;
    game_store::delete_security(&mut *tx, building.id.into_inner()).await?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "removed": true })))
}

/// `POST /game/companies/{id}/repair`
pub async fn repair(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuildingRef>,
) -> Result<Response, ApiError> {
    remedial(state, headers, company_id, body, Remedy::Repair).await
}

/// `POST /game/companies/{id}/extinguish`
pub async fn extinguish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuildingRef>,
) -> Result<Response, ApiError> {
    remedial(state, headers, company_id, body, Remedy::Extinguish).await
}

/// `POST /game/companies/{id}/cleanup`
pub async fn cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BuildingRef>,
) -> Result<Response, ApiError> {
    remedial(state, headers, company_id, body, Remedy::Cleanup).await
}

/// The three owner-side cleanup operations share one transaction shape.
enum Remedy {
    Repair,
    Extinguish,
    Cleanup,
}

async fn remedial(
    state: AppState,
    headers: HeaderMap,
    company_id: Uuid,
    body: BuildingRef,
    remedy: Remedy,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let building = game_store::lock_building(&mut *tx, body.building_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such building")))?;
    let tile = game_store::find_tile(&mut *tx, building.tile_id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("tile is gone")))?;

    let outcome = match remedy {
        Remedy::Repair => actions::repair(company, &map, &tile, building, &state.config.game)?,
        Remedy::Extinguish => actions::extinguish(company, &map, building, &state.config.game)?,
        Remedy::Cleanup => actions::cleanup(company, &map, building, &state.config.game)?,
    };

    game_store::update_building(&mut *tx, &outcome.building).await?;
    if !outcome.dirty.is_empty() {
        game_store::mark_dirty_at(&mut *tx, map.id.into_inner(), &outcome.dirty).await?;
    }
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "building": outcome.building,
        "cash": outcome.company.cash,
        "level_up": outcome.level_up,
    })))
}

// ---------------------------------------------------------------------------
// Progression & social
// ---------------------------------------------------------------------------

/// Hero-out body.
#[derive(Debug, Deserialize)]
pub struct HeroOutRequest {
    /// Optional farewell, routed through moderation.
    pub message: Option<String>,
}

/// `POST /game/companies/{id}/hero-out`
pub async fn hero_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<HeroOutRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    let message_status = match &body.message {
        Some(text) => Some(
            state
                .moderation
                .moderate_message(ModerationCategory::HeroMessage, text)
                .await?,
        ),
        None => None,
    };

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    // Standing measured inside the transaction.
    let buildings = game_store::map_buildings(&mut *tx, map.id.into_inner()).await?;
    let mut net_worth = company
        .cash
        .checked_add(company.offshore)
        .ok_or_else(|| ApiError::from(GameError::internal("net worth overflow")))?;
    for b in buildings.iter().filter(|b| b.owner == company.id && b.is_live()) {
        net_worth = net_worth
            .checked_add(b.calculated_value)
            .ok_or_else(|| ApiError::from(GameError::internal("net worth overflow")))?;
    }
    let tiles = map_store::map_tiles(&mut *tx, map.id.into_inner()).await?;
    let owned = tiles.iter().filter(|t| t.owner == Some(company.id)).count();
    let total = tiles.len().max(1);
    let land_permille = u16::try_from(owned.saturating_mul(1000).checked_div(total).unwrap_or(0))
        .unwrap_or(u16::MAX);

    let outcome = progression::hero_out(
        company,
        &map,
        progression::MapStanding {
            net_worth,
            land_permille,
        },
        &state.config.game,
    )?;

    if let (Some(text), Some(status)) = (body.message, message_status) {
        let message =
            social::post_message(&outcome.company, &map, ChatKind::Hero, text, status)?;
        game_store::insert_chat(&mut *tx, &message).await?;
    }
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "unlocked": outcome.company.hero_unlocks,
        "level_up": outcome.level_up,
    })))
}

/// Amount body.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Minor units.
    pub amount: i64,
}

/// `POST /game/companies/{id}/donate`
pub async fn donate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<AmountRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    let outcome = social::donate(company, &map, Money::from_minor(body.amount))?;
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "cash": outcome.company.cash })))
}

/// Offshore body.
#[derive(Debug, Deserialize)]
pub struct OffshoreRequest {
    /// `deposit` or `withdraw`.
    pub direction: String,
    /// Minor units.
    pub amount: i64,
}

/// `POST /game/companies/{id}/offshore`
pub async fn offshore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<OffshoreRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    let amount = Money::from_minor(body.amount);
    let outcome = match body.direction.as_str() {
        "deposit" => social::offshore_deposit(company, &map, amount)?,
        "withdraw" => social::offshore_withdraw(company, &map, amount)?,
        _ => return Err(GameError::invalid("direction must be deposit or withdraw").into()),
    };
    game_store::update_company(&mut *tx, &outcome.company).await?;
    transaction_store::insert_transaction(&mut *tx, &outcome.transaction).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "cash": outcome.company.cash,
        "offshore": outcome.company.offshore,
    })))
}

/// Chat body.
#[derive(Debug, Deserialize)]
pub struct ChatPost {
    /// The message body.
    pub body: String,
}

/// `POST /game/companies/{id}/chat`
pub async fn post_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<ChatPost>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let status = state
        .moderation
        .moderate_message(ModerationCategory::ChatMessage, &body.body)
        .await?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;
    let message = social::post_message(&company, &map, ChatKind::Map, body.body, status)?;
    game_store::insert_chat(&mut *tx, &message).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(created(json!({
        "id": message.id,
        "visible": message.moderation_status == boomtown_types::ModerationStatus::Approved,
    })))
}

// ---------------------------------------------------------------------------
// Casino
// ---------------------------------------------------------------------------

/// Roulette body.
#[derive(Debug, Deserialize)]
pub struct RouletteRequest {
    /// The bet.
    pub bet: RouletteBet,
    /// The wager in minor units.
    pub wager: i64,
}

/// `POST /game/companies/{id}/casino/roulette`
pub async fn roulette(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<RouletteRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    let wager = Money::from_minor(body.wager);
    if !company.cash.covers(wager) {
        return Err(GameError::precondition("insufficient cash").into());
    }
    company.cash = debit(company.cash, wager).map_err(internal)?;

    let result = {
        let mut rng = state.rng.lock().await;
        spin_roulette(body.bet, wager, &mut rng)?
    };
    if result.payout.minor() > 0 {
        company.cash = credit(company.cash, result.payout).map_err(internal)?;
    }

    let net = result.payout.minor().saturating_sub(wager.minor());
    let record = TransactionBuilder::new(TransactionKind::CasinoWager, company.id)
        .map(map.id)
        .amount(Money::from_minor(net))
        .detail("game", "roulette")
        .detail("landed", i64::from(result.landed))
        .build()
        .map_err(internal)?;

    game_store::update_company(&mut *tx, &company).await?;
    transaction_store::insert_transaction(&mut *tx, &record).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "landed": result.landed,
        "payout": result.payout,
        "cash": company.cash,
    })))
}

/// Blackjack body: one endpoint drives the whole hand state machine.
#[derive(Debug, Deserialize)]
pub struct BlackjackRequest {
    /// `deal`, `hit`, `stand`, or `double`.
    pub action: String,
    /// The hand in progress (absent for `deal`).
    pub game_id: Option<Uuid>,
    /// The stake (required for `deal`).
    pub wager: Option<i64>,
}

/// `POST /game/companies/{id}/casino/blackjack`
#[allow(clippy::too_many_lines)]
pub async fn blackjack(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(company_id): Path<Uuid>,
    Json(body): Json<BlackjackRequest>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut company = lock_owned_company(&mut *tx, &ctx, company_id).await?;
    let map = company_map(&mut *tx, &company).await?;

    let mut hands = state.blackjack.lock().await;
    let game = match body.action.as_str() {
        "deal" => {
            let wager = Money::from_minor(body.wager.unwrap_or(0));
            if !company.cash.covers(wager) {
                return Err(GameError::precondition("insufficient cash").into());
            }
            company.cash = debit(company.cash, wager).map_err(internal)?;
            let game = {
                let mut rng = state.rng.lock().await;
                BlackjackGame::deal(company.id, wager, &mut rng)?
            };
            hands.insert(game.id.into_inner(), game.clone());
            game
        }
        action => {
            let game_id = body
                .game_id
                .ok_or_else(|| ApiError::from(GameError::invalid("game_id is required")))?;
            let mut game = hands
                .get(&game_id)
                .cloned()
                .ok_or_else(|| ApiError::from(GameError::not_found("no such hand")))?;
            if game.company != company.id {
                return Err(GameError::forbidden("not your hand").into());
            }
            {
                let mut rng = state.rng.lock().await;
                match action {
                    "hit" => game.hit(&mut rng)?,
                    "stand" => game.stand(&mut rng)?,
                    "double" => {
                        // The extra stake is taken before the card falls.
                        let extra = game.wager;
                        if !company.cash.covers(extra) {
                            return Err(GameError::precondition("insufficient cash").into());
                        }
                        company.cash = debit(company.cash, extra).map_err(internal)?;
                        game.double(&mut rng)?;
                    }
                    _ => {
                        return Err(GameError::invalid(
                            "action must be deal, hit, stand, or double",
                        )
                        .into());
                    }
                }
            }
            hands.insert(game_id, game.clone());
            game
        }
    };

    // Settle finished hands: credit the payout and record the wager.
    let mut settled_payout = None;
    if matches!(game.phase, BlackjackPhase::Bust | BlackjackPhase::Settled) {
        let payout = game.payout()?;
        if payout.minor() > 0 {
            company.cash = credit(company.cash, payout).map_err(internal)?;
        }
        let net = payout.minor().saturating_sub(game.wager.minor());
        let record = TransactionBuilder::new(TransactionKind::CasinoWager, company.id)
            .map(map.id)
            .amount(Money::from_minor(net))
            .detail("game", "blackjack")
            .build()
            .map_err(internal)?;
        transaction_store::insert_transaction(&mut *tx, &record).await?;
        hands.remove(&game.id.into_inner());
        settled_payout = Some(payout);
    }
    drop(hands);

    game_store::update_company(&mut *tx, &company).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({
        "game_id": game.id,
        "phase": game.phase,
        "player": game.player,
        "player_total": hand_value(&game.player),
        "dealer": game.dealer,
        "payout": settled_payout,
        "cash": company.cash,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lock a company row and confirm the caller owns it.
async fn lock_owned_company(
    tx: &mut sqlx::PgConnection,
    ctx: &AuthContext,
    company_id: Uuid,
) -> Result<GameCompany, ApiError> {
    let company = game_store::lock_company(tx, company_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such company")))?;
    if company.user_id != ctx.user.id && !ctx.is_master() {
        return Err(GameError::forbidden("not your company").into());
    }
    Ok(company)
}

/// Resolve the map a company currently plays on.
async fn company_map(
    tx: &mut sqlx::PgConnection,
    company: &GameCompany,
) -> Result<GameMap, ApiError> {
    let map_id = company
        .map_id
        .ok_or_else(|| ApiError::from(GameError::precondition("join a map first")))?;
    map_store::find_map(tx, map_id.into_inner())
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("map no longer exists")))
}

/// Map a raw sqlx error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}

/// Wrap a ledger/builder error as internal.
fn internal(err: impl core::fmt::Display) -> ApiError {
    ApiError::from(GameError::internal(err.to_string()))
}
