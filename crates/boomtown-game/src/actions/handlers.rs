//! Action-layer operations: land, construction, market, security, and
//! remedial work.
//!
//! Every handler follows the same shape: validate all preconditions,
//! apply the mutations to owned copies of the entities, append one
//! transaction record, run the post-action level-up check, and hand the
//! caller the dirty coordinates for the tracker. A handler that returns
//! an error has mutated nothing.

use chrono::Utc;

use boomtown_ledger::{TransactionBuilder, debit};
use boomtown_types::{
    BuildingId, BuildingInstance, BuildingKind, BuildingSecurity, GameCompany, GameError, GameMap,
    ListingId, ListingStatus, ListingSubject, MarketListing, ModerationStatus, Money, Overlay,
    Tile, TransactionKind, TransactionRecord,
};
use boomtown_world::{ProfitTable, TileGrid, blueprint, dirty_set, evaluate};

use super::costs;
use super::validation::{
    ensure_funds, ensure_not_imprisoned, ensure_on_map, ensure_owns_building, ensure_owns_tile,
    ensure_tile_clear, ensure_tile_on_map,
};
use crate::config::GameTables;
use crate::progression::register_action;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Outcome of a land purchase.
#[derive(Debug, Clone)]
pub struct BuyLandOutcome {
    /// The actor with cash debited and streak advanced.
    pub company: GameCompany,
    /// The tile with its new owner.
    pub tile: Tile,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a construction.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The actor with cash debited.
    pub company: GameCompany,
    /// The freshly evaluated building.
    pub building: BuildingInstance,
    /// A visual marker replaced by this construction, to delete.
    pub replaced_marker: Option<BuildingId>,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// Coordinates whose buildings need a profit recalculation.
    pub dirty: Vec<(u32, u32)>,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a state liquidation or demolition.
#[derive(Debug, Clone)]
pub struct RemoveBuildingOutcome {
    /// The actor with proceeds credited (zero for demolition).
    pub company: GameCompany,
    /// The removed building's id.
    pub removed: BuildingId,
    /// The rubble marker left behind, if this was a demolition.
    pub marker: Option<BuildingInstance>,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// Coordinates whose buildings need a profit recalculation.
    pub dirty: Vec<(u32, u32)>,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of selling land back to the state.
#[derive(Debug, Clone)]
pub struct SellLandOutcome {
    /// The actor with proceeds credited and streak reset.
    pub company: GameCompany,
    /// The tile with ownership released.
    pub tile: Tile,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a peer market purchase.
#[derive(Debug, Clone)]
pub struct BuyListingOutcome {
    /// The buyer with cash debited.
    pub buyer: GameCompany,
    /// The seller with cash credited.
    pub seller: GameCompany,
    /// The conveyed tile.
    pub tile: Tile,
    /// The conveyed building, when the subject was a building.
    pub building: Option<BuildingInstance>,
    /// The listing, now sold.
    pub listing: MarketListing,
    /// The buyer-side audit record.
    pub buyer_transaction: TransactionRecord,
    /// The seller-side audit record.
    pub seller_transaction: TransactionRecord,
    /// The buyer's new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a security purchase or removal.
#[derive(Debug, Clone)]
pub struct SecurityOutcome {
    /// The actor with cash debited (unchanged on removal).
    pub company: GameCompany,
    /// The security layer now attached, or `None` after removal.
    pub security: Option<BuildingSecurity>,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a takeover.
#[derive(Debug, Clone)]
pub struct TakeoverOutcome {
    /// The attacker with the price debited.
    pub company: GameCompany,
    /// The tile, now the attacker's.
    pub tile: Tile,
    /// The building, now the attacker's.
    pub building: BuildingInstance,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// Coordinates whose buildings need a profit recalculation.
    pub dirty: Vec<(u32, u32)>,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Outcome of a remedial action (repair, extinguish, cleanup).
#[derive(Debug, Clone)]
pub struct RemedialOutcome {
    /// The actor with the cost debited.
    pub company: GameCompany,
    /// The building with the corresponding flags cleared.
    pub building: BuildingInstance,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// Coordinates to dirty-mark (repair of a collapse changes occupancy).
    pub dirty: Vec<(u32, u32)>,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

// ---------------------------------------------------------------------------
// Land
// ---------------------------------------------------------------------------

/// Buy an unowned tile from the state.
///
/// Preconditions: actor not imprisoned, on this map; tile unowned,
/// ownable terrain, no fixture; fewer than the unbuilt-tile cap held;
/// cash covers the streak-discounted cost.
pub fn buy_land(
    company: GameCompany,
    map: &GameMap,
    tile: Tile,
    unbuilt_tiles_owned: u32,
    tables: &GameTables,
) -> Result<BuyLandOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_tile_on_map(&tile, map)?;

    if tile.owner.is_some() {
        return Err(GameError::precondition("tile already owned"));
    }
    if tile.special.is_some() {
        return Err(GameError::precondition("special buildings cannot be owned"));
    }
    if !tile.terrain.ownable() {
        return Err(GameError::precondition("terrain cannot be owned"));
    }
    if unbuilt_tiles_owned >= tables.economy.unbuilt_tile_cap {
        return Err(GameError::precondition("too many unbuilt tiles on this map"));
    }

    let cost = costs::land_cost(map.tier, tile.terrain, company.land_streak, &tables.land)?;
    ensure_funds(&company, cost)?;

    let mut company = company;
    company.cash = debit(company.cash, cost).map_err(money_error)?;
    company.land_streak = company.land_streak.saturating_add(1);
    let level_up = register_action(&mut company, &tables.levels);

    let mut tile = tile;
    tile.owner = Some(company.id);

    let transaction = TransactionBuilder::new(TransactionKind::LandPurchase, company.id)
        .map(map.id)
        .tile(tile.id)
        .amount(Money::from_minor(cost.minor().saturating_neg()))
        .detail("terrain", format!("{:?}", tile.terrain))
        .build()
        .map_err(money_error)?;

    Ok(BuyLandOutcome {
        company,
        tile,
        transaction,
        level_up,
    })
}

/// Sell an empty owned tile back to the state.
///
/// Fails while the tile is listed on the market or still carries a
/// building. Selling resets the land streak.
pub fn sell_land_to_state(
    company: GameCompany,
    map: &GameMap,
    tile: Tile,
    has_building: bool,
    listed: bool,
    tables: &GameTables,
) -> Result<SellLandOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_tile(&company, &tile)?;
    if listed {
        return Err(GameError::precondition("tile is listed on the market"));
    }
    if has_building {
        return Err(GameError::precondition("tile still has a building"));
    }

    let price = costs::state_land_price(map.tier, tile.terrain, &tables.land)?;

    let mut company = company;
    company.cash = boomtown_ledger::credit(company.cash, price).map_err(money_error)?;
    company.land_streak = 0;
    let level_up = register_action(&mut company, &tables.levels);

    let mut tile = tile;
    tile.owner = None;

    let transaction = TransactionBuilder::new(TransactionKind::LandSale, company.id)
        .map(map.id)
        .tile(tile.id)
        .amount(price)
        .build()
        .map_err(money_error)?;

    Ok(SellLandOutcome {
        company,
        tile,
        transaction,
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Parameters for [`build`].
///
/// Bundled to keep the call site readable; the caller assembles the
/// snapshot and counts inside its transaction.
#[derive(Debug)]
pub struct BuildParams<'a> {
    /// The map under action.
    pub map: &'a GameMap,
    /// The tile to build on.
    pub tile: &'a Tile,
    /// Whatever currently stands on the tile (markers are replaced).
    pub existing: Option<&'a BuildingInstance>,
    /// What to build.
    pub kind: BuildingKind,
    /// Chosen variant, for kinds that declare variants.
    pub variant: Option<String>,
    /// Live count of this kind on the map (license check).
    pub licensed_count: u32,
    /// Snapshot of the map as of the start of the transaction.
    pub grid: &'a TileGrid,
    /// The adjacency coefficient table.
    pub profit_table: &'a ProfitTable,
}

/// Construct a building on an owned tile.
///
/// The new instance is evaluated immediately through the profit engine;
/// its whole neighborhood (itself included) is dirty-marked so the next
/// tick re-evaluates everything against the changed map.
pub fn build(
    company: GameCompany,
    params: BuildParams<'_>,
    tables: &GameTables,
) -> Result<BuildOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, params.map)?;
    ensure_tile_on_map(params.tile, params.map)?;
    ensure_owns_tile(&company, params.tile)?;
    ensure_tile_clear(params.existing)?;

    let bp = blueprint(params.kind);
    if !bp.player_buildable {
        return Err(GameError::precondition("building type cannot be constructed"));
    }
    if company.level < bp.level_required {
        return Err(GameError::precondition("level too low for this building"));
    }
    if let Some(cap) = bp.max_per_map {
        if params.licensed_count >= cap {
            return Err(GameError::precondition("license limit reached"));
        }
    }
    if !bp.accepts_variant(params.variant.as_deref()) {
        return Err(GameError::precondition("invalid variant for this building"));
    }
    ensure_funds(&company, bp.base_cost)?;

    let valuation = evaluate(
        params.tile.x,
        params.tile.y,
        params.kind,
        params.grid,
        params.map.tier,
        params.profit_table,
    )
    .map_err(|e| GameError::internal(e.to_string()))?;

    let mut company = company;
    company.cash = debit(company.cash, bp.base_cost).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let building = BuildingInstance {
        id: BuildingId::new(),
        tile_id: params.tile.id,
        map_id: params.map.id,
        kind: params.kind,
        owner: company.id,
        variant: params.variant,
        calculated_profit: valuation.profit,
        calculated_value: valuation.value,
        breakdown: valuation.breakdown,
        damage: boomtown_types::DamagePercent::ZERO,
        collapsed: false,
        burning: false,
        overlay: None,
        needs_profit_recalc: true,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    let transaction = TransactionBuilder::new(TransactionKind::Construction, company.id)
        .map(params.map.id)
        .tile(params.tile.id)
        .building(building.id)
        .amount(Money::from_minor(bp.base_cost.minor().saturating_neg()))
        .detail("kind", format!("{:?}", params.kind))
        .build()
        .map_err(money_error)?;

    Ok(BuildOutcome {
        company,
        replaced_marker: params.existing.map(|b| b.id),
        transaction,
        dirty: dirty_set(params.tile.x, params.tile.y, params.map.width, params.map.height),
        level_up,
        building,
    })
}

/// Demolish an owned building, leaving a rubble marker.
///
/// Releases the kind's license slot and dirty-marks the neighborhood.
pub fn demolish(
    company: GameCompany,
    map: &GameMap,
    tile: &Tile,
    building: BuildingInstance,
    tables: &GameTables,
) -> Result<RemoveBuildingOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, &building)?;
    if boomtown_world::is_marker(building.kind) {
        return Err(GameError::precondition("nothing to demolish"));
    }

    let mut company = company;
    let level_up = register_action(&mut company, &tables.levels);

    let marker = BuildingInstance {
        id: BuildingId::new(),
        tile_id: building.tile_id,
        map_id: building.map_id,
        kind: BuildingKind::Demolished,
        owner: company.id,
        variant: None,
        calculated_profit: Money::ZERO,
        calculated_value: Money::ZERO,
        breakdown: Vec::new(),
        damage: boomtown_types::DamagePercent::ZERO,
        collapsed: false,
        burning: false,
        overlay: None,
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    let transaction = TransactionBuilder::new(TransactionKind::Demolition, company.id)
        .map(map.id)
        .tile(tile.id)
        .building(building.id)
        .detail("kind", format!("{:?}", building.kind))
        .build()
        .map_err(money_error)?;

    Ok(RemoveBuildingOutcome {
        company,
        removed: building.id,
        marker: Some(marker),
        transaction,
        dirty: dirty_set(tile.x, tile.y, map.width, map.height),
        level_up,
    })
}

/// Liquidate an owned building to the state at the buyback fraction of
/// its current value. Fails while the building is listed.
pub fn sell_building_to_state(
    company: GameCompany,
    map: &GameMap,
    tile: &Tile,
    building: BuildingInstance,
    listed: bool,
    tables: &GameTables,
) -> Result<RemoveBuildingOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, &building)?;
    if boomtown_world::is_marker(building.kind) {
        return Err(GameError::precondition("nothing to sell"));
    }
    if listed {
        return Err(GameError::precondition("building is listed on the market"));
    }

    let price = costs::state_building_price(building.calculated_value, &tables.economy)?;

    let mut company = company;
    company.cash = boomtown_ledger::credit(company.cash, price).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let transaction = TransactionBuilder::new(TransactionKind::BuildingSale, company.id)
        .map(map.id)
        .tile(tile.id)
        .building(building.id)
        .amount(price)
        .build()
        .map_err(money_error)?;

    Ok(RemoveBuildingOutcome {
        company,
        removed: building.id,
        marker: None,
        transaction,
        dirty: dirty_set(tile.x, tile.y, map.width, map.height),
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Publish an asking price for an owned tile or building.
///
/// No cash moves until a buyer arrives, so listing produces no
/// transaction record.
pub fn list_for_sale(
    company: &GameCompany,
    map: &GameMap,
    subject: ListingSubject,
    tile: &Tile,
    building: Option<&BuildingInstance>,
    asking_price: Money,
    already_listed: bool,
) -> Result<MarketListing, GameError> {
    ensure_not_imprisoned(company)?;
    ensure_on_map(company, map)?;
    ensure_owns_tile(company, tile)?;
    if let ListingSubject::Building(_) = subject {
        let Some(b) = building else {
            return Err(GameError::not_found("no building on that tile"));
        };
        ensure_owns_building(company, b)?;
    }
    if asking_price.minor() <= 0 {
        return Err(GameError::invalid("asking price must be positive"));
    }
    if already_listed {
        return Err(GameError::conflict("already listed"));
    }

    Ok(MarketListing {
        id: ListingId::new(),
        map_id: map.id,
        subject,
        asking_price,
        seller: company.id,
        status: ListingStatus::Active,
        created_at: Utc::now(),
    })
}

/// Withdraw an active listing.
pub fn cancel_listing(
    company: &GameCompany,
    listing: MarketListing,
) -> Result<MarketListing, GameError> {
    if listing.seller != company.id {
        return Err(GameError::forbidden("listing is not yours"));
    }
    if listing.status != ListingStatus::Active {
        return Err(GameError::precondition("listing is no longer active"));
    }
    let mut listing = listing;
    listing.status = ListingStatus::Cancelled;
    Ok(listing)
}

/// Atomically transfer a listed tile or building to a buyer.
///
/// The buyer's offered price must match the current asking price exactly;
/// cash moves to the seller and ownership to the buyer in one commit.
#[allow(clippy::too_many_lines)]
pub fn buy_listing(
    buyer: GameCompany,
    seller: GameCompany,
    listing: MarketListing,
    tile: Tile,
    building: Option<BuildingInstance>,
    offered_price: Money,
    map: &GameMap,
    tables: &GameTables,
) -> Result<BuyListingOutcome, GameError> {
    ensure_not_imprisoned(&buyer)?;
    ensure_on_map(&buyer, map)?;
    if listing.status != ListingStatus::Active {
        return Err(GameError::precondition("listing is no longer active"));
    }
    if buyer.id == seller.id {
        return Err(GameError::precondition("cannot buy your own listing"));
    }
    if offered_price != listing.asking_price {
        return Err(GameError::conflict("asking price has changed"));
    }
    if let ListingSubject::Building(_) = listing.subject {
        if building.is_none() {
            return Err(GameError::not_found("listed building no longer exists"));
        }
    }
    ensure_funds(&buyer, listing.asking_price)?;

    let mut buyer = buyer;
    let mut seller = seller;
    buyer.cash = debit(buyer.cash, listing.asking_price).map_err(money_error)?;
    seller.cash =
        boomtown_ledger::credit(seller.cash, listing.asking_price).map_err(money_error)?;
    let level_up = register_action(&mut buyer, &tables.levels);

    let mut tile = tile;
    tile.owner = Some(buyer.id);
    let building = building.map(|mut b| {
        b.owner = buyer.id;
        b
    });

    let mut listing = listing;
    listing.status = ListingStatus::Sold;

    let kind = match listing.subject {
        ListingSubject::Tile(_) => "tile",
        ListingSubject::Building(_) => "building",
    };
    let buyer_transaction = TransactionBuilder::new(TransactionKind::MarketPurchase, buyer.id)
        .map(map.id)
        .tile(tile.id)
        .amount(Money::from_minor(listing.asking_price.minor().saturating_neg()))
        .detail("subject", kind)
        .build()
        .map_err(money_error)?;
    let seller_transaction = TransactionBuilder::new(TransactionKind::MarketSale, seller.id)
        .map(map.id)
        .tile(tile.id)
        .amount(listing.asking_price)
        .detail("subject", kind)
        .build()
        .map_err(money_error)?;

    Ok(BuyListingOutcome {
        buyer,
        seller,
        tile,
        building,
        listing,
        buyer_transaction,
        seller_transaction,
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// Hire a security detail for an owned building.
pub fn purchase_security(
    company: GameCompany,
    map: &GameMap,
    building: &BuildingInstance,
    existing: Option<&BuildingSecurity>,
    level: u8,
    tables: &GameTables,
) -> Result<SecurityOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, building)?;
    if existing.is_some() {
        return Err(GameError::conflict("security already installed"));
    }
    let Some(tier) = tables.security.tier(level) else {
        return Err(GameError::invalid("no such security level"));
    };
    ensure_funds(&company, tier.cost)?;

    let mut company = company;
    company.cash = debit(company.cash, tier.cost).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let security = BuildingSecurity {
        level: tier.level,
        upkeep: tier.upkeep,
        resistance_pct: tier.resistance_pct,
    };

    let transaction = TransactionBuilder::new(TransactionKind::SecurityPurchase, company.id)
        .map(map.id)
        .building(building.id)
        .amount(Money::from_minor(tier.cost.minor().saturating_neg()))
        .detail("level", i64::from(tier.level))
        .build()
        .map_err(money_error)?;

    Ok(SecurityOutcome {
        company,
        security: Some(security),
        transaction,
        level_up,
    })
}

/// Dismiss a building's security detail. No refund; the upkeep simply
/// stops.
pub fn remove_security(
    company: GameCompany,
    map: &GameMap,
    building: &BuildingInstance,
    existing: Option<&BuildingSecurity>,
    tables: &GameTables,
) -> Result<SecurityOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, building)?;
    if existing.is_none() {
        return Err(GameError::precondition("no security installed"));
    }

    let mut company = company;
    let level_up = register_action(&mut company, &tables.levels);

    let transaction = TransactionBuilder::new(TransactionKind::SecurityRemoval, company.id)
        .map(map.id)
        .building(building.id)
        .build()
        .map_err(money_error)?;

    Ok(SecurityOutcome {
        company,
        security: None,
        transaction,
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Takeover
// ---------------------------------------------------------------------------

/// Parameters for [`takeover`].
#[derive(Debug)]
pub struct TakeoverParams<'a> {
    /// The map both parties are on.
    pub map: &'a GameMap,
    /// The target building's tile.
    pub tile: Tile,
    /// The target building, loaded under a row lock.
    pub building: BuildingInstance,
    /// The victim's inactivity clock (abandonment eligibility).
    pub owner_ticks_since_action: u32,
    /// The current tick boundary.
    pub current_tick: i64,
    /// The tick of the attacker's last takeover, if any.
    pub last_takeover_tick: Option<i64>,
    /// The attacker's taunt, already routed through the moderation gate.
    pub message: Option<String>,
    /// The gate's verdict for the taunt.
    pub message_status: ModerationStatus,
}

/// Seize a building from an inactive or ruined owner.
///
/// Eligibility: the building's damage has crossed the takeover threshold
/// OR its owner has been inactive beyond the inactivity threshold, and
/// the attacker's takeover cooldown has elapsed. The price is a
/// formula-driven premium over current value, paid to the state. The
/// taunt and its moderation verdict travel on the transaction record;
/// only an approved taunt becomes visible.
pub fn takeover(
    attacker: GameCompany,
    params: TakeoverParams<'_>,
    tables: &GameTables,
) -> Result<TakeoverOutcome, GameError> {
    ensure_not_imprisoned(&attacker)?;
    ensure_on_map(&attacker, params.map)?;
    let building = params.building;
    if building.owner == attacker.id {
        return Err(GameError::precondition("cannot take over your own building"));
    }
    if boomtown_world::is_marker(building.kind) {
        return Err(GameError::precondition("nothing to take over"));
    }

    if let Some(last) = params.last_takeover_tick {
        let elapsed = params.current_tick.saturating_sub(last);
        if elapsed < i64::from(tables.economy.takeover_cooldown_ticks) {
            return Err(GameError::precondition("takeover is still cooling down"));
        }
    }

    let damaged = building.damage.value() >= tables.economy.takeover_damage_threshold;
    let abandoned =
        params.owner_ticks_since_action >= tables.economy.inactivity_threshold_ticks;
    if !damaged && !abandoned {
        return Err(GameError::precondition("target is not eligible for takeover"));
    }

    let price = costs::takeover_price(building.calculated_value, &tables.economy)?;
    ensure_funds(&attacker, price)?;

    let mut attacker = attacker;
    attacker.cash = debit(attacker.cash, price).map_err(money_error)?;
    let level_up = register_action(&mut attacker, &tables.levels);

    let mut tile = params.tile;
    tile.owner = Some(attacker.id);
    let mut building = building;
    building.owner = attacker.id;

    let mut builder = TransactionBuilder::new(TransactionKind::Takeover, attacker.id)
        .map(params.map.id)
        .tile(tile.id)
        .building(building.id)
        .amount(Money::from_minor(price.minor().saturating_neg()))
        .detail("damaged", damaged)
        .detail("abandoned", abandoned)
        .detail("tick", params.current_tick);
    if let Some(message) = params.message {
        let status_key = match params.message_status {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        };
        builder = builder
            .detail("message", message)
            .detail("message_status", status_key);
    }
    let transaction = builder.build().map_err(money_error)?;

    let dirty = dirty_set(tile.x, tile.y, params.map.width, params.map.height);
    Ok(TakeoverOutcome {
        company: attacker,
        tile,
        building,
        transaction,
        dirty,
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Remedial work
// ---------------------------------------------------------------------------

/// Fully repair an owned building: damage to zero, collapse cleared.
///
/// A burning building must be extinguished first.
pub fn repair(
    company: GameCompany,
    map: &GameMap,
    tile: &Tile,
    building: BuildingInstance,
    tables: &GameTables,
) -> Result<RemedialOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, &building)?;
    if building.burning {
        return Err(GameError::precondition("extinguish the fire first"));
    }
    if building.damage.value() == 0 {
        return Err(GameError::precondition("nothing to repair"));
    }

    let cost = costs::repair_cost(building.damage.value(), &tables.economy)?;
    ensure_funds(&company, cost)?;

    let mut company = company;
    company.cash = debit(company.cash, cost).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let was_collapsed = building.collapsed;
    let mut building = building;
    building.damage = boomtown_types::DamagePercent::ZERO;
    building.collapsed = false;
    building.overlay = None;
    building.needs_profit_recalc = true;

    let transaction = TransactionBuilder::new(TransactionKind::Repair, company.id)
        .map(map.id)
        .building(building.id)
        .amount(Money::from_minor(cost.minor().saturating_neg()))
        .build()
        .map_err(money_error)?;

    // A repaired collapse changes what occupies the tile again.
    let dirty = if was_collapsed {
        dirty_set(tile.x, tile.y, map.width, map.height)
    } else {
        Vec::new()
    };

    Ok(RemedialOutcome {
        company,
        building,
        transaction,
        dirty,
        level_up,
    })
}

/// Put out an arson fire. Cost scales with the current damage.
pub fn extinguish(
    company: GameCompany,
    map: &GameMap,
    building: BuildingInstance,
    tables: &GameTables,
) -> Result<RemedialOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, &building)?;
    if !building.burning {
        return Err(GameError::precondition("building is not burning"));
    }

    let cost = costs::extinguish_cost(building.damage.value(), &tables.economy)?;
    ensure_funds(&company, cost)?;

    let mut company = company;
    company.cash = debit(company.cash, cost).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let mut building = building;
    building.burning = false;
    if building.overlay == Some(Overlay::Fire) {
        building.overlay = None;
    }

    let transaction = TransactionBuilder::new(TransactionKind::Extinguish, company.id)
        .map(map.id)
        .building(building.id)
        .amount(Money::from_minor(cost.minor().saturating_neg()))
        .build()
        .map_err(money_error)?;

    Ok(RemedialOutcome {
        company,
        building,
        transaction,
        dirty: Vec::new(),
        level_up,
    })
}

/// Clear a rubble or vermin overlay left by a trick.
pub fn cleanup(
    company: GameCompany,
    map: &GameMap,
    building: BuildingInstance,
    tables: &GameTables,
) -> Result<RemedialOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;
    ensure_owns_building(&company, &building)?;
    match building.overlay {
        Some(Overlay::Rubble | Overlay::Vermin) => {}
        Some(Overlay::Fire) => {
            return Err(GameError::precondition("extinguish the fire first"));
        }
        None => return Err(GameError::precondition("nothing to clean up")),
    }

    let cost = tables.economy.cleanup_cost;
    ensure_funds(&company, cost)?;

    let mut company = company;
    company.cash = debit(company.cash, cost).map_err(money_error)?;
    let level_up = register_action(&mut company, &tables.levels);

    let mut building = building;
    building.overlay = None;

    let transaction = TransactionBuilder::new(TransactionKind::Cleanup, company.id)
        .map(map.id)
        .building(building.id)
        .amount(Money::from_minor(cost.minor().saturating_neg()))
        .build()
        .map_err(money_error)?;

    Ok(RemedialOutcome {
        company,
        building,
        transaction,
        dirty: Vec::new(),
        level_up,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a ledger error into the shared taxonomy.
fn money_error(err: boomtown_ledger::LedgerError) -> GameError {
    match err {
        boomtown_ledger::LedgerError::InsufficientFunds { .. } => {
            GameError::precondition("insufficient cash")
        }
        other => GameError::internal(other.to_string()),
    }
}
