//! Action-layer flows over the pure handlers: purchase/liquidation
//! laws, build/demolish round trips, license caps, the market, security,
//! and takeovers.

#![allow(clippy::unwrap_used)]

use chrono::Utc;

use boomtown_game::GameTables;
use boomtown_game::actions::handlers::{self, BuildParams};
use boomtown_types::{
    BuildingInstance, BuildingKind, DamagePercent, GameCompany, GameCompanyId, GameMap,
    HeroThresholds, ListingStatus, ListingSubject, MapId, MapTier, Money, Terrain, Tile, TileId,
    UserId,
};
use boomtown_world::{ProfitTable, TileGrid, evaluate};

fn make_map() -> GameMap {
    GameMap {
        id: MapId::new(),
        country: String::from("Testland"),
        tier: MapTier::Town,
        width: 5,
        height: 5,
        hero_thresholds: HeroThresholds {
            net_worth: Money::from_minor(5_000_000),
            cash: Money::from_minor(3_000_000),
            land_permille: 50,
        },
        police_strike_day: 6,
        active: true,
        created_at: Utc::now(),
    }
}

fn make_company(map: &GameMap, cash: i64) -> GameCompany {
    GameCompany {
        id: GameCompanyId::new(),
        user_id: UserId::new(),
        name: String::from("Acme Holdings"),
        boss_name: String::from("J. Acme"),
        cash: Money::from_minor(cash),
        offshore: Money::ZERO,
        level: 9,
        total_actions: 600,
        ticks_since_action: 0,
        in_prison: false,
        fine: Money::ZERO,
        land_streak: 0,
        map_id: Some(map.id),
        tier_joined: Some(MapTier::Town),
        hero_unlocks: Vec::new(),
        created_at: Utc::now(),
    }
}

fn bare_tiles(map: &GameMap) -> Vec<Tile> {
    let mut tiles = Vec::new();
    for y in 0..map.height {
        for x in 0..map.width {
            tiles.push(Tile {
                id: TileId::new(),
                map_id: map.id,
                x,
                y,
                terrain: Terrain::FreeLand,
                special: None,
                owner: None,
            });
        }
    }
    tiles
}

fn tile_at(tiles: &[Tile], x: u32, y: u32) -> Tile {
    tiles.iter().find(|t| t.x == x && t.y == y).cloned().unwrap()
}

fn grid_of(map: &GameMap, tiles: &[Tile], buildings: &[BuildingInstance]) -> TileGrid {
    TileGrid::from_entities(map.width, map.height, tiles, buildings).unwrap()
}

#[test]
fn buy_then_sell_to_state_never_profits() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let company = make_company(&map, 100_000);

    for terrain in [Terrain::FreeLand, Terrain::Trees, Terrain::DirtTrack] {
        let mut tile = tile_at(&tiles, 1, 1);
        tile.terrain = terrain;

        let bought =
            handlers::buy_land(company.clone(), &map, tile, 0, &tables).unwrap();
        let paid = Money::from_minor(100_000).minor() - bought.company.cash.minor();

        let sold = handlers::sell_land_to_state(
            bought.company,
            &map,
            bought.tile,
            false,
            false,
            &tables,
        )
        .unwrap();
        let received = sold.transaction.amount.minor();
        assert!(received <= paid, "{terrain:?}: {received} > {paid}");
        assert!(sold.tile.owner.is_none());
        assert_eq!(sold.company.land_streak, 0);
    }
}

#[test]
fn unbuilt_tile_cap_blocks_hoarding() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let company = make_company(&map, 1_000_000);

    let err = handlers::buy_land(
        company,
        &map,
        tile_at(&tiles, 0, 0),
        tables.economy.unbuilt_tile_cap,
        &tables,
    )
    .unwrap_err();
    assert_eq!(err.message, "too many unbuilt tiles on this map");
}

#[test]
fn prison_blocks_every_action() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let mut company = make_company(&map, 100_000);
    company.in_prison = true;

    let err = handlers::buy_land(company, &map, tile_at(&tiles, 0, 0), 0, &tables).unwrap_err();
    assert_eq!(err.message, "in prison");
}

#[test]
fn build_then_demolish_restores_neighbors() {
    let tables = GameTables::default();
    let profit_table = ProfitTable::default();
    let map = make_map();
    let mut tiles = bare_tiles(&map);
    let company = make_company(&map, 500_000);

    // A pre-existing stand at (2,2).
    let bought =
        handlers::buy_land(company, &map, tile_at(&tiles, 2, 2), 0, &tables).unwrap();
    for t in &mut tiles {
        if t.id == bought.tile.id {
            *t = bought.tile.clone();
        }
    }
    let grid = grid_of(&map, &tiles, &[]);
    let first = handlers::build(
        bought.company,
        BuildParams {
            map: &map,
            tile: &bought.tile,
            existing: None,
            kind: BuildingKind::HotDogStand,
            variant: None,
            licensed_count: 0,
            grid: &grid,
            profit_table: &profit_table,
        },
        &tables,
    )
    .unwrap();
    let profit_before = first.building.calculated_profit;

    // A second stand next door saturates the first...
    let bought2 = handlers::buy_land(
        first.company,
        &map,
        tile_at(&tiles, 3, 2),
        0,
        &tables,
    )
    .unwrap();
    for t in &mut tiles {
        if t.id == bought2.tile.id {
            *t = bought2.tile.clone();
        }
    }
    let grid2 = grid_of(&map, &tiles, std::slice::from_ref(&first.building));
    let second = handlers::build(
        bought2.company,
        BuildParams {
            map: &map,
            tile: &bought2.tile,
            existing: None,
            kind: BuildingKind::HotDogStand,
            variant: None,
            licensed_count: 0,
            grid: &grid2,
            profit_table: &profit_table,
        },
        &tables,
    )
    .unwrap();

    let with_neighbor = evaluate(
        2,
        2,
        BuildingKind::HotDogStand,
        &grid_of(&map, &tiles, &[first.building.clone(), second.building.clone()]),
        map.tier,
        &profit_table,
    )
    .unwrap();
    assert!(with_neighbor.profit < profit_before);

    // ...and demolishing it restores the original figure.
    let demolished = handlers::demolish(
        second.company,
        &map,
        &bought2.tile,
        second.building,
        &tables,
    )
    .unwrap();
    assert!(demolished.marker.is_some());
    assert!(!demolished.dirty.is_empty());

    let marker = demolished.marker.unwrap();
    let after = evaluate(
        2,
        2,
        BuildingKind::HotDogStand,
        &grid_of(&map, &tiles, &[first.building, marker]),
        map.tier,
        &profit_table,
    )
    .unwrap();
    assert_eq!(after.profit, profit_before);
}

#[test]
fn license_cap_blocks_second_casino() {
    let tables = GameTables::default();
    let profit_table = ProfitTable::default();
    let map = make_map();
    let mut tiles = bare_tiles(&map);
    let company = make_company(&map, 2_000_000);

    let bought =
        handlers::buy_land(company, &map, tile_at(&tiles, 1, 1), 0, &tables).unwrap();
    for t in &mut tiles {
        if t.id == bought.tile.id {
            *t = bought.tile.clone();
        }
    }
    let grid = grid_of(&map, &tiles, &[]);

    // One casino already stands on the map: the license is exhausted
    // even though cash and level suffice.
    let err = handlers::build(
        bought.company,
        BuildParams {
            map: &map,
            tile: &bought.tile,
            existing: None,
            kind: BuildingKind::Casino,
            variant: None,
            licensed_count: 1,
            grid: &grid,
            profit_table: &profit_table,
        },
        &tables,
    )
    .unwrap_err();
    assert_eq!(err.message, "license limit reached");
}

#[test]
fn variants_are_enforced() {
    let tables = GameTables::default();
    let profit_table = ProfitTable::default();
    let map = make_map();
    let mut tiles = bare_tiles(&map);
    let company = make_company(&map, 2_000_000);

    let bought =
        handlers::buy_land(company, &map, tile_at(&tiles, 1, 1), 0, &tables).unwrap();
    for t in &mut tiles {
        if t.id == bought.tile.id {
            *t = bought.tile.clone();
        }
    }
    let grid = grid_of(&map, &tiles, &[]);

    let missing = handlers::build(
        bought.company.clone(),
        BuildParams {
            map: &map,
            tile: &bought.tile,
            existing: None,
            kind: BuildingKind::Restaurant,
            variant: None,
            licensed_count: 0,
            grid: &grid,
            profit_table: &profit_table,
        },
        &tables,
    );
    assert!(missing.is_err());

    let chosen = handlers::build(
        bought.company,
        BuildParams {
            map: &map,
            tile: &bought.tile,
            existing: None,
            kind: BuildingKind::Restaurant,
            variant: Some(String::from("cantonese")),
            licensed_count: 0,
            grid: &grid,
            profit_table: &profit_table,
        },
        &tables,
    );
    assert!(chosen.is_ok());
}

#[test]
fn market_transfer_moves_cash_and_ownership() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let seller = make_company(&map, 100_000);
    let buyer = make_company(&map, 100_000);

    let bought =
        handlers::buy_land(seller, &map, tile_at(&tiles, 2, 2), 0, &tables).unwrap();
    let listing = handlers::list_for_sale(
        &bought.company,
        &map,
        ListingSubject::Tile(bought.tile.id),
        &bought.tile,
        None,
        Money::from_minor(4_000),
        false,
    )
    .unwrap();
    assert_eq!(listing.status, ListingStatus::Active);

    // A stale price is refused.
    let stale = handlers::buy_listing(
        buyer.clone(),
        bought.company.clone(),
        listing.clone(),
        bought.tile.clone(),
        None,
        Money::from_minor(3_500),
        &map,
        &tables,
    );
    assert!(stale.is_err());

    let done = handlers::buy_listing(
        buyer,
        bought.company,
        listing,
        bought.tile,
        None,
        Money::from_minor(4_000),
        &map,
        &tables,
    )
    .unwrap();
    assert_eq!(done.listing.status, ListingStatus::Sold);
    assert_eq!(done.tile.owner, Some(done.buyer.id));
    assert_eq!(done.buyer.cash, Money::from_minor(96_000));
    // Seller paid 1,000 for the land earlier, then received 4,000.
    assert_eq!(done.seller.cash, Money::from_minor(103_000));
    assert_eq!(done.buyer_transaction.amount, Money::from_minor(-4_000));
    assert_eq!(done.seller_transaction.amount, Money::from_minor(4_000));
}

#[test]
fn own_listing_cannot_be_bought() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let seller = make_company(&map, 100_000);

    let bought =
        handlers::buy_land(seller, &map, tile_at(&tiles, 2, 2), 0, &tables).unwrap();
    let listing = handlers::list_for_sale(
        &bought.company,
        &map,
        ListingSubject::Tile(bought.tile.id),
        &bought.tile,
        None,
        Money::from_minor(4_000),
        false,
    )
    .unwrap();

    let err = handlers::buy_listing(
        bought.company.clone(),
        bought.company,
        listing,
        bought.tile,
        None,
        Money::from_minor(4_000),
        &map,
        &tables,
    )
    .unwrap_err();
    assert_eq!(err.message, "cannot buy your own listing");
}

#[test]
fn security_layers_install_once() {
    let tables = GameTables::default();
    let map = make_map();
    let company = make_company(&map, 100_000);

    let building = BuildingInstance {
        id: boomtown_types::BuildingId::new(),
        tile_id: TileId::new(),
        map_id: map.id,
        kind: BuildingKind::Shop,
        owner: company.id,
        variant: Some(String::from("bakery")),
        calculated_profit: Money::from_minor(650),
        calculated_value: Money::from_minor(12_000),
        breakdown: Vec::new(),
        damage: DamagePercent::ZERO,
        collapsed: false,
        burning: false,
        overlay: None,
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    let bought = handlers::purchase_security(company, &map, &building, None, 2, &tables).unwrap();
    let security = bought.security.unwrap();
    assert_eq!(security.level, 2);
    assert_eq!(security.resistance_pct, 50);
    assert_eq!(bought.company.cash, Money::from_minor(75_000));

    let again = handlers::purchase_security(
        bought.company.clone(),
        &map,
        &building,
        Some(&security),
        3,
        &tables,
    );
    assert!(again.is_err());

    let removed =
        handlers::remove_security(bought.company, &map, &building, Some(&security), &tables)
            .unwrap();
    assert!(removed.security.is_none());
}

fn takeover_params<'a>(
    map: &'a GameMap,
    tile: Tile,
    building: BuildingInstance,
    owner_ticks_since_action: u32,
    last_takeover_tick: Option<i64>,
) -> handlers::TakeoverParams<'a> {
    handlers::TakeoverParams {
        map,
        tile,
        building,
        owner_ticks_since_action,
        current_tick: 100,
        last_takeover_tick,
        message: None,
        message_status: boomtown_types::ModerationStatus::Approved,
    }
}

#[test]
fn takeover_needs_damage_or_abandonment() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let raider = make_company(&map, 1_000_000);
    let victim = make_company(&map, 1_000_000);

    let mut tile = tile_at(&tiles, 2, 2);
    tile.owner = Some(victim.id);
    let mut building = BuildingInstance {
        id: boomtown_types::BuildingId::new(),
        tile_id: tile.id,
        map_id: map.id,
        kind: BuildingKind::Motel,
        owner: victim.id,
        variant: None,
        calculated_profit: Money::from_minor(1_800),
        calculated_value: Money::from_minor(35_000),
        breakdown: Vec::new(),
        damage: DamagePercent::new(20),
        collapsed: false,
        burning: false,
        overlay: None,
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    // Healthy and active: not eligible.
    let err = handlers::takeover(
        raider.clone(),
        takeover_params(&map, tile.clone(), building.clone(), 0, None),
        &tables,
    )
    .unwrap_err();
    assert_eq!(err.message, "target is not eligible for takeover");

    // Ruined past the threshold: eligible, and the price is a premium
    // over current value.
    building.damage = DamagePercent::new(85);
    let seized = handlers::takeover(
        raider,
        takeover_params(&map, tile, building, 0, None),
        &tables,
    )
    .unwrap();
    assert_eq!(seized.tile.owner, Some(seized.company.id));
    assert_eq!(seized.building.owner, seized.company.id);
    assert_eq!(
        seized.transaction.amount,
        Money::from_minor(-42_000) // 35,000 x 120%
    );
}

#[test]
fn takeover_cooldown_blocks_sprees() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let raider = make_company(&map, 1_000_000);
    let victim = make_company(&map, 1_000_000);

    let mut tile = tile_at(&tiles, 2, 2);
    tile.owner = Some(victim.id);
    let building = BuildingInstance {
        id: boomtown_types::BuildingId::new(),
        tile_id: tile.id,
        map_id: map.id,
        kind: BuildingKind::Motel,
        owner: victim.id,
        variant: None,
        calculated_profit: Money::from_minor(1_800),
        calculated_value: Money::from_minor(35_000),
        breakdown: Vec::new(),
        damage: DamagePercent::new(85),
        collapsed: false,
        burning: false,
        overlay: None,
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    // A takeover inside the cooldown window is refused even though the
    // target is eligible. Default cooldown is 24 ticks.
    let err = handlers::takeover(
        raider.clone(),
        takeover_params(&map, tile.clone(), building.clone(), 0, Some(90)),
        &tables,
    )
    .unwrap_err();
    assert_eq!(err.message, "takeover is still cooling down");

    // Once the cooldown has elapsed the seizure goes through, and the
    // record carries its tick and the moderated taunt.
    let mut params = takeover_params(&map, tile, building, 0, Some(70));
    params.message = Some(String::from("under new management"));
    params.message_status = boomtown_types::ModerationStatus::Pending;
    let seized = handlers::takeover(raider, params, &tables).unwrap();
    assert_eq!(
        seized.transaction.details.get("tick").and_then(serde_json::Value::as_i64),
        Some(100)
    );
    assert_eq!(
        seized.transaction.details.get("message").and_then(serde_json::Value::as_str),
        Some("under new management")
    );
    assert_eq!(
        seized
            .transaction
            .details
            .get("message_status")
            .and_then(serde_json::Value::as_str),
        Some("pending")
    );
}

#[test]
fn repair_clears_collapse_and_dirties() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let company = make_company(&map, 100_000);
    let tile = tile_at(&tiles, 2, 2);

    let building = BuildingInstance {
        id: boomtown_types::BuildingId::new(),
        tile_id: tile.id,
        map_id: map.id,
        kind: BuildingKind::Shop,
        owner: company.id,
        variant: Some(String::from("grocer")),
        calculated_profit: Money::from_minor(650),
        calculated_value: Money::from_minor(12_000),
        breakdown: Vec::new(),
        damage: DamagePercent::TOTAL,
        collapsed: true,
        burning: false,
        overlay: Some(boomtown_types::Overlay::Rubble),
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    let repaired = handlers::repair(company, &map, &tile, building, &tables).unwrap();
    assert_eq!(repaired.building.damage, DamagePercent::ZERO);
    assert!(!repaired.building.collapsed);
    assert!(repaired.building.overlay.is_none());
    assert!(!repaired.dirty.is_empty());
    // 100 points at 100 minor units each.
    assert_eq!(repaired.company.cash, Money::from_minor(90_000));
}

#[test]
fn burning_building_must_be_extinguished_before_repair() {
    let tables = GameTables::default();
    let map = make_map();
    let tiles = bare_tiles(&map);
    let company = make_company(&map, 100_000);
    let tile = tile_at(&tiles, 2, 2);

    let building = BuildingInstance {
        id: boomtown_types::BuildingId::new(),
        tile_id: tile.id,
        map_id: map.id,
        kind: BuildingKind::Campsite,
        owner: company.id,
        variant: None,
        calculated_profit: Money::from_minor(400),
        calculated_value: Money::from_minor(7_500),
        breakdown: Vec::new(),
        damage: DamagePercent::new(40),
        collapsed: false,
        burning: true,
        overlay: Some(boomtown_types::Overlay::Fire),
        needs_profit_recalc: false,
        last_tick_applied: 0,
        created_at: Utc::now(),
    };

    let blocked =
        handlers::repair(company.clone(), &map, &tile, building.clone(), &tables).unwrap_err();
    assert_eq!(blocked.message, "extinguish the fire first");

    let doused = handlers::extinguish(company, &map, building, &tables).unwrap();
    assert!(!doused.building.burning);
    assert!(doused.building.overlay.is_none());
    // 40 damage points at 150 per point.
    assert_eq!(doused.company.cash, Money::from_minor(94_000));
}
