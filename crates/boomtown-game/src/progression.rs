//! Level-ups, the hero-out ceremony, and the location ladder.
//!
//! The level-up check runs after every action-layer operation via
//! [`register_action`]. Hero-out is a separate player-initiated action
//! that records an unlock token; joining a map of a given tier is gated
//! on that token, and leaving a map forfeits everything on it.

use boomtown_ledger::TransactionBuilder;
use boomtown_types::{
    BuildingId, GameCompany, GameError, GameMap, MapTier, Money, TileId, TransactionKind,
    TransactionRecord,
};

use crate::actions::validation::{ensure_not_imprisoned, ensure_on_map};
use crate::config::{EconomyTable, GameTables, LevelTable};

/// Record a successful action: bump the lifetime counter, reset the
/// inactivity clock, and run the level-up check.
///
/// Returns the new level when a threshold was crossed.
pub fn register_action(company: &mut GameCompany, levels: &LevelTable) -> Option<u8> {
    company.total_actions = company.total_actions.saturating_add(1);
    company.ticks_since_action = 0;
    let earned = levels.level_for(company.total_actions);
    if earned > company.level {
        company.level = earned;
        tracing::info!(company = %company.id, level = earned, "level up");
        Some(earned)
    } else {
        None
    }
}

/// Outcome of a hero-out ceremony.
#[derive(Debug, Clone)]
pub struct HeroOutOutcome {
    /// The company with the unlock recorded.
    pub company: GameCompany,
    /// The audit record carrying the unlock token in its details.
    pub transaction: TransactionRecord,
    /// The new level, if the ceremony crossed a threshold.
    pub level_up: Option<u8>,
}

/// The company's standing on a map, as measured by the caller inside the
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct MapStanding {
    /// Cash + offshore + the value of every standing building.
    pub net_worth: Money,
    /// Owned tiles as a share of the map, in per-mille.
    pub land_permille: u16,
}

/// Perform the hero-out ceremony.
///
/// Requires the company to be on a map of a tier it has not yet heroed
/// out of, to meet all three thresholds, to be active, and not to be
/// imprisoned. Eligibility never auto-promotes: this is the player
/// action it unlocks.
pub fn hero_out(
    company: GameCompany,
    map: &GameMap,
    standing: MapStanding,
    tables: &GameTables,
) -> Result<HeroOutOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    ensure_on_map(&company, map)?;

    let Some(next) = map.tier.next() else {
        return Err(GameError::precondition("already at the top tier"));
    };
    if company.hero_unlocks.contains(&next) {
        return Err(GameError::precondition("already heroed out of this tier"));
    }
    if company.ticks_since_action >= tables.economy.inactivity_threshold_ticks {
        return Err(GameError::precondition("company is inactive"));
    }
    if standing.net_worth < map.hero_thresholds.net_worth {
        return Err(GameError::precondition("net worth below the hero threshold"));
    }
    if company.cash < map.hero_thresholds.cash {
        return Err(GameError::precondition("cash below the hero threshold"));
    }
    if standing.land_permille < map.hero_thresholds.land_permille {
        return Err(GameError::precondition("land share below the hero threshold"));
    }

    let mut company = company;
    company.hero_unlocks.push(next);
    let level_up = register_action(&mut company, &tables.levels);

    let transaction = TransactionBuilder::new(TransactionKind::HeroOut, company.id)
        .map(map.id)
        .detail("unlocks", tier_key(next))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    tracing::info!(company = %company.id, unlocks = tier_key(next), "hero out");

    Ok(HeroOutOutcome {
        company,
        transaction,
        level_up,
    })
}

/// Outcome of joining a map.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The company, now on the map with tier starting cash.
    pub company: GameCompany,
    /// The audit record.
    pub transaction: TransactionRecord,
}

/// Join a map, taking the tier's starting cash.
///
/// Joining a tier the company has not unlocked fails; the company must
/// have left any previous location first.
pub fn join_location(
    company: GameCompany,
    map: &GameMap,
    economy: &EconomyTable,
) -> Result<JoinOutcome, GameError> {
    ensure_not_imprisoned(&company)?;
    if company.map_id.is_some() {
        return Err(GameError::precondition("leave your current location first"));
    }
    if !map.active {
        return Err(GameError::precondition("map is closed"));
    }
    if !company.has_unlocked(map.tier) {
        return Err(GameError::precondition("tier locked"));
    }

    let starting = economy.starting_cash_for(map.tier);

    let mut company = company;
    company.map_id = Some(map.id);
    company.tier_joined = Some(map.tier);
    company.cash = starting;
    company.ticks_since_action = 0;
    company.land_streak = 0;

    let transaction = TransactionBuilder::new(TransactionKind::LocationJoin, company.id)
        .map(map.id)
        .amount(starting)
        .detail("tier", tier_key(map.tier))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(JoinOutcome {
        company,
        transaction,
    })
}

/// Outcome of leaving a map.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// The company, off-map with liquid cash forfeited (offshore
    /// savings survive).
    pub company: GameCompany,
    /// Tiles whose ownership is released.
    pub released_tiles: Vec<TileId>,
    /// Building instances to delete.
    pub deleted_buildings: Vec<BuildingId>,
    /// The audit record.
    pub transaction: TransactionRecord,
}

/// Leave the current map, forfeiting all cash and buildings on it.
pub fn leave_location(
    company: GameCompany,
    map: &GameMap,
    owned_tiles: Vec<TileId>,
    owned_buildings: Vec<BuildingId>,
) -> Result<LeaveOutcome, GameError> {
    ensure_on_map(&company, map)?;

    let forfeited = company.cash;
    let mut company = company;
    company.map_id = None;
    company.tier_joined = None;
    company.cash = Money::ZERO;
    company.land_streak = 0;

    let transaction = TransactionBuilder::new(TransactionKind::LocationLeave, company.id)
        .map(map.id)
        .amount(Money::from_minor(forfeited.minor().saturating_neg()))
        .detail("tiles_released", owned_tiles.len())
        .detail("buildings_deleted", owned_buildings.len())
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(LeaveOutcome {
        company,
        released_tiles: owned_tiles,
        deleted_buildings: owned_buildings,
        transaction,
    })
}

/// The snake-case name of a tier, used in transaction details.
const fn tier_key(tier: MapTier) -> &'static str {
    match tier {
        MapTier::Town => "town",
        MapTier::City => "city",
        MapTier::Capital => "capital",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boomtown_types::{GameCompanyId, HeroThresholds, MapId, UserId};
    use chrono::Utc;
    use serde_json::Value;

    use super::*;

    fn make_company() -> GameCompany {
        GameCompany {
            id: GameCompanyId::new(),
            user_id: UserId::new(),
            name: String::from("Acme Holdings"),
            boss_name: String::from("J. Acme"),
            cash: Money::from_minor(4_000_000),
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
        }
    }

    fn make_town() -> GameMap {
        GameMap {
            id: MapId::new(),
            country: String::from("Testland"),
            tier: MapTier::Town,
            width: 10,
            height: 10,
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

    #[test]
    fn register_action_resets_inactivity_and_levels_up() {
        let mut company = make_company();
        company.total_actions = 9;
        company.ticks_since_action = 40;
        let levels = LevelTable::default();

        let up = register_action(&mut company, &levels);
        assert_eq!(up, Some(2)); // 10 actions crosses the level-2 threshold
        assert_eq!(company.ticks_since_action, 0);
        assert_eq!(company.level, 2);

        assert_eq!(register_action(&mut company, &levels), None);
    }

    #[test]
    fn hero_out_records_city_unlock() {
        let mut company = make_company();
        let map = make_town();
        company.map_id = Some(map.id);
        let tables = GameTables::default();

        let outcome = hero_out(
            company,
            &map,
            MapStanding {
                net_worth: Money::from_minor(5_500_000),
                land_permille: 60,
            },
            &tables,
        )
        .unwrap();

        assert!(outcome.company.hero_unlocks.contains(&MapTier::City));
        assert_eq!(
            outcome.transaction.details.get("unlocks").and_then(Value::as_str),
            Some("city")
        );
    }

    #[test]
    fn hero_out_requires_all_three_thresholds() {
        let mut company = make_company();
        let map = make_town();
        company.map_id = Some(map.id);
        let tables = GameTables::default();

        let poor = hero_out(
            company.clone(),
            &map,
            MapStanding {
                net_worth: Money::from_minor(4_000_000),
                land_permille: 60,
            },
            &tables,
        );
        assert!(poor.is_err());

        company.cash = Money::from_minor(1_000);
        let illiquid = hero_out(
            company.clone(),
            &map,
            MapStanding {
                net_worth: Money::from_minor(5_500_000),
                land_permille: 60,
            },
            &tables,
        );
        assert!(illiquid.is_err());

        company.cash = Money::from_minor(4_000_000);
        let landless = hero_out(
            company,
            &map,
            MapStanding {
                net_worth: Money::from_minor(5_500_000),
                land_permille: 10,
            },
            &tables,
        );
        assert!(landless.is_err());
    }

    #[test]
    fn join_requires_unlock_and_sets_tier_cash() {
        let company = make_company();
        let economy = EconomyTable::default();

        let mut city = make_town();
        city.tier = MapTier::City;
        let locked = join_location(company.clone(), &city, &economy);
        assert!(locked.is_err());

        let town = make_town();
        let joined = join_location(company.clone(), &town, &economy).unwrap();
        assert_eq!(joined.company.cash, Money::from_minor(50_000));
        assert_eq!(joined.company.map_id, Some(town.id));

        let mut unlocked = company;
        unlocked.hero_unlocks.push(MapTier::City);
        let city_join = join_location(unlocked, &city, &economy).unwrap();
        assert_eq!(city_join.company.cash, Money::from_minor(1_000_000));
    }

    #[test]
    fn capital_requires_its_own_unlock() {
        let mut company = make_company();
        company.hero_unlocks.push(MapTier::City);
        let mut capital = make_town();
        capital.tier = MapTier::Capital;
        let economy = EconomyTable::default();

        assert!(join_location(company, &capital, &economy).is_err());
    }

    #[test]
    fn leaving_forfeits_cash_but_not_offshore() {
        let mut company = make_company();
        let map = make_town();
        company.map_id = Some(map.id);
        company.offshore = Money::from_minor(77_000);

        let outcome = leave_location(company, &map, vec![TileId::new()], vec![]).unwrap();
        assert_eq!(outcome.company.cash, Money::ZERO);
        assert_eq!(outcome.company.offshore, Money::from_minor(77_000));
        assert_eq!(outcome.company.map_id, None);
        assert_eq!(outcome.released_tiles.len(), 1);
    }
}
