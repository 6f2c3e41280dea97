//! Cost formulas for action-layer operations.
//!
//! All formulas are integer arithmetic over the configuration tables; the
//! state never pays more for an asset than a player could have spent on
//! it (no arbitrage).

use boomtown_types::{GameError, MapTier, Money, Terrain};

use crate::config::{EconomyTable, LandCostTable};

/// The cost to buy one unowned tile.
///
/// `tier_base * terrain_pct / 100`, minus the streak discount
/// (`streak_discount_pct_per_point` per streak point, capped).
pub fn land_cost(
    tier: MapTier,
    terrain: Terrain,
    land_streak: u32,
    table: &LandCostTable,
) -> Result<Money, GameError> {
    let base = table.tier_base(tier).minor();
    let with_terrain = mul_pct(base, table.terrain_pct(terrain))?;

    let discount_pct = i64::from(land_streak)
        .checked_mul(table.streak_discount_pct_per_point)
        .ok_or_else(overflow)?
        .min(table.streak_discount_cap_pct);
    let pay_pct = 100i64.checked_sub(discount_pct).ok_or_else(overflow)?;

    Ok(Money::from_minor(mul_pct(with_terrain, pay_pct)?))
}

/// What the state pays when land is sold back: a fraction of the
/// undiscounted purchase price, so a buy-then-sell never profits.
pub fn state_land_price(
    tier: MapTier,
    terrain: Terrain,
    table: &LandCostTable,
) -> Result<Money, GameError> {
    let base = table.tier_base(tier).minor();
    let with_terrain = mul_pct(base, table.terrain_pct(terrain))?;
    Ok(Money::from_minor(mul_pct(with_terrain, table.state_buyback_pct)?))
}

/// What the state pays for a building: a fraction of its current value.
pub fn state_building_price(value: Money, economy: &EconomyTable) -> Result<Money, GameError> {
    Ok(Money::from_minor(mul_pct(
        value.minor(),
        economy.state_building_buyback_pct,
    )?))
}

/// The price to seize a takeover-eligible building.
pub fn takeover_price(value: Money, economy: &EconomyTable) -> Result<Money, GameError> {
    Ok(Money::from_minor(mul_pct(
        value.minor(),
        economy.takeover_price_pct,
    )?))
}

/// The cost to repair `points` of damage.
pub fn repair_cost(points: u8, economy: &EconomyTable) -> Result<Money, GameError> {
    economy
        .repair_cost_per_point
        .minor()
        .checked_mul(i64::from(points))
        .map(Money::from_minor)
        .ok_or_else(overflow)
}

/// The cost to extinguish a fire on a building at `damage` percent.
pub fn extinguish_cost(damage: u8, economy: &EconomyTable) -> Result<Money, GameError> {
    economy
        .extinguish_cost_per_point
        .minor()
        .checked_mul(i64::from(damage))
        .map(Money::from_minor)
        .ok_or_else(overflow)
}

/// Multiply by an integer percent, truncating toward zero.
fn mul_pct(amount: i64, pct: i64) -> Result<i64, GameError> {
    amount
        .checked_mul(pct)
        .and_then(|scaled| scaled.checked_div(100))
        .ok_or_else(overflow)
}

/// The single overflow error used by all formulas.
fn overflow() -> GameError {
    GameError::internal("arithmetic overflow in cost formula")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn town_free_land_costs_the_base() {
        let table = LandCostTable::default();
        let cost = land_cost(MapTier::Town, Terrain::FreeLand, 0, &table).unwrap();
        assert_eq!(cost, Money::from_minor(1_000));
    }

    #[test]
    fn trees_carry_a_premium_and_tracks_a_discount() {
        let table = LandCostTable::default();
        let trees = land_cost(MapTier::Town, Terrain::Trees, 0, &table).unwrap();
        let track = land_cost(MapTier::Town, Terrain::DirtTrack, 0, &table).unwrap();
        assert_eq!(trees, Money::from_minor(1_200));
        assert_eq!(track, Money::from_minor(800));
    }

    #[test]
    fn streak_discount_caps() {
        let table = LandCostTable::default();
        let five = land_cost(MapTier::Town, Terrain::FreeLand, 5, &table).unwrap();
        assert_eq!(five, Money::from_minor(950));
        let fifty = land_cost(MapTier::Town, Terrain::FreeLand, 50, &table).unwrap();
        assert_eq!(fifty, Money::from_minor(800)); // capped at 20%
    }

    #[test]
    fn state_buyback_never_beats_purchase() {
        let table = LandCostTable::default();
        for tier in [MapTier::Town, MapTier::City, MapTier::Capital] {
            for terrain in [Terrain::FreeLand, Terrain::Trees, Terrain::DirtTrack] {
                // Even at maximum streak discount the buyback stays below
                // what the buyer paid.
                let paid = land_cost(tier, terrain, 50, &table).unwrap();
                let back = state_land_price(tier, terrain, &table).unwrap();
                assert!(back <= paid, "{tier:?}/{terrain:?}: {back} > {paid}");
            }
        }
    }

    #[test]
    fn building_buyback_is_a_value_fraction() {
        let economy = EconomyTable::default();
        let price = state_building_price(Money::from_minor(10_000), &economy).unwrap();
        assert_eq!(price, Money::from_minor(6_000));
    }

    #[test]
    fn takeover_costs_more_than_value() {
        let economy = EconomyTable::default();
        let price = takeover_price(Money::from_minor(10_000), &economy).unwrap();
        assert_eq!(price, Money::from_minor(12_000));
    }

    #[test]
    fn repair_and_extinguish_scale_with_damage() {
        let economy = EconomyTable::default();
        assert_eq!(repair_cost(30, &economy).unwrap(), Money::from_minor(3_000));
        assert_eq!(extinguish_cost(40, &economy).unwrap(), Money::from_minor(6_000));
    }
}
