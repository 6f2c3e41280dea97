//! Game-rule tables, deserialized from the deployment configuration.
//!
//! The numbers here are data owned by the product side, not design: every
//! table derives `Deserialize` with full defaults so a deployment can
//! override any coefficient without code changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use boomtown_types::{MapTier, Money, Terrain, TrickKind};

// ---------------------------------------------------------------------------
// Land costs
// ---------------------------------------------------------------------------

/// Land purchase pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandCostTable {
    /// Base cost on a town map.
    pub town_base: Money,
    /// Base cost on a city map.
    pub city_base: Money,
    /// Base cost on a capital map.
    pub capital_base: Money,
    /// Terrain factor percent for free land.
    pub free_land_pct: i64,
    /// Terrain factor percent for trees.
    pub trees_pct: i64,
    /// Terrain factor percent for dirt tracks.
    pub dirt_track_pct: i64,
    /// Discount percent granted per land-streak point.
    pub streak_discount_pct_per_point: i64,
    /// Cap on the total streak discount percent.
    pub streak_discount_cap_pct: i64,
    /// Fraction of the base price the state pays when land is sold back.
    pub state_buyback_pct: i64,
}

impl Default for LandCostTable {
    fn default() -> Self {
        Self {
            town_base: Money::from_minor(1_000),
            city_base: Money::from_minor(10_000),
            capital_base: Money::from_minor(50_000),
            free_land_pct: 100,
            trees_pct: 120,
            dirt_track_pct: 80,
            streak_discount_pct_per_point: 1,
            streak_discount_cap_pct: 20,
            state_buyback_pct: 50,
        }
    }
}

impl LandCostTable {
    /// The base land cost on a map of `tier`.
    pub const fn tier_base(&self, tier: MapTier) -> Money {
        match tier {
            MapTier::Town => self.town_base,
            MapTier::City => self.city_base,
            MapTier::Capital => self.capital_base,
        }
    }

    /// The terrain factor percent for `terrain` (only ownable terrains
    /// are meaningful; others return 100).
    pub const fn terrain_pct(&self, terrain: Terrain) -> i64 {
        match terrain {
            Terrain::FreeLand => self.free_land_pct,
            Terrain::Trees => self.trees_pct,
            Terrain::DirtTrack => self.dirt_track_pct,
            Terrain::Water | Terrain::Road => 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Tricks
// ---------------------------------------------------------------------------

/// The parameters of one offensive trick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickParams {
    /// Cost charged to the attacker.
    pub cost: Money,
    /// Damage percent inflicted before security resistance.
    pub base_damage: u8,
    /// Ticks before the attacker may use this trick again.
    pub cooldown_ticks: u32,
    /// Probability of detection, in percent.
    pub detection_pct: u8,
}

/// Per-trick parameters plus the fine scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickTable {
    /// Parameters per trick kind (keyed by serialized kind name).
    pub tricks: BTreeMap<TrickKind, TrickParams>,
    /// Fine charged per point of a detected trick's base damage.
    pub fine_per_damage_point: Money,
}

impl Default for TrickTable {
    fn default() -> Self {
        let mut tricks = BTreeMap::new();
        tricks.insert(
            TrickKind::Vandalism,
            TrickParams {
                cost: Money::from_minor(1_000),
                base_damage: 10,
                cooldown_ticks: 6,
                detection_pct: 15,
            },
        );
        tricks.insert(
            TrickKind::Arson,
            TrickParams {
                cost: Money::from_minor(2_000),
                base_damage: 40,
                cooldown_ticks: 12,
                detection_pct: 30,
            },
        );
        tricks.insert(
            TrickKind::Sabotage,
            TrickParams {
                cost: Money::from_minor(3_000),
                base_damage: 25,
                cooldown_ticks: 9,
                detection_pct: 20,
            },
        );
        tricks.insert(
            TrickKind::Infestation,
            TrickParams {
                cost: Money::from_minor(1_500),
                base_damage: 15,
                cooldown_ticks: 6,
                detection_pct: 10,
            },
        );
        Self {
            tricks,
            fine_per_damage_point: Money::from_minor(250),
        }
    }
}

impl TrickTable {
    /// The parameters for `kind`; every kind has defaults.
    pub fn params(&self, kind: TrickKind) -> TrickParams {
        self.tricks.get(&kind).copied().unwrap_or(TrickParams {
            cost: Money::from_minor(1_000),
            base_damage: 10,
            cooldown_ticks: 6,
            detection_pct: 15,
        })
    }
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// One purchasable security tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTier {
    /// Guard tier, `1..=3`.
    pub level: u8,
    /// Installation cost.
    pub cost: Money,
    /// Per-tick upkeep deducted from earnings.
    pub upkeep: Money,
    /// Percent of attack damage that still gets through.
    pub resistance_pct: u8,
}

/// The purchasable security ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityTable {
    /// Tiers in ascending level order.
    pub tiers: Vec<SecurityTier>,
}

impl Default for SecurityTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                SecurityTier {
                    level: 1,
                    cost: Money::from_minor(10_000),
                    upkeep: Money::from_minor(50),
                    resistance_pct: 75,
                },
                SecurityTier {
                    level: 2,
                    cost: Money::from_minor(25_000),
                    upkeep: Money::from_minor(120),
                    resistance_pct: 50,
                },
                SecurityTier {
                    level: 3,
                    cost: Money::from_minor(50_000),
                    upkeep: Money::from_minor(250),
                    resistance_pct: 25,
                },
            ],
        }
    }
}

impl SecurityTable {
    /// The tier with the given level, if offered.
    pub fn tier(&self, level: u8) -> Option<SecurityTier> {
        self.tiers.iter().copied().find(|t| t.level == level)
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// Tier-wide economic parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTable {
    /// Tax percent on positive tick income, per tier (town/city/capital).
    pub tax_pct: BTreeMap<MapTier, i64>,
    /// Starting cash granted on joining a map, per tier.
    pub starting_cash: BTreeMap<MapTier, Money>,
    /// Fraction of current value the state pays for a building.
    pub state_building_buyback_pct: i64,
    /// Maximum unbuilt tiles a company may hold per map.
    pub unbuilt_tile_cap: u32,
    /// The overdraft floor; tick upkeep never sinks cash below it.
    pub overdraft_floor: Money,
    /// Ticks without an action before a company turns inactive.
    pub inactivity_threshold_ticks: u32,
    /// Damage percent at which a building becomes takeover-eligible.
    pub takeover_damage_threshold: u8,
    /// Takeover price as a percent of the building's current value.
    pub takeover_price_pct: i64,
    /// Ticks before a company may attempt another takeover.
    pub takeover_cooldown_ticks: u32,
    /// Repair cost per damage point removed.
    pub repair_cost_per_point: Money,
    /// Extinguish cost per current damage point.
    pub extinguish_cost_per_point: Money,
    /// Flat cost to clean up a rubble or vermin overlay.
    pub cleanup_cost: Money,
}

impl Default for EconomyTable {
    fn default() -> Self {
        let mut tax_pct = BTreeMap::new();
        tax_pct.insert(MapTier::Town, 10);
        tax_pct.insert(MapTier::City, 15);
        tax_pct.insert(MapTier::Capital, 20);
        let mut starting_cash = BTreeMap::new();
        starting_cash.insert(MapTier::Town, Money::from_minor(50_000));
        starting_cash.insert(MapTier::City, Money::from_minor(1_000_000));
        starting_cash.insert(MapTier::Capital, Money::from_minor(5_000_000));
        Self {
            tax_pct,
            starting_cash,
            state_building_buyback_pct: 60,
            unbuilt_tile_cap: 10,
            overdraft_floor: Money::from_minor(-10_000),
            inactivity_threshold_ticks: 144,
            takeover_damage_threshold: 80,
            takeover_price_pct: 120,
            takeover_cooldown_ticks: 24,
            repair_cost_per_point: Money::from_minor(100),
            extinguish_cost_per_point: Money::from_minor(150),
            cleanup_cost: Money::from_minor(500),
        }
    }
}

impl EconomyTable {
    /// The tax percent for a tier.
    pub fn tax_for(&self, tier: MapTier) -> i64 {
        self.tax_pct.get(&tier).copied().unwrap_or(10)
    }

    /// The starting cash for a tier.
    pub fn starting_cash_for(&self, tier: MapTier) -> Money {
        self.starting_cash
            .get(&tier)
            .copied()
            .unwrap_or(Money::from_minor(50_000))
    }
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// The level-up threshold table.
///
/// `thresholds[n]` is the total-actions count required for level `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTable {
    /// Ascending action-count thresholds.
    pub thresholds: Vec<u32>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: vec![0, 10, 25, 50, 100, 175, 275, 400, 550, 750],
        }
    }
}

impl LevelTable {
    /// The level a company with `total_actions` has earned.
    pub fn level_for(&self, total_actions: u32) -> u8 {
        let crossed = self
            .thresholds
            .iter()
            .filter(|&&t| total_actions >= t)
            .count();
        u8::try_from(crossed.max(1)).unwrap_or(u8::MAX)
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// All game-rule tables bundled for injection into handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTables {
    /// Land purchase pricing.
    pub land: LandCostTable,
    /// Offensive trick parameters.
    pub tricks: TrickTable,
    /// Purchasable security ladder.
    pub security: SecurityTable,
    /// Tier-wide economic parameters.
    pub economy: EconomyTable,
    /// Level-up thresholds.
    pub levels: LevelTable,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_taxes_match_tiers() {
        let economy = EconomyTable::default();
        assert_eq!(economy.tax_for(MapTier::Town), 10);
        assert_eq!(economy.tax_for(MapTier::City), 15);
        assert_eq!(economy.tax_for(MapTier::Capital), 20);
    }

    #[test]
    fn default_starting_cash_matches_tiers() {
        let economy = EconomyTable::default();
        assert_eq!(economy.starting_cash_for(MapTier::Town), Money::from_minor(50_000));
        assert_eq!(economy.starting_cash_for(MapTier::City), Money::from_minor(1_000_000));
        assert_eq!(
            economy.starting_cash_for(MapTier::Capital),
            Money::from_minor(5_000_000)
        );
    }

    #[test]
    fn level_table_walks_thresholds() {
        let levels = LevelTable::default();
        assert_eq!(levels.level_for(0), 1);
        assert_eq!(levels.level_for(9), 1);
        assert_eq!(levels.level_for(10), 2);
        assert_eq!(levels.level_for(100), 5);
        assert_eq!(levels.level_for(750), 10);
        assert_eq!(levels.level_for(10_000), 10);
    }

    #[test]
    fn every_trick_has_params() {
        let table = TrickTable::default();
        for kind in [
            TrickKind::Vandalism,
            TrickKind::Arson,
            TrickKind::Sabotage,
            TrickKind::Infestation,
        ] {
            let p = table.params(kind);
            assert!(p.cost.minor() > 0);
            assert!(p.base_damage > 0);
        }
        assert_eq!(table.params(TrickKind::Arson).base_damage, 40);
        assert_eq!(table.params(TrickKind::Arson).cost, Money::from_minor(2_000));
    }

    #[test]
    fn security_ladder_strengthens_with_level() {
        let table = SecurityTable::default();
        let l1 = table.tier(1).unwrap();
        let l3 = table.tier(3).unwrap();
        assert!(l1.resistance_pct > l3.resistance_pct);
        assert!(l1.cost < l3.cost);
        assert!(table.tier(4).is_none());
    }
}
