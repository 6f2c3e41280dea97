//! The pure adjacency/profit engine.
//!
//! [`evaluate`] assigns a profit and valuation to a building placed on a
//! tile, from a read-only [`TileGrid`] snapshot. It is deterministic: for
//! identical inputs the output is byte-identical (neighbors are visited in
//! the fixed [`crate::grid::NEIGHBOR_OFFSETS`] order and every map is a
//! `BTreeMap`).
//!
//! The numeric coefficients are data, not design: they live in
//! [`ProfitTable`], which deserializes from the deployment configuration.
//! The defaults here are the reference values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use boomtown_types::{
    BreakdownEntry, BuildingCategory, BuildingKind, MapTier, Money, SpecialBuilding, Terrain,
};

use crate::catalog::{self, blueprint};
use crate::error::WorldError;
use crate::grid::TileGrid;

// ---------------------------------------------------------------------------
// Coefficient table
// ---------------------------------------------------------------------------

/// Per-tier percentage multipliers applied after the adjacency sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMultipliers {
    /// Town multiplier percent.
    pub town_pct: i64,
    /// City multiplier percent.
    pub city_pct: i64,
    /// Capital multiplier percent.
    pub capital_pct: i64,
}

impl TierMultipliers {
    /// The multiplier percent for a tier.
    pub const fn pct(&self, tier: MapTier) -> i64 {
        match tier {
            MapTier::Town => self.town_pct,
            MapTier::City => self.city_pct,
            MapTier::Capital => self.capital_pct,
        }
    }
}

impl Default for TierMultipliers {
    fn default() -> Self {
        Self {
            town_pct: 100,
            city_pct: 125,
            capital_pct: 150,
        }
    }
}

/// The adjacency coefficient table.
///
/// All deltas are minor units added to (or subtracted from) the base
/// profit for each qualifying neighbor. The synergy map is keyed by the
/// two category names sorted and joined with `+` (e.g.
/// `"entertainment+hospitality"`); absent pairs contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitTable {
    /// Bonus for a neighboring temple.
    pub temple_bonus: i64,
    /// Bonus for a neighboring bank.
    pub bank_bonus: i64,
    /// Bonus for a neighboring police station.
    pub police_bonus: i64,
    /// Bonus for a neighboring casino fixture.
    pub casino_bonus: i64,
    /// Access bonus for a neighboring road tile.
    pub road_access: i64,
    /// Access bonus for a neighboring dirt track.
    pub dirt_track_access: i64,
    /// Amenity bonus for neighboring water.
    pub water_amenity: i64,
    /// Amenity bonus for neighboring trees.
    pub trees_amenity: i64,
    /// Penalty per neighboring building of the same kind.
    pub same_kind_penalty: i64,
    /// Category-pair synergies (positive) and clashes (negative).
    pub synergy: BTreeMap<String, i64>,
    /// Tier multipliers applied after the adjacency sum.
    pub tier: TierMultipliers,
    /// Percent by which a profit delta scales into a value delta.
    pub value_scale_pct: i64,
    /// The resale floor, as a percent of base cost; value never drops
    /// below it.
    pub resale_floor_pct: i64,
}

impl Default for ProfitTable {
    fn default() -> Self {
        let mut synergy = BTreeMap::new();
        synergy.insert(String::from("entertainment+hospitality"), 60);
        synergy.insert(String::from("entertainment+food"), 40);
        synergy.insert(String::from("food+retail"), 25);
        synergy.insert(String::from("hospitality+retail"), -20);
        Self {
            temple_bonus: 120,
            bank_bonus: 100,
            police_bonus: 80,
            casino_bonus: 150,
            road_access: 50,
            dirt_track_access: 20,
            water_amenity: 40,
            trees_amenity: 30,
            same_kind_penalty: 100,
            synergy,
            tier: TierMultipliers::default(),
            value_scale_pct: 400,
            resale_floor_pct: 60,
        }
    }
}

impl ProfitTable {
    /// The bonus for one neighboring special building.
    pub const fn special_bonus(&self, special: SpecialBuilding) -> i64 {
        match special {
            SpecialBuilding::Temple => self.temple_bonus,
            SpecialBuilding::Bank => self.bank_bonus,
            SpecialBuilding::PoliceStation => self.police_bonus,
            SpecialBuilding::Casino => self.casino_bonus,
        }
    }

    /// The synergy delta between two building categories (0 if unlisted).
    pub fn synergy_between(&self, a: BuildingCategory, b: BuildingCategory) -> i64 {
        let (first, second) = if category_key(a) <= category_key(b) {
            (category_key(a), category_key(b))
        } else {
            (category_key(b), category_key(a))
        };
        let key = format!("{first}+{second}");
        self.synergy.get(&key).copied().unwrap_or(0)
    }
}

/// The snake-case key of a category, used by the synergy map.
const fn category_key(category: BuildingCategory) -> &'static str {
    match category {
        BuildingCategory::Food => "food",
        BuildingCategory::Hospitality => "hospitality",
        BuildingCategory::Retail => "retail",
        BuildingCategory::Entertainment => "entertainment",
        BuildingCategory::Landmark => "landmark",
        BuildingCategory::Marker => "marker",
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The engine's output: final profit, final valuation, and the non-zero
/// contributions behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    /// Profit per tick after all modifiers.
    pub profit: Money,
    /// Valuation after all modifiers, floored at the resale floor.
    pub value: Money,
    /// Every non-zero contribution, in evaluation order.
    pub breakdown: Vec<BreakdownEntry>,
}

/// Evaluate the profit and valuation of `kind` standing at `(x, y)`.
///
/// Visual-only markers evaluate to zero with an empty breakdown. Collapsed
/// neighbor buildings contribute nothing (their tile still reads as its
/// terrain). Off-map neighbors are empty.
///
/// # Errors
///
/// Returns [`WorldError::ArithmeticOverflow`] if any checked operation
/// fails; with the reference coefficients this cannot happen for catalog
/// figures.
pub fn evaluate(
    x: u32,
    y: u32,
    kind: BuildingKind,
    grid: &TileGrid,
    tier: MapTier,
    table: &ProfitTable,
) -> Result<Valuation, WorldError> {
    let bp = blueprint(kind);

    if catalog::is_marker(kind) {
        return Ok(Valuation {
            profit: Money::ZERO,
            value: Money::ZERO,
            breakdown: Vec::new(),
        });
    }

    let mut breakdown = Vec::new();
    let mut profit = bp.base_profit.minor();
    let mut value = bp.base_cost.minor();

    breakdown.push(BreakdownEntry {
        source: String::from("base_profit"),
        delta: bp.base_profit,
        reason: format!("{kind:?} base profit"),
    });

    for ((nx, ny), cell) in grid.neighbors(x, y) {
        // Special-building bonuses.
        if let Some(special) = cell.special {
            let delta = table.special_bonus(special);
            let (p, v) = apply_delta(profit, value, delta, table.value_scale_pct)?;
            profit = p;
            value = v;
            if delta != 0 {
                breakdown.push(BreakdownEntry {
                    source: format!("{}_adjacency", special_key(special)),
                    delta: Money::from_minor(delta),
                    reason: format!("{} at ({nx},{ny})", special_key(special)),
                });
            }
        }

        // Terrain access and amenity bonuses.
        let terrain_delta = match cell.terrain {
            Terrain::Road => table.road_access,
            Terrain::DirtTrack => table.dirt_track_access,
            Terrain::Water => table.water_amenity,
            Terrain::Trees => table.trees_amenity,
            Terrain::FreeLand => 0,
        };
        if terrain_delta != 0 {
            let (p, v) = apply_delta(profit, value, terrain_delta, table.value_scale_pct)?;
            profit = p;
            value = v;
            breakdown.push(BreakdownEntry {
                source: format!("{}_adjacency", terrain_key(cell.terrain)),
                delta: Money::from_minor(terrain_delta),
                reason: format!("{} at ({nx},{ny})", terrain_key(cell.terrain)),
            });
        }

        // Neighboring buildings: saturation or category synergy.
        let Some(neighbor) = cell.building else {
            continue;
        };
        if neighbor.collapsed || catalog::is_marker(neighbor.kind) {
            continue;
        }
        let delta = if neighbor.kind == kind {
            table.same_kind_penalty.checked_neg().ok_or(WorldError::ArithmeticOverflow)?
        } else {
            table.synergy_between(bp.category, blueprint(neighbor.kind).category)
        };
        if delta != 0 {
            let (p, v) = apply_delta(profit, value, delta, table.value_scale_pct)?;
            profit = p;
            value = v;
            let source = if neighbor.kind == kind {
                String::from("saturation")
            } else if delta > 0 {
                String::from("synergy")
            } else {
                String::from("clash")
            };
            breakdown.push(BreakdownEntry {
                source,
                delta: Money::from_minor(delta),
                reason: format!("{:?} at ({nx},{ny})", neighbor.kind),
            });
        }
    }

    // Tier multiplier, applied after the adjacency sum.
    let pct = table.tier.pct(tier);
    let scaled_profit = mul_pct(profit, pct)?;
    if scaled_profit != profit {
        breakdown.push(BreakdownEntry {
            source: String::from("tier_multiplier"),
            delta: Money::from_minor(
                scaled_profit.checked_sub(profit).ok_or(WorldError::ArithmeticOverflow)?,
            ),
            reason: format!("{tier:?} multiplier {pct}%"),
        });
    }
    let scaled_value = mul_pct(value, pct)?;

    // Resale floor: value never drops below the floor fraction of cost.
    let floor = mul_pct(bp.base_cost.minor(), table.resale_floor_pct)?;
    let final_value = if scaled_value < floor {
        breakdown.push(BreakdownEntry {
            source: String::from("resale_floor"),
            delta: Money::from_minor(
                floor.checked_sub(scaled_value).ok_or(WorldError::ArithmeticOverflow)?,
            ),
            reason: format!("floored at {}% of base cost", table.resale_floor_pct),
        });
        floor
    } else {
        scaled_value
    };

    Ok(Valuation {
        profit: Money::from_minor(scaled_profit),
        value: Money::from_minor(final_value),
        breakdown,
    })
}

/// Apply one adjacency delta to the running profit and value sums.
fn apply_delta(
    profit: i64,
    value: i64,
    delta: i64,
    value_scale_pct: i64,
) -> Result<(i64, i64), WorldError> {
    let new_profit = profit.checked_add(delta).ok_or(WorldError::ArithmeticOverflow)?;
    let value_delta = mul_pct(delta, value_scale_pct)?;
    let new_value = value.checked_add(value_delta).ok_or(WorldError::ArithmeticOverflow)?;
    Ok((new_profit, new_value))
}

/// Multiply by an integer percent, truncating toward zero.
fn mul_pct(amount: i64, pct: i64) -> Result<i64, WorldError> {
    amount
        .checked_mul(pct)
        .and_then(|scaled| scaled.checked_div(100))
        .ok_or(WorldError::ArithmeticOverflow)
}

/// The snake-case key of a special building, used in breakdown sources.
const fn special_key(special: SpecialBuilding) -> &'static str {
    match special {
        SpecialBuilding::Temple => "temple",
        SpecialBuilding::Bank => "bank",
        SpecialBuilding::PoliceStation => "police_station",
        SpecialBuilding::Casino => "casino",
    }
}

/// The snake-case key of a terrain, used in breakdown sources.
const fn terrain_key(terrain: Terrain) -> &'static str {
    match terrain {
        Terrain::FreeLand => "free_land",
        Terrain::Water => "water",
        Terrain::Road => "road",
        Terrain::DirtTrack => "dirt_track",
        Terrain::Trees => "trees",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boomtown_types::{BuildingInstance, DamagePercent, GameCompanyId, MapId, Tile, TileId};
    use chrono::Utc;

    use super::*;

    fn make_tile(map_id: MapId, x: u32, y: u32, terrain: Terrain) -> Tile {
        Tile {
            id: TileId::new(),
            map_id,
            x,
            y,
            terrain,
            special: None,
            owner: None,
        }
    }

    fn make_building(tile: &Tile, kind: BuildingKind, owner: GameCompanyId) -> BuildingInstance {
        BuildingInstance {
            id: boomtown_types::BuildingId::new(),
            tile_id: tile.id,
            map_id: tile.map_id,
            kind,
            owner,
            variant: None,
            calculated_profit: Money::ZERO,
            calculated_value: Money::ZERO,
            breakdown: Vec::new(),
            damage: DamagePercent::ZERO,
            collapsed: false,
            burning: false,
            overlay: None,
            needs_profit_recalc: false,
            last_tick_applied: 0,
            created_at: Utc::now(),
        }
    }

    /// A bare 5x5 free-land grid.
    fn bare_grid(map_id: MapId) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for y in 0..5 {
            for x in 0..5 {
                tiles.push(make_tile(map_id, x, y, Terrain::FreeLand));
            }
        }
        tiles
    }

    #[test]
    fn lone_stand_earns_base_profit_on_town() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(v.profit, Money::from_minor(300));
        assert_eq!(v.value, Money::from_minor(5_000));
        assert_eq!(v.breakdown.len(), 1);
    }

    #[test]
    fn temple_adjacency_adds_documented_bonus() {
        let map_id = MapId::new();
        let mut tiles = bare_grid(map_id);
        for t in &mut tiles {
            if t.x == 3 && t.y == 1 {
                t.special = Some(SpecialBuilding::Temple);
            }
        }
        let grid = TileGrid::from_entities(5, 5, &tiles, &[]).unwrap();
        let table = ProfitTable::default();

        let near = evaluate(3, 2, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        let far = evaluate(1, 4, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(
            near.profit.minor().checked_sub(far.profit.minor()),
            Some(table.temple_bonus)
        );
        assert!(near.breakdown.iter().any(|e| e.source == "temple_adjacency"));
    }

    #[test]
    fn same_kind_neighbor_saturates() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let owner = GameCompanyId::new();
        let neighbor_tile = tiles.iter().find(|t| t.x == 3 && t.y == 2).unwrap();
        let neighbor = make_building(neighbor_tile, BuildingKind::HotDogStand, owner);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[neighbor]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(v.profit, Money::from_minor(200));
        assert!(v.breakdown.iter().any(|e| e.source == "saturation"));
    }

    #[test]
    fn collapsed_neighbor_contributes_nothing() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let owner = GameCompanyId::new();
        let neighbor_tile = tiles.iter().find(|t| t.x == 3 && t.y == 2).unwrap();
        let mut neighbor = make_building(neighbor_tile, BuildingKind::HotDogStand, owner);
        neighbor.collapsed = true;
        let grid = TileGrid::from_entities(5, 5, &tiles, &[neighbor]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(v.profit, Money::from_minor(300));
    }

    #[test]
    fn hospitality_near_entertainment_synergizes() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let owner = GameCompanyId::new();
        let neighbor_tile = tiles.iter().find(|t| t.x == 1 && t.y == 2).unwrap();
        let casino = make_building(neighbor_tile, BuildingKind::Casino, owner);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[casino]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::Motel, &grid, MapTier::Town, &table).unwrap();
        let base = blueprint(BuildingKind::Motel).base_profit.minor();
        assert_eq!(v.profit.minor(), base.checked_add(60).unwrap());
        assert!(v.breakdown.iter().any(|e| e.source == "synergy"));
    }

    #[test]
    fn city_tier_scales_profit() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::HotDogStand, &grid, MapTier::City, &table).unwrap();
        assert_eq!(v.profit, Money::from_minor(375)); // 300 * 125%
        assert!(v.breakdown.iter().any(|e| e.source == "tier_multiplier"));
    }

    #[test]
    fn value_respects_resale_floor() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        // Surround the center with same-kind neighbors to drive value down.
        let owner = GameCompanyId::new();
        let mut buildings = Vec::new();
        for t in &tiles {
            let adjacent = t.x.abs_diff(2) <= 1 && t.y.abs_diff(2) <= 1 && !(t.x == 2 && t.y == 2);
            if adjacent {
                buildings.push(make_building(t, BuildingKind::MarketStall, owner));
            }
        }
        let grid = TileGrid::from_entities(5, 5, &tiles, &buildings).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::MarketStall, &grid, MapTier::Town, &table).unwrap();
        let floor = blueprint(BuildingKind::MarketStall)
            .base_cost
            .minor()
            .checked_mul(table.resale_floor_pct)
            .and_then(|s| s.checked_div(100))
            .unwrap();
        assert_eq!(v.value.minor(), floor);
        assert!(v.breakdown.iter().any(|e| e.source == "resale_floor"));
    }

    #[test]
    fn corner_treats_off_map_as_empty() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(0, 0, BuildingKind::HotDogStand, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(v.profit, Money::from_minor(300));
    }

    #[test]
    fn markers_evaluate_to_zero() {
        let map_id = MapId::new();
        let tiles = bare_grid(map_id);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[]).unwrap();
        let table = ProfitTable::default();

        let v = evaluate(2, 2, BuildingKind::Demolished, &grid, MapTier::Town, &table).unwrap();
        assert_eq!(v.profit, Money::ZERO);
        assert_eq!(v.value, Money::ZERO);
        assert!(v.breakdown.is_empty());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let map_id = MapId::new();
        let mut tiles = bare_grid(map_id);
        for t in &mut tiles {
            if t.x == 1 && t.y == 1 {
                t.special = Some(SpecialBuilding::Bank);
            }
            if t.x == 3 && t.y == 3 {
                t.terrain = Terrain::Road;
            }
        }
        let owner = GameCompanyId::new();
        let neighbor_tile = tiles.iter().find(|t| t.x == 2 && t.y == 1).unwrap();
        let shop = make_building(neighbor_tile, BuildingKind::Shop, owner);
        let grid = TileGrid::from_entities(5, 5, &tiles, &[shop]).unwrap();
        let table = ProfitTable::default();

        let first = evaluate(2, 2, BuildingKind::BurgerBar, &grid, MapTier::Capital, &table).unwrap();
        let second = evaluate(2, 2, BuildingKind::BurgerBar, &grid, MapTier::Capital, &table).unwrap();
        // Byte-identical output for identical inputs.
        let a = serde_json::to_vec(&first.breakdown).unwrap();
        let b = serde_json::to_vec(&second.breakdown).unwrap();
        assert_eq!(first.profit, second.profit);
        assert_eq!(first.value, second.value);
        assert_eq!(a, b);
    }
}
