//! The tick processor: the scheduled global advance of one map.
//!
//! Per invocation, for every active map, the passes run in this order:
//!
//! 1. **Recalculation** -- re-evaluate every building flagged
//!    `needs_profit_recalc` against a snapshot taken at tick start, then
//!    clear the flag.
//! 2. **Earnings** -- credit each owner with
//!    `profit x (1 - damage/100) - security upkeep`, taxing the positive
//!    portion at the map tier's rate. Loss-making buildings still charge
//!    their upkeep, down to the overdraft floor.
//! 3. **Decay** -- damaged buildings get worse; burning ones faster.
//! 4. **Collapse** -- anything reaching 100% damage collapses and its
//!    neighborhood is dirty-marked.
//! 5. **Inactivity** -- advance every company's `ticks_since_action`.
//! 6. **Hero eligibility** -- compute which companies now clear all
//!    three hero-out thresholds (eligibility never auto-promotes).
//! 7. **Statistics** -- one totals row per (company, map).
//!
//! Idempotence: the map carries a `last_tick_applied` marker and every
//! building carries its own. [`run_map_tick`] for a boundary that was
//! already applied returns a no-op outcome; a crash mid-invocation leaves
//! some maps advanced and some not, and the next invocation resumes from
//! the first unadvanced map. Writes from earlier passes are visible to
//! later passes; all recalculation reads come from the tick-start
//! snapshot.

use std::collections::BTreeMap;

use boomtown_game::GameTables;
use boomtown_ledger::{TransactionBuilder, credit, debit_to_floor};
use boomtown_types::{
    BuildingId, BuildingInstance, BuildingSecurity, CompanyStatistics, GameCompany, GameCompanyId,
    GameMap, MapId, Money, Tile, TransactionKind, TransactionRecord,
};
use boomtown_world::{DecayTable, ProfitTable, TileGrid, decay_increment, evaluate, neighborhood};
use chrono::Utc;
use tracing::{debug, info};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A world computation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: boomtown_world::WorldError,
    },

    /// A cash movement failed.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: boomtown_ledger::LedgerError,
    },

    /// A building references a tile absent from the loaded state.
    #[error("building {building} references an unknown tile")]
    OrphanBuilding {
        /// The offending building.
        building: BuildingId,
    },
}

/// Everything the processor needs for one map, loaded by the data layer
/// inside the per-map transaction.
#[derive(Debug, Clone)]
pub struct MapTickState {
    /// The map under advance.
    pub map: GameMap,
    /// The last tick boundary applied to this map.
    pub last_tick_applied: i64,
    /// All tiles of the map.
    pub tiles: Vec<Tile>,
    /// All building instances on the map (collapsed ones included).
    pub buildings: Vec<BuildingInstance>,
    /// Security layers keyed by building.
    pub securities: BTreeMap<BuildingId, BuildingSecurity>,
    /// Every company currently on the map.
    pub companies: BTreeMap<GameCompanyId, GameCompany>,
}

/// Aggregate figures for one tick of one map.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    /// Buildings re-evaluated by the recalculation pass.
    pub recalculated: u32,
    /// Buildings that collapsed this tick.
    pub collapsed: u32,
    /// Companies that crossed the inactivity threshold this tick.
    pub newly_inactive: u32,
    /// Companies clearing all three hero-out thresholds.
    pub hero_eligible: Vec<GameCompanyId>,
}

/// The writes produced by one map's tick.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The boundary that was processed.
    pub tick: i64,
    /// The map.
    pub map_id: MapId,
    /// `false` when the boundary was already applied (no-op rerun).
    pub applied: bool,
    /// The map-level marker to persist.
    pub map_last_tick: i64,
    /// Every building on the map after the tick.
    pub buildings: Vec<BuildingInstance>,
    /// Every company on the map after the tick.
    pub companies: Vec<GameCompany>,
    /// Earnings records, one per company with non-zero net income.
    pub transactions: Vec<TransactionRecord>,
    /// One statistics row per company on the map.
    pub statistics: Vec<CompanyStatistics>,
    /// Aggregate figures.
    pub summary: TickSummary,
}

/// Shared read-only inputs for a tick run.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Adjacency coefficients for the recalculation pass.
    pub profit_table: &'a ProfitTable,
    /// Decay parameters.
    pub decay: &'a DecayTable,
    /// Game-rule tables (taxes, floors, thresholds).
    pub tables: &'a GameTables,
}

/// Run one tick for one map.
///
/// Pure over the loaded state: the caller persists the outcome (or rolls
/// the whole map back) in its own transaction, under the map's advisory
/// lock.
#[allow(clippy::too_many_lines)]
pub fn run_map_tick(
    state: MapTickState,
    tick: i64,
    ctx: TickContext<'_>,
) -> Result<TickOutcome, TickError> {
    // Idempotence: a boundary already applied is a no-op.
    if state.last_tick_applied >= tick {
        debug!(map = %state.map.id, tick, "tick already applied, skipping");
        return Ok(TickOutcome {
            tick,
            map_id: state.map.id,
            applied: false,
            map_last_tick: state.last_tick_applied,
            buildings: Vec::new(),
            companies: Vec::new(),
            transactions: Vec::new(),
            statistics: Vec::new(),
            summary: TickSummary::default(),
        });
    }

    let map = state.map;
    let mut buildings = state.buildings;
    let mut companies = state.companies;
    let mut summary = TickSummary::default();

    let coords: BTreeMap<_, _> = state.tiles.iter().map(|t| (t.id, (t.x, t.y))).collect();

    // --- Pass 1: Recalculation (reads the tick-start snapshot) ---
    let snapshot = TileGrid::from_entities(map.width, map.height, &state.tiles, &buildings)?;
    for building in &mut buildings {
        if !building.needs_profit_recalc || boomtown_world::is_marker(building.kind) {
            building.needs_profit_recalc = false;
            continue;
        }
        let &(x, y) = coords
            .get(&building.tile_id)
            .ok_or(TickError::OrphanBuilding {
                building: building.id,
            })?;
        let valuation = evaluate(x, y, building.kind, &snapshot, map.tier, ctx.profit_table)?;
        building.calculated_profit = valuation.profit;
        building.calculated_value = valuation.value;
        building.breakdown = valuation.breakdown;
        building.needs_profit_recalc = false;
        summary.recalculated = summary.recalculated.saturating_add(1);
    }

    // --- Pass 2: Earnings ---
    let tax_pct = ctx.tables.economy.tax_for(map.tier);
    let floor = ctx.tables.economy.overdraft_floor;
    let mut income: BTreeMap<GameCompanyId, i64> = BTreeMap::new();
    for building in &buildings {
        if building.last_tick_applied >= tick
            || building.collapsed
            || boomtown_world::is_marker(building.kind)
        {
            continue;
        }
        let Some(company) = companies.get_mut(&building.owner) else {
            continue; // Owner left the map; the tile earns nothing.
        };

        let gross = building
            .calculated_profit
            .percent(i64::from(building.damage.earning_pct()))
            .ok_or(boomtown_ledger::LedgerError::ArithmeticOverflow)?;
        let upkeep = state
            .securities
            .get(&building.id)
            .map_or(Money::ZERO, |s| s.upkeep);
        let net = gross
            .checked_sub(upkeep)
            .ok_or(boomtown_ledger::LedgerError::ArithmeticOverflow)?;

        if net.minor() > 0 {
            let taxed = net
                .percent(100i64.saturating_sub(tax_pct))
                .ok_or(boomtown_ledger::LedgerError::ArithmeticOverflow)?;
            if taxed.minor() > 0 {
                company.cash = credit(company.cash, taxed)?;
                record_income(&mut income, building.owner, taxed.minor());
            }
        } else if net.minor() < 0 {
            let owed = Money::from_minor(net.minor().saturating_neg());
            let before = company.cash;
            company.cash = debit_to_floor(company.cash, owed, floor)?;
            let absorbed = before.minor().saturating_sub(company.cash.minor());
            record_income(&mut income, building.owner, absorbed.saturating_neg());
        }
    }

    // --- Pass 3: Decay ---
    for building in &mut buildings {
        if building.last_tick_applied >= tick
            || building.collapsed
            || boomtown_world::is_marker(building.kind)
        {
            continue;
        }
        let increment = decay_increment(building.damage, building.burning, ctx.decay);
        if increment > 0 {
            building.damage = building.damage.plus(increment);
        }
    }

    // --- Pass 4: Collapse ---
    let mut dirty_coords: Vec<(u32, u32)> = Vec::new();
    for building in &mut buildings {
        if building.collapsed || boomtown_world::is_marker(building.kind) {
            continue;
        }
        if building.damage.is_total() {
            building.collapsed = true;
            building.needs_profit_recalc = true;
            summary.collapsed = summary.collapsed.saturating_add(1);
            if let Some(&(x, y)) = coords.get(&building.tile_id) {
                dirty_coords.push((x, y));
            }
            info!(map = %map.id, building = %building.id, tick, "building collapsed");
        }
    }
    if !dirty_coords.is_empty() {
        mark_neighborhoods_dirty(&mut buildings, &coords, &dirty_coords, map.width, map.height);
    }

    // Both earnings and decay are now applied for this boundary.
    for building in &mut buildings {
        building.last_tick_applied = tick;
    }

    // --- Pass 5: Inactivity ---
    let inactivity = ctx.tables.economy.inactivity_threshold_ticks;
    for company in companies.values_mut() {
        company.ticks_since_action = company.ticks_since_action.saturating_add(1);
        if company.ticks_since_action == inactivity {
            summary.newly_inactive = summary.newly_inactive.saturating_add(1);
            info!(map = %map.id, company = %company.id, "company turned inactive");
        }
    }

    // --- Pass 6: Hero eligibility ---
    let total_tiles = map.tile_count().max(1);
    let mut standings: BTreeMap<GameCompanyId, (Money, u32, u32)> = BTreeMap::new();
    for company in companies.values() {
        let worth = company
            .cash
            .checked_add(company.offshore)
            .ok_or(boomtown_ledger::LedgerError::ArithmeticOverflow)?;
        standings.insert(company.id, (worth, 0, 0));
    }
    for building in &buildings {
        if building.collapsed || boomtown_world::is_marker(building.kind) {
            continue;
        }
        if let Some((worth, count, _)) = standings.get_mut(&building.owner) {
            *worth = worth
                .checked_add(building.calculated_value)
                .ok_or(boomtown_ledger::LedgerError::ArithmeticOverflow)?;
            *count = count.saturating_add(1);
        }
    }
    for tile in &state.tiles {
        if let Some(owner) = tile.owner {
            if let Some((_, _, tiles_owned)) = standings.get_mut(&owner) {
                *tiles_owned = tiles_owned.saturating_add(1);
            }
        }
    }

    for company in companies.values() {
        let Some(&(net_worth, _, tiles_owned)) = standings.get(&company.id) else {
            continue;
        };
        let land_permille = permille(u64::from(tiles_owned), total_tiles);
        let thresholds = map.hero_thresholds;
        let active = company.ticks_since_action < inactivity;
        let next_open = map
            .tier
            .next()
            .is_some_and(|next| !company.hero_unlocks.contains(&next));
        if active
            && next_open
            && net_worth >= thresholds.net_worth
            && company.cash >= thresholds.cash
            && land_permille >= thresholds.land_permille
        {
            summary.hero_eligible.push(company.id);
        }
    }

    // --- Pass 7: Statistics snapshot ---
    let now = Utc::now();
    let mut statistics = Vec::with_capacity(companies.len());
    for company in companies.values() {
        let (net_worth, building_count, tiles_owned) = standings
            .get(&company.id)
            .copied()
            .unwrap_or((company.cash, 0, 0));
        let damage_total = buildings
            .iter()
            .filter(|b| b.owner == company.id && !boomtown_world::is_marker(b.kind))
            .fold(0u32, |acc, b| acc.saturating_add(u32::from(b.damage.value())));
        statistics.push(CompanyStatistics {
            company: company.id,
            map_id: map.id,
            tick,
            net_worth,
            cash: company.cash,
            buildings: building_count,
            tiles: tiles_owned,
            land_permille: permille(u64::from(tiles_owned), total_tiles),
            income: Money::from_minor(income.get(&company.id).copied().unwrap_or(0)),
            damage_total,
            updated_at: now,
        });
    }

    // Earnings records.
    let mut transactions = Vec::new();
    for (&company_id, &net) in &income {
        if net == 0 {
            continue;
        }
        let record = TransactionBuilder::new(TransactionKind::TickEarnings, company_id)
            .map(map.id)
            .amount(Money::from_minor(net))
            .detail("tick", tick)
            .build()
            .map_err(TickError::from)?;
        transactions.push(record);
    }

    info!(
        map = %map.id,
        tick,
        recalculated = summary.recalculated,
        collapsed = summary.collapsed,
        companies = companies.len(),
        "map tick applied"
    );

    Ok(TickOutcome {
        tick,
        map_id: map.id,
        applied: true,
        map_last_tick: tick,
        buildings,
        companies: companies.into_values().collect(),
        transactions,
        statistics,
        summary,
    })
}

/// Accumulate signed income for one company.
fn record_income(income: &mut BTreeMap<GameCompanyId, i64>, company: GameCompanyId, delta: i64) {
    let entry = income.entry(company).or_insert(0);
    *entry = entry.saturating_add(delta);
}

/// Owned tiles as a per-mille share of the map.
fn permille(owned: u64, total: u64) -> u16 {
    let scaled = owned.saturating_mul(1000).checked_div(total).unwrap_or(0);
    u16::try_from(scaled).unwrap_or(u16::MAX)
}

/// Set `needs_profit_recalc` on every building in the neighborhood of
/// each changed coordinate.
fn mark_neighborhoods_dirty(
    buildings: &mut [BuildingInstance],
    coords: &BTreeMap<boomtown_types::TileId, (u32, u32)>,
    changed: &[(u32, u32)],
    width: u32,
    height: u32,
) {
    let mut dirty: Vec<(u32, u32)> = Vec::new();
    for &(x, y) in changed {
        dirty.push((x, y));
        dirty.extend(neighborhood(x, y, width, height));
    }
    for building in buildings.iter_mut() {
        if boomtown_world::is_marker(building.kind) {
            continue;
        }
        if let Some(xy) = coords.get(&building.tile_id) {
            if dirty.contains(xy) {
                building.needs_profit_recalc = true;
            }
        }
    }
}
