//! The attack/security engine: dirty tricks, detection, prison, fines.
//!
//! Flow for one trick: verify attacker and target, consume the cost, roll
//! detection (skipped on the map's police-strike day), filter the damage
//! through any security layer, transition the target's state machine
//! (`healthy -> damaged -> burning -> collapsed`), set the visible
//! overlay, and record the attack with its moderated message.
//!
//! Detection does not stop the attack -- the damage lands and the
//! attacker goes to prison with a fine proportional to the trick's
//! severity. Every further action is blocked until [`pay_fine`].

use chrono::Utc;

use boomtown_ledger::{TransactionBuilder, debit};
use boomtown_types::{
    Attack, AttackId, BuildingInstance, BuildingSecurity, GameCompany, GameError, GameMap,
    ModerationStatus, Money, Overlay, TransactionKind, TransactionRecord, TrickKind,
};
use boomtown_world::{apply_incoming, dirty_set};

use crate::actions::validation::{ensure_funds, ensure_not_imprisoned, ensure_on_map};
use crate::config::GameTables;
use crate::progression::register_action;
use crate::rng::GameRng;

/// Parameters for [`perform_trick`].
#[derive(Debug)]
pub struct TrickParamsIn<'a> {
    /// The map both parties are on.
    pub map: &'a GameMap,
    /// The tile coordinates of the target building.
    pub target_coords: (u32, u32),
    /// The target building, loaded under a row lock.
    pub target: BuildingInstance,
    /// The target's security layer, if installed.
    pub security: Option<BuildingSecurity>,
    /// The trick to perform.
    pub trick: TrickKind,
    /// The attacker's taunt, already routed through the moderation gate.
    pub message: Option<String>,
    /// The gate's verdict for the taunt.
    pub message_status: ModerationStatus,
    /// The current tick boundary.
    pub current_tick: i64,
    /// The tick of the attacker's last use of this trick, if any.
    pub last_same_trick_tick: Option<i64>,
    /// Today's UTC weekday, 0 = Monday (police-strike comparison).
    pub weekday: u8,
}

/// Outcome of one trick.
#[derive(Debug, Clone)]
pub struct AttackOutcome {
    /// The attacker: cost consumed, possibly imprisoned and fined.
    pub attacker: GameCompany,
    /// The target building after damage and overlays.
    pub building: BuildingInstance,
    /// The attack record (message visibility tracks its moderation).
    pub attack: Attack,
    /// The audit record.
    pub transaction: TransactionRecord,
    /// Coordinates to dirty-mark; non-empty only when the target
    /// collapsed (collapse changes what occupies the tile).
    pub dirty: Vec<(u32, u32)>,
    /// The new level, if the action crossed a threshold.
    pub level_up: Option<u8>,
}

/// Perform one dirty trick against a competitor's building.
#[allow(clippy::too_many_lines)]
pub fn perform_trick(
    attacker: GameCompany,
    params: TrickParamsIn<'_>,
    tables: &GameTables,
    rng: &mut GameRng,
) -> Result<AttackOutcome, GameError> {
    ensure_not_imprisoned(&attacker)?;
    ensure_on_map(&attacker, params.map)?;
    if params.target.map_id != params.map.id {
        return Err(GameError::not_found("target is not on this map"));
    }
    if params.target.owner == attacker.id {
        return Err(GameError::precondition("cannot attack your own building"));
    }
    if boomtown_world::is_marker(params.target.kind) {
        return Err(GameError::precondition("nothing there to attack"));
    }

    let trick = tables.tricks.params(params.trick);
    if let Some(last) = params.last_same_trick_tick {
        let elapsed = params.current_tick.saturating_sub(last);
        if elapsed < i64::from(trick.cooldown_ticks) {
            return Err(GameError::precondition("trick is still cooling down"));
        }
    }
    ensure_funds(&attacker, trick.cost)?;

    let mut attacker = attacker;
    attacker.cash = debit(attacker.cash, trick.cost).map_err(|e| GameError::internal(e.to_string()))?;

    // Detection: skipped on the map's police-strike day. A detected
    // attacker goes straight to prison with a severity-scaled fine, but
    // the trick itself still lands.
    let police_on_strike = params.weekday == params.map.police_strike_day;
    let detected = !police_on_strike && rng.roll_pct(trick.detection_pct);
    if detected {
        let fine = tables
            .tricks
            .fine_per_damage_point
            .minor()
            .checked_mul(i64::from(trick.base_damage))
            .map(Money::from_minor)
            .ok_or_else(|| GameError::internal("fine overflow"))?;
        attacker.in_prison = true;
        attacker.fine = fine;
        tracing::info!(attacker = %attacker.id, fine = %fine, "attacker detected and imprisoned");
    }

    // Damage, filtered through security. A collapsed target takes no
    // further damage; the message may still be posted.
    let mut building = params.target;
    let mut dirty = Vec::new();
    let mut damage_dealt = 0u8;
    if !building.collapsed {
        let resistance = params.security.map_or(100, |s| s.resistance_pct);
        let before = building.damage;
        building.damage = apply_incoming(building.damage, trick.base_damage, resistance);
        damage_dealt = building.damage.value().saturating_sub(before.value());

        if params.trick == TrickKind::Arson {
            building.burning = true;
        }
        match overlay_for(params.trick) {
            Some(Overlay::Fire) => building.overlay = Some(Overlay::Fire),
            Some(overlay) if building.overlay.is_none() => building.overlay = Some(overlay),
            _ => {}
        }

        if building.damage.is_total() {
            building.collapsed = true;
            building.needs_profit_recalc = true;
            dirty = dirty_set(
                params.target_coords.0,
                params.target_coords.1,
                params.map.width,
                params.map.height,
            );
            tracing::info!(building = %building.id, "building collapsed");
        }
    }

    let level_up = register_action(&mut attacker, &tables.levels);

    let attack = Attack {
        id: AttackId::new(),
        attacker: attacker.id,
        target_building: building.id,
        trick: params.trick,
        message: params.message,
        moderation_status: params.message_status,
        detected,
        damage_dealt,
        created_at: Utc::now(),
    };

    let transaction = TransactionBuilder::new(TransactionKind::Attack, attacker.id)
        .map(params.map.id)
        .building(building.id)
        .amount(Money::from_minor(trick.cost.minor().saturating_neg()))
        .detail("trick", format!("{:?}", params.trick))
        .detail("detected", detected)
        .detail("damage_dealt", i64::from(damage_dealt))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    Ok(AttackOutcome {
        attacker,
        building,
        attack,
        transaction,
        dirty,
        level_up,
    })
}

/// Outcome of settling a prison fine.
#[derive(Debug, Clone)]
pub struct PayFineOutcome {
    /// The company, released with the fine cleared.
    pub company: GameCompany,
    /// The audit record.
    pub transaction: TransactionRecord,
}

/// Pay an outstanding prison fine, restoring action rights.
///
/// This is the one operation an imprisoned company may perform. The fine
/// must be paid in full.
pub fn pay_fine(company: GameCompany, tables: &GameTables) -> Result<PayFineOutcome, GameError> {
    if !company.in_prison {
        return Err(GameError::precondition("not in prison"));
    }
    if company.fine.minor() <= 0 {
        return Err(GameError::internal("imprisoned with no fine on record"));
    }
    ensure_funds(&company, company.fine)?;

    let fine = company.fine;
    let mut company = company;
    company.cash = debit(company.cash, fine).map_err(|e| GameError::internal(e.to_string()))?;
    company.in_prison = false;
    company.fine = Money::ZERO;
    let _ = register_action(&mut company, &tables.levels);

    let transaction = TransactionBuilder::new(TransactionKind::FinePaid, company.id)
        .amount(Money::from_minor(fine.minor().saturating_neg()))
        .build()
        .map_err(|e| GameError::internal(e.to_string()))?;

    tracing::info!(company = %company.id, fine = %fine, "fine paid, released from prison");

    Ok(PayFineOutcome {
        company,
        transaction,
    })
}

/// The visible overlay a trick leaves, if any.
const fn overlay_for(trick: TrickKind) -> Option<Overlay> {
    match trick {
        TrickKind::Arson => Some(Overlay::Fire),
        TrickKind::Sabotage => Some(Overlay::Rubble),
        TrickKind::Infestation => Some(Overlay::Vermin),
        TrickKind::Vandalism => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boomtown_types::{
        BuildingId, BuildingKind, DamagePercent, GameCompanyId, HeroThresholds, MapId, MapTier,
        TileId, UserId,
    };
    use chrono::Utc;

    use super::*;

    fn make_map() -> GameMap {
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

    fn make_attacker(map: &GameMap) -> GameCompany {
        GameCompany {
            id: GameCompanyId::new(),
            user_id: UserId::new(),
            name: String::from("Rival Corp"),
            boss_name: String::from("B. Rival"),
            cash: Money::from_minor(10_000),
            offshore: Money::ZERO,
            level: 3,
            total_actions: 40,
            ticks_since_action: 2,
            in_prison: false,
            fine: Money::ZERO,
            land_streak: 0,
            map_id: Some(map.id),
            tier_joined: Some(MapTier::Town),
            hero_unlocks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn make_target(map: &GameMap, damage: u8) -> BuildingInstance {
        BuildingInstance {
            id: BuildingId::new(),
            tile_id: TileId::new(),
            map_id: map.id,
            kind: BuildingKind::Shop,
            owner: GameCompanyId::new(),
            variant: Some(String::from("grocer")),
            calculated_profit: Money::from_minor(650),
            calculated_value: Money::from_minor(12_000),
            breakdown: Vec::new(),
            damage: DamagePercent::new(damage),
            collapsed: false,
            burning: false,
            overlay: None,
            needs_profit_recalc: false,
            last_tick_applied: 0,
            created_at: Utc::now(),
        }
    }

    fn base_params<'a>(map: &'a GameMap, target: BuildingInstance) -> TrickParamsIn<'a> {
        TrickParamsIn {
            map,
            target_coords: (4, 4),
            target,
            security: None,
            trick: TrickKind::Arson,
            message: Some(String::from("smell the smoke")),
            message_status: ModerationStatus::Pending,
            current_tick: 100,
            last_same_trick_tick: None,
            weekday: 0,
        }
    }

    /// A seed whose first 30% roll does not fire (for undetected paths).
    fn quiet_rng() -> GameRng {
        for seed in 0..64 {
            let mut probe = GameRng::from_seed(seed);
            if !probe.roll_pct(30) {
                return GameRng::from_seed(seed);
            }
        }
        GameRng::from_seed(0)
    }

    /// A seed whose first 30% roll fires (for detected paths).
    fn loud_rng() -> (GameRng, bool) {
        for seed in 0..64 {
            let mut probe = GameRng::from_seed(seed);
            if probe.roll_pct(30) {
                return (GameRng::from_seed(seed), true);
            }
        }
        (GameRng::from_seed(0), false)
    }

    #[test]
    fn arson_at_seventy_collapses_and_burns() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 70);
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let outcome =
            perform_trick(attacker, base_params(&map, target), &tables, &mut rng).unwrap();

        assert_eq!(outcome.attacker.cash, Money::from_minor(8_000));
        assert!(outcome.building.damage.is_total());
        assert!(outcome.building.collapsed);
        assert!(outcome.building.burning);
        assert_eq!(outcome.building.overlay, Some(Overlay::Fire));
        assert_eq!(outcome.attack.moderation_status, ModerationStatus::Pending);
        assert!(!outcome.dirty.is_empty());
        assert_eq!(outcome.attack.damage_dealt, 30);
    }

    #[test]
    fn ninety_nine_percent_does_not_collapse() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 59);
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let outcome =
            perform_trick(attacker, base_params(&map, target), &tables, &mut rng).unwrap();
        assert_eq!(outcome.building.damage.value(), 99);
        assert!(!outcome.building.collapsed);
        assert!(outcome.dirty.is_empty());
    }

    #[test]
    fn security_dampens_the_trick() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 0);
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let mut params = base_params(&map, target);
        params.security = Some(BuildingSecurity {
            level: 2,
            upkeep: Money::from_minor(120),
            resistance_pct: 50,
        });
        let outcome = perform_trick(attacker, params, &tables, &mut rng).unwrap();
        assert_eq!(outcome.building.damage.value(), 20); // 40 halved
    }

    #[test]
    fn detection_imprisons_with_severity_fine() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 0);
        let tables = GameTables::default();
        let (mut rng, found) = loud_rng();
        assert!(found, "no seed fired within 64 tries");

        let outcome =
            perform_trick(attacker, base_params(&map, target), &tables, &mut rng).unwrap();
        assert!(outcome.attacker.in_prison);
        // Arson severity 40 x 250/point.
        assert_eq!(outcome.attacker.fine, Money::from_minor(10_000));
        assert!(outcome.attack.detected);
    }

    #[test]
    fn police_strike_day_skips_detection() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 0);
        let tables = GameTables::default();
        let (mut rng, found) = loud_rng();
        assert!(found);

        let mut params = base_params(&map, target);
        params.weekday = map.police_strike_day;
        let outcome = perform_trick(attacker, params, &tables, &mut rng).unwrap();
        assert!(!outcome.attacker.in_prison);
        assert!(!outcome.attack.detected);
    }

    #[test]
    fn cooldown_blocks_repeat_tricks() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let target = make_target(&map, 0);
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let mut params = base_params(&map, target);
        params.last_same_trick_tick = Some(95); // arson cooldown is 12 ticks
        let err = perform_trick(attacker, params, &tables, &mut rng).unwrap_err();
        assert_eq!(err.message, "trick is still cooling down");
    }

    #[test]
    fn own_building_cannot_be_attacked() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let mut target = make_target(&map, 0);
        target.owner = attacker.id;
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let err =
            perform_trick(attacker, base_params(&map, target), &tables, &mut rng).unwrap_err();
        assert_eq!(err.message, "cannot attack your own building");
    }

    #[test]
    fn collapsed_target_takes_no_further_damage_but_message_posts() {
        let map = make_map();
        let attacker = make_attacker(&map);
        let mut target = make_target(&map, 100);
        target.collapsed = true;
        target.damage = DamagePercent::TOTAL;
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let outcome =
            perform_trick(attacker, base_params(&map, target), &tables, &mut rng).unwrap();
        assert_eq!(outcome.attack.damage_dealt, 0);
        assert!(outcome.attack.message.is_some());
        assert!(outcome.dirty.is_empty());
    }

    #[test]
    fn prison_blocks_until_fine_paid() {
        let map = make_map();
        let mut prisoner = make_attacker(&map);
        prisoner.in_prison = true;
        prisoner.fine = Money::from_minor(10_000);
        let tables = GameTables::default();
        let mut rng = quiet_rng();

        let target = make_target(&map, 0);
        let err = perform_trick(prisoner.clone(), base_params(&map, target), &tables, &mut rng)
            .unwrap_err();
        assert_eq!(err.message, "in prison");

        let released = pay_fine(prisoner, &tables).unwrap();
        assert!(!released.company.in_prison);
        assert_eq!(released.company.fine, Money::ZERO);
        assert_eq!(released.company.cash, Money::ZERO);
    }

    #[test]
    fn pay_fine_requires_full_amount() {
        let map = make_map();
        let mut prisoner = make_attacker(&map);
        prisoner.in_prison = true;
        prisoner.fine = Money::from_minor(20_000);
        prisoner.cash = Money::from_minor(19_999);
        let tables = GameTables::default();

        let err = pay_fine(prisoner, &tables).unwrap_err();
        assert_eq!(err.message, "insufficient cash");
    }
}
