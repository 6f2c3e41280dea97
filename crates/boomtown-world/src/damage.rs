//! Damage accumulation and decay mechanics.
//!
//! - [`apply_incoming`] filters an attack's base damage through a
//!   security resistance multiplier and adds it to the target.
//! - [`decay_increment`] computes the per-tick decay for a damaged or
//!   burning building: damaged things get worse, burning things worse
//!   still. The curve is monotonically increasing in current damage.

use serde::{Deserialize, Serialize};

use boomtown_types::DamagePercent;

/// Decay parameters, deserialized from the deployment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayTable {
    /// A damaged building gains `max(1, damage / step_divisor)` percent
    /// per tick.
    pub step_divisor: u8,
    /// Flat per-tick decay while burning (used when it exceeds the
    /// damage-proportional rate).
    pub burning_per_tick: u8,
}

impl Default for DecayTable {
    fn default() -> Self {
        Self {
            step_divisor: 20,
            burning_per_tick: 5,
        }
    }
}

/// The per-tick decay increment for a building.
///
/// Healthy, non-burning buildings do not decay. A damaged building gains
/// damage proportional to what it already has; a burning building takes at
/// least the burning rate until extinguished.
pub fn decay_increment(damage: DamagePercent, burning: bool, table: &DecayTable) -> u8 {
    if damage.is_total() {
        return 0;
    }
    let proportional = if damage.value() == 0 {
        0
    } else {
        damage
            .value()
            .checked_div(table.step_divisor.max(1))
            .unwrap_or(0)
            .max(1)
    };
    if burning {
        proportional.max(table.burning_per_tick)
    } else {
        proportional
    }
}

/// Apply incoming attack damage through a security resistance multiplier.
///
/// `resistance_pct` is the share of damage that gets through (100 = no
/// security). Returns the new damage level; the caller observes
/// [`DamagePercent::is_total`] for the collapse transition.
#[must_use]
pub fn apply_incoming(damage: DamagePercent, base_damage: u8, resistance_pct: u8) -> DamagePercent {
    let through = u16::from(base_damage)
        .checked_mul(u16::from(resistance_pct.min(100)))
        .map_or(0, |scaled| scaled.checked_div(100).unwrap_or(0));
    let through = u8::try_from(through).unwrap_or(u8::MAX);
    damage.plus(through)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_buildings_do_not_decay() {
        let table = DecayTable::default();
        assert_eq!(decay_increment(DamagePercent::ZERO, false, &table), 0);
    }

    #[test]
    fn decay_grows_with_damage() {
        let table = DecayTable::default();
        let light = decay_increment(DamagePercent::new(10), false, &table);
        let heavy = decay_increment(DamagePercent::new(80), false, &table);
        assert_eq!(light, 1);
        assert_eq!(heavy, 4);
        assert!(heavy > light);
    }

    #[test]
    fn burning_overrides_slow_decay() {
        let table = DecayTable::default();
        assert_eq!(decay_increment(DamagePercent::new(10), true, &table), 5);
        // Heavily damaged and burning: the larger of the two rates.
        assert_eq!(decay_increment(DamagePercent::new(100), true, &table), 0);
        assert_eq!(decay_increment(DamagePercent::new(99), true, &table), 5);
    }

    #[test]
    fn collapsed_buildings_stop_decaying() {
        let table = DecayTable::default();
        assert_eq!(decay_increment(DamagePercent::TOTAL, false, &table), 0);
        assert_eq!(decay_increment(DamagePercent::TOTAL, true, &table), 0);
    }

    #[test]
    fn security_dampens_incoming_damage() {
        // No security: full damage through.
        assert_eq!(apply_incoming(DamagePercent::ZERO, 40, 100).value(), 40);
        // Level-2 security: half through.
        assert_eq!(apply_incoming(DamagePercent::ZERO, 40, 50).value(), 20);
        // Level-3 security: a quarter through.
        assert_eq!(apply_incoming(DamagePercent::ZERO, 40, 25).value(), 10);
    }

    #[test]
    fn exactly_one_hundred_collapses() {
        let result = apply_incoming(DamagePercent::new(70), 40, 100);
        assert!(result.is_total());
        let shy = apply_incoming(DamagePercent::new(70), 29, 100);
        assert!(!shy.is_total());
        assert_eq!(shy.value(), 99);
    }
}
