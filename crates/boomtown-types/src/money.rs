//! Fixed-point scalar wrappers: [`Money`] and [`DamagePercent`].
//!
//! All monetary values in the game are integer minor units; all damage is
//! integer percent in `0..=100`. Both wrappers expose only checked or
//! clamping arithmetic so balances can never silently overflow.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A monetary amount in integer minor units.
///
/// Negative balances are representable (a company may owe upkeep) but every
/// mutation goes through checked arithmetic; the ledger layer enforces the
/// configured overdraft floor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Money(pub i64);

impl Money {
    /// Zero minor units.
    pub const ZERO: Self = Self(0);

    /// Construct from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// The raw minor-unit value.
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Checked addition.
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction.
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by an integer percentage, truncating toward
    /// zero. `amount.percent(60)` is 60% of the amount.
    pub const fn percent(self, pct: i64) -> Option<Self> {
        match self.0.checked_mul(pct) {
            Some(scaled) => match scaled.checked_div(100) {
                Some(v) => Some(Self(v)),
                None => None,
            },
            None => None,
        }
    }

    /// Whether the amount covers `cost` (both in minor units).
    pub const fn covers(self, cost: Self) -> bool {
        self.0 >= cost.0
    }

    /// Whether the amount is strictly negative.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// DamagePercent
// ---------------------------------------------------------------------------

/// Integer building damage in percent, clamped to `0..=100`.
///
/// 100 means the building has collapsed; the collapse transition is driven
/// by callers observing [`DamagePercent::is_total`] after a mutation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct DamagePercent(u8);

impl DamagePercent {
    /// No damage.
    pub const ZERO: Self = Self(0);

    /// Full damage (collapsed).
    pub const TOTAL: Self = Self(100);

    /// Construct from a raw percent, clamping to `0..=100`.
    pub const fn new(pct: u8) -> Self {
        if pct > 100 { Self(100) } else { Self(pct) }
    }

    /// The raw percent value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Add damage, clamping at 100.
    #[must_use]
    pub const fn plus(self, pct: u8) -> Self {
        Self::new(self.0.saturating_add(pct))
    }

    /// Remove damage, clamping at 0.
    #[must_use]
    pub const fn minus(self, pct: u8) -> Self {
        Self(self.0.saturating_sub(pct))
    }

    /// Whether the building has reached full damage.
    pub const fn is_total(self) -> bool {
        self.0 >= 100
    }

    /// The earning fraction that survives this damage, as an integer
    /// percentage (`100 - damage`).
    pub const fn earning_pct(self) -> u8 {
        100u8.saturating_sub(self.0)
    }
}

impl core::fmt::Display for DamagePercent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
