//! The static building catalog.
//!
//! [`blueprint`] returns the canonical catalog entry for each
//! [`BuildingKind`]: base cost, base profit, level gate, optional specialty
//! variants, optional per-map license cap, and the sprite class. The
//! catalog is code because it never varies per deployment; the *adjacency
//! coefficients* that modulate these figures are configuration
//! (see [`crate::profit::ProfitTable`]).

use boomtown_types::{BuildingCategory, BuildingKind, Money, VisualClass};

/// A static catalog entry for one building kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    /// The catalog key.
    pub kind: BuildingKind,
    /// Grouping used by the adjacency synergy matrix.
    pub category: BuildingCategory,
    /// Construction cost in minor units.
    pub base_cost: Money,
    /// Profit per tick before adjacency and tier modifiers.
    pub base_profit: Money,
    /// Minimum company level required to build.
    pub level_required: u8,
    /// Specialty variants the builder may choose from; empty if none.
    pub variants: &'static [&'static str],
    /// Per-map license cap; `None` means unlimited.
    pub max_per_map: Option<u32>,
    /// Sprite sizing class for the dashboard.
    pub visual: VisualClass,
    /// Whether players may construct this kind through the build action.
    pub player_buildable: bool,
}

impl Blueprint {
    /// Whether `variant` is a valid choice for this kind.
    ///
    /// A kind with variants requires one of them; a kind without variants
    /// accepts only `None`.
    pub fn accepts_variant(&self, variant: Option<&str>) -> bool {
        match variant {
            None => self.variants.is_empty(),
            Some(v) => self.variants.contains(&v),
        }
    }
}

/// Return the canonical blueprint for a given [`BuildingKind`].
#[allow(clippy::too_many_lines)] // Each kind has unique figures; splitting would obscure the catalog table.
pub const fn blueprint(kind: BuildingKind) -> Blueprint {
    match kind {
        // ---- Player-buildable ladder ----
        BuildingKind::MarketStall => Blueprint {
            kind: BuildingKind::MarketStall,
            category: BuildingCategory::Food,
            base_cost: Money::from_minor(2_500),
            base_profit: Money::from_minor(150),
            level_required: 1,
            variants: &["fruit", "flowers", "fish"],
            max_per_map: None,
            visual: VisualClass::Small,
            player_buildable: true,
        },
        BuildingKind::HotDogStand => Blueprint {
            kind: BuildingKind::HotDogStand,
            category: BuildingCategory::Food,
            base_cost: Money::from_minor(5_000),
            base_profit: Money::from_minor(300),
            level_required: 1,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Small,
            player_buildable: true,
        },
        BuildingKind::Campsite => Blueprint {
            kind: BuildingKind::Campsite,
            category: BuildingCategory::Hospitality,
            base_cost: Money::from_minor(7_500),
            base_profit: Money::from_minor(400),
            level_required: 2,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Small,
            player_buildable: true,
        },
        BuildingKind::Shop => Blueprint {
            kind: BuildingKind::Shop,
            category: BuildingCategory::Retail,
            base_cost: Money::from_minor(12_000),
            base_profit: Money::from_minor(650),
            level_required: 3,
            variants: &["grocer", "butcher", "bakery"],
            max_per_map: None,
            visual: VisualClass::Medium,
            player_buildable: true,
        },
        BuildingKind::BurgerBar => Blueprint {
            kind: BuildingKind::BurgerBar,
            category: BuildingCategory::Food,
            base_cost: Money::from_minor(20_000),
            base_profit: Money::from_minor(1_100),
            level_required: 4,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Medium,
            player_buildable: true,
        },
        BuildingKind::Motel => Blueprint {
            kind: BuildingKind::Motel,
            category: BuildingCategory::Hospitality,
            base_cost: Money::from_minor(35_000),
            base_profit: Money::from_minor(1_800),
            level_required: 5,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Medium,
            player_buildable: true,
        },
        BuildingKind::HighStreetStore => Blueprint {
            kind: BuildingKind::HighStreetStore,
            category: BuildingCategory::Retail,
            base_cost: Money::from_minor(60_000),
            base_profit: Money::from_minor(3_000),
            level_required: 6,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Large,
            player_buildable: true,
        },
        BuildingKind::Restaurant => Blueprint {
            kind: BuildingKind::Restaurant,
            category: BuildingCategory::Food,
            base_cost: Money::from_minor(100_000),
            base_profit: Money::from_minor(5_000),
            level_required: 7,
            variants: &["italian", "cantonese", "steakhouse"],
            max_per_map: None,
            visual: VisualClass::Large,
            player_buildable: true,
        },
        BuildingKind::Manor => Blueprint {
            kind: BuildingKind::Manor,
            category: BuildingCategory::Hospitality,
            base_cost: Money::from_minor(250_000),
            base_profit: Money::from_minor(9_000),
            level_required: 8,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Grand,
            player_buildable: true,
        },
        BuildingKind::Casino => Blueprint {
            kind: BuildingKind::Casino,
            category: BuildingCategory::Entertainment,
            base_cost: Money::from_minor(500_000),
            base_profit: Money::from_minor(20_000),
            level_required: 9,
            variants: &[],
            max_per_map: Some(1),
            visual: VisualClass::Grand,
            player_buildable: true,
        },

        // ---- Map fixtures (placed at map creation) ----
        BuildingKind::Temple => Blueprint {
            kind: BuildingKind::Temple,
            category: BuildingCategory::Landmark,
            base_cost: Money::ZERO,
            base_profit: Money::ZERO,
            level_required: u8::MAX,
            variants: &[],
            max_per_map: Some(1),
            visual: VisualClass::Grand,
            player_buildable: false,
        },
        BuildingKind::Bank => Blueprint {
            kind: BuildingKind::Bank,
            category: BuildingCategory::Landmark,
            base_cost: Money::ZERO,
            base_profit: Money::ZERO,
            level_required: u8::MAX,
            variants: &[],
            max_per_map: Some(1),
            visual: VisualClass::Grand,
            player_buildable: false,
        },
        BuildingKind::PoliceStation => Blueprint {
            kind: BuildingKind::PoliceStation,
            category: BuildingCategory::Landmark,
            base_cost: Money::ZERO,
            base_profit: Money::ZERO,
            level_required: u8::MAX,
            variants: &[],
            max_per_map: Some(1),
            visual: VisualClass::Large,
            player_buildable: false,
        },

        // ---- Visual-only markers ----
        BuildingKind::Demolished => Blueprint {
            kind: BuildingKind::Demolished,
            category: BuildingCategory::Marker,
            base_cost: Money::ZERO,
            base_profit: Money::ZERO,
            level_required: u8::MAX,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Small,
            player_buildable: false,
        },
        BuildingKind::ClaimStake => Blueprint {
            kind: BuildingKind::ClaimStake,
            category: BuildingCategory::Marker,
            base_cost: Money::ZERO,
            base_profit: Money::ZERO,
            level_required: u8::MAX,
            variants: &[],
            max_per_map: None,
            visual: VisualClass::Small,
            player_buildable: false,
        },
    }
}

/// Whether a kind is a visual-only marker with no economic behavior.
pub const fn is_marker(kind: BuildingKind) -> bool {
    matches!(kind, BuildingKind::Demolished | BuildingKind::ClaimStake)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_KINDS: [BuildingKind; 15] = [
        BuildingKind::MarketStall,
        BuildingKind::HotDogStand,
        BuildingKind::Campsite,
        BuildingKind::Shop,
        BuildingKind::BurgerBar,
        BuildingKind::Motel,
        BuildingKind::HighStreetStore,
        BuildingKind::Restaurant,
        BuildingKind::Manor,
        BuildingKind::Casino,
        BuildingKind::Temple,
        BuildingKind::Bank,
        BuildingKind::PoliceStation,
        BuildingKind::Demolished,
        BuildingKind::ClaimStake,
    ];

    #[test]
    fn all_kinds_have_blueprints() {
        for kind in ALL_KINDS {
            let bp = blueprint(kind);
            assert_eq!(bp.kind, kind);
        }
    }

    #[test]
    fn hot_dog_stand_figures() {
        let bp = blueprint(BuildingKind::HotDogStand);
        assert_eq!(bp.base_cost, Money::from_minor(5_000));
        assert_eq!(bp.base_profit, Money::from_minor(300));
        assert_eq!(bp.level_required, 1);
        assert!(bp.variants.is_empty());
    }

    #[test]
    fn casino_is_licensed() {
        let bp = blueprint(BuildingKind::Casino);
        assert_eq!(bp.max_per_map, Some(1));
        assert!(bp.player_buildable);
    }

    #[test]
    fn fixtures_and_markers_are_not_buildable() {
        for kind in [
            BuildingKind::Temple,
            BuildingKind::Bank,
            BuildingKind::PoliceStation,
            BuildingKind::Demolished,
            BuildingKind::ClaimStake,
        ] {
            assert!(!blueprint(kind).player_buildable);
        }
        assert!(is_marker(BuildingKind::Demolished));
        assert!(is_marker(BuildingKind::ClaimStake));
        assert!(!is_marker(BuildingKind::Temple));
    }

    #[test]
    fn buildable_ladder_costs_ascend() {
        let ladder = [
            BuildingKind::MarketStall,
            BuildingKind::HotDogStand,
            BuildingKind::Campsite,
            BuildingKind::Shop,
            BuildingKind::BurgerBar,
            BuildingKind::Motel,
            BuildingKind::HighStreetStore,
            BuildingKind::Restaurant,
            BuildingKind::Manor,
            BuildingKind::Casino,
        ];
        for pair in ladder.windows(2) {
            let (a, b) = (blueprint(pair[0]), blueprint(pair[1]));
            assert!(a.base_cost < b.base_cost, "{:?} >= {:?}", pair[0], pair[1]);
            assert!(a.level_required <= b.level_required);
        }
    }

    #[test]
    fn variant_acceptance() {
        let restaurant = blueprint(BuildingKind::Restaurant);
        assert!(restaurant.accepts_variant(Some("italian")));
        assert!(!restaurant.accepts_variant(None));
        assert!(!restaurant.accepts_variant(Some("sushi")));

        let motel = blueprint(BuildingKind::Motel);
        assert!(motel.accepts_variant(None));
        assert!(!motel.accepts_variant(Some("roadside")));
    }
}
