//! Enumeration types for the Boomtown game.
//!
//! Terrain, map tiers, the building catalog keys, offensive tricks,
//! moderation verdicts, roles, pages, and transaction kinds.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// The terrain of a single map tile.
///
/// Terrain controls ownability (water and roads can never be bought) and
/// feeds the land-cost formula and the adjacency engine's amenity bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Terrain {
    /// Plain buildable land.
    FreeLand,
    /// Water; unownable, grants an amenity bonus to neighbors.
    Water,
    /// Paved road; unownable, grants an access bonus to neighbors.
    Road,
    /// Unpaved track; ownable at a discount, smaller access bonus.
    DirtTrack,
    /// Wooded land; ownable at a premium, grants an amenity bonus.
    Trees,
}

impl Terrain {
    /// Whether a tile of this terrain can be owned by a game company.
    ///
    /// Water and road tiles are never ownable.
    pub const fn ownable(self) -> bool {
        matches!(self, Self::FreeLand | Self::DirtTrack | Self::Trees)
    }
}

// ---------------------------------------------------------------------------
// Map tier
// ---------------------------------------------------------------------------

/// The tier of a map: determines starting cash, tax rate, and the
/// tier multiplier applied to building profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MapTier {
    /// Entry tier; every new company starts here.
    Town,
    /// Middle tier; unlocked by heroing out of a town.
    City,
    /// Top tier; unlocked by heroing out of a city.
    Capital,
}

impl MapTier {
    /// The tier a hero-out from this tier unlocks, or `None` at the top.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Town => Some(Self::City),
            Self::City => Some(Self::Capital),
            Self::Capital => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Special buildings
// ---------------------------------------------------------------------------

/// A map fixture placed at creation; at most one of each per map.
///
/// Special-building tiles are unownable. Adjacency to them feeds named
/// bonuses in the profit engine; the bank additionally hosts offshore
/// savings and the casino hosts the casino games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SpecialBuilding {
    /// Accepts donations toward the global leaderboard.
    Temple,
    /// Offshore savings deposits and withdrawals.
    Bank,
    /// Anchors detection; idle on the map's police-strike day.
    PoliceStation,
    /// Hosts roulette and blackjack.
    Casino,
}

// ---------------------------------------------------------------------------
// Building catalog keys
// ---------------------------------------------------------------------------

/// A key into the static building catalog.
///
/// `Demolished` and `ClaimStake` are visual-only markers: they occupy a
/// tile's render slot but earn nothing and cannot be constructed through
/// the build action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingKind {
    /// Cheapest food outlet.
    MarketStall,
    /// Entry-level fast food.
    HotDogStand,
    /// Budget hospitality.
    Campsite,
    /// General retail.
    Shop,
    /// Mid-tier fast food.
    BurgerBar,
    /// Roadside hospitality.
    Motel,
    /// Large retail anchor.
    HighStreetStore,
    /// Upmarket food with specialty variants.
    Restaurant,
    /// Top-end hospitality.
    Manor,
    /// Licensed entertainment venue (one per map).
    Casino,
    /// Map fixture; not player-buildable.
    Temple,
    /// Map fixture; not player-buildable.
    Bank,
    /// Map fixture; not player-buildable.
    PoliceStation,
    /// Visual-only rubble marker left by a demolition.
    Demolished,
    /// Visual-only marker staking a bought-but-unbuilt tile.
    ClaimStake,
}

/// Coarse grouping used by the adjacency synergy matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingCategory {
    /// Food and drink outlets.
    Food,
    /// Overnight accommodation.
    Hospitality,
    /// Shops and stores.
    Retail,
    /// Entertainment venues.
    Entertainment,
    /// Civic fixtures (temple, bank, police station).
    Landmark,
    /// Visual-only markers with no economic behavior.
    Marker,
}

/// Sprite sizing class for the dashboard renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VisualClass {
    /// Single-cell footprint sprite.
    Small,
    /// Standard sprite.
    Medium,
    /// Tall sprite.
    Large,
    /// Landmark sprite with custom art.
    Grand,
}

// ---------------------------------------------------------------------------
// Tricks and overlays
// ---------------------------------------------------------------------------

/// A category of offensive action against another company's building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TrickKind {
    /// Broken windows and graffiti; light damage.
    Vandalism,
    /// Sets the target burning; heavy damage that keeps accruing.
    Arson,
    /// Tampered equipment; medium damage.
    Sabotage,
    /// Released vermin; light damage with a visible overlay.
    Infestation,
}

/// A visible overlay drawn on a damaged building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Overlay {
    /// Flames from an arson attack; persists until extinguished.
    Fire,
    /// Debris from sabotage.
    Rubble,
    /// Rats from an infestation.
    Vermin,
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

/// The category of user-supplied text submitted to the moderation gate.
///
/// Name categories demand a definitive verdict before commit; message
/// categories may commit as pending and be reviewed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ModerationCategory {
    /// A game company's display name.
    CompanyName,
    /// A game company's boss name.
    BossName,
    /// A map chat post.
    ChatMessage,
    /// The taunt attached to an attack.
    AttackMessage,
    /// The farewell attached to a hero-out ceremony.
    HeroMessage,
}

impl ModerationCategory {
    /// Whether this category is a name field (blocks on a definitive
    /// verdict; never commits as pending).
    pub const fn is_name(self) -> bool {
        matches!(self, Self::CompanyName | Self::BossName)
    }
}

/// The review state of a committed artifact that passed through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ModerationStatus {
    /// Awaiting an admin decision; the artifact is not yet visible.
    Pending,
    /// Approved; visible.
    Approved,
    /// Rejected; never shown.
    Rejected,
}

// ---------------------------------------------------------------------------
// Roles and pages
// ---------------------------------------------------------------------------

/// A built-in platform role.
///
/// Built-in roles cannot be deleted or renamed. Tenants may additionally
/// define custom roles, which are stored by normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuiltinRole {
    /// Unrestricted across all tenants.
    MasterAdmin,
    /// Full access within the owning tenant.
    Admin,
    /// Restrictive model; read-heavy pages by default.
    Analyst,
    /// Restrictive model; read-only base set.
    Viewer,
    /// Restrictive model; the ordinary player role.
    User,
}

impl BuiltinRole {
    /// The canonical snake-case name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MasterAdmin => "master_admin",
            Self::Admin => "admin",
            Self::Analyst => "analyst",
            Self::Viewer => "viewer",
            Self::User => "user",
        }
    }

    /// Parse a normalized role name into a built-in role, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "master_admin" => Some(Self::MasterAdmin),
            "admin" => Some(Self::Admin),
            "analyst" => Some(Self::Analyst),
            "viewer" => Some(Self::Viewer),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// A page of the product surface that authorization gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Page {
    /// The landing dashboard.
    Dashboard,
    /// The playable map grid.
    GameBoard,
    /// Company and donation leaderboards.
    Rankings,
    /// Peer-to-peer property market.
    Market,
    /// Map-scoped chat.
    Chat,
    /// Tenant analytics and exports.
    Reports,
    /// Profile and two-factor settings.
    Settings,
    /// Tenant user management.
    AdminUsers,
    /// Moderation review queue.
    AdminModeration,
    /// Security audit trail.
    AdminAudit,
    /// Cross-tenant company management (master admin only).
    AdminTenants,
    /// Map creation and terrain tooling (master admin only).
    AdminMaps,
}

impl Page {
    /// Whether the page is reserved for master admins regardless of any
    /// tenant-level grant.
    pub const fn master_only(self) -> bool {
        matches!(self, Self::AdminTenants | Self::AdminMaps)
    }
}

// ---------------------------------------------------------------------------
// Transactions and audit
// ---------------------------------------------------------------------------

/// The kind of an economic transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TransactionKind {
    /// Unowned land bought from the state.
    LandPurchase,
    /// Land liquidated back to the state.
    LandSale,
    /// A building constructed.
    Construction,
    /// A building liquidated to the state.
    BuildingSale,
    /// A peer purchase through the market (buyer side).
    MarketPurchase,
    /// A peer sale through the market (seller side).
    MarketSale,
    /// A building demolished by its owner.
    Demolition,
    /// A building seized from an inactive or ruined owner.
    Takeover,
    /// An offensive trick performed.
    Attack,
    /// A prison fine settled.
    FinePaid,
    /// A security detail hired for a building.
    SecurityPurchase,
    /// A security detail dismissed.
    SecurityRemoval,
    /// Damage repaired on an owned building.
    Repair,
    /// A fire extinguished.
    Extinguish,
    /// An overlay cleaned up.
    Cleanup,
    /// Net earnings credited by the scheduled tick.
    TickEarnings,
    /// The hero-out ceremony; details carry the unlocked tier.
    HeroOut,
    /// A company joined a map.
    LocationJoin,
    /// A company left a map, forfeiting its assets there.
    LocationLeave,
    /// A temple donation.
    Donation,
    /// A casino wager settled (roulette or blackjack).
    CasinoWager,
    /// Cash moved into offshore savings at the bank.
    OffshoreDeposit,
    /// Cash withdrawn from offshore savings.
    OffshoreWithdrawal,
}

/// The kind of a security-relevant audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AuditEventKind {
    /// A failed login attempt.
    LoginFailed,
    /// A successful login.
    LoginSucceeded,
    /// A user's role changed.
    RoleChanged,
    /// A permission override granted or revoked.
    PermissionChanged,
    /// A user archived or deleted by an admin.
    UserArchived,
    /// A tenant deleted by the master admin.
    TenantDeleted,
    /// Two-factor enrollment enabled or disabled.
    TwoFactorChanged,
    /// A session revoked.
    SessionRevoked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_and_road_are_unownable() {
        assert!(!Terrain::Water.ownable());
        assert!(!Terrain::Road.ownable());
        assert!(Terrain::FreeLand.ownable());
        assert!(Terrain::Trees.ownable());
        assert!(Terrain::DirtTrack.ownable());
    }

    #[test]
    fn tier_ladder_tops_out_at_capital() {
        assert_eq!(MapTier::Town.next(), Some(MapTier::City));
        assert_eq!(MapTier::City.next(), Some(MapTier::Capital));
        assert_eq!(MapTier::Capital.next(), None);
    }

    #[test]
    fn builtin_role_names_roundtrip() {
        for role in [
            BuiltinRole::MasterAdmin,
            BuiltinRole::Admin,
            BuiltinRole::Analyst,
            BuiltinRole::Viewer,
            BuiltinRole::User,
        ] {
            assert_eq!(BuiltinRole::from_name(role.as_str()), Some(role));
        }
        assert_eq!(BuiltinRole::from_name("landlord"), None);
    }

    #[test]
    fn name_categories_block_on_verdict() {
        assert!(ModerationCategory::CompanyName.is_name());
        assert!(ModerationCategory::BossName.is_name());
        assert!(!ModerationCategory::ChatMessage.is_name());
        assert!(!ModerationCategory::AttackMessage.is_name());
    }

    #[test]
    fn master_only_pages() {
        assert!(Page::AdminTenants.master_only());
        assert!(Page::AdminMaps.master_only());
        assert!(!Page::AdminUsers.master_only());
        assert!(!Page::GameBoard.master_only());
    }

    #[test]
    fn terrain_serializes_snake_case() {
        let json = serde_json::to_string(&Terrain::FreeLand).unwrap_or_default();
        assert_eq!(json, "\"free_land\"");
    }
}
