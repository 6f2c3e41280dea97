//! Core entity structs for the Boomtown game.
//!
//! These are the domain objects shared across crates. Database row types
//! live in `boomtown-db`; request/response payloads live with the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AuditEventKind, BuildingKind, MapTier, ModerationStatus, Overlay, Page, SpecialBuilding,
    Terrain, TransactionKind, TrickKind,
};
use crate::ids::{
    AttackId, AuditEntryId, BuildingId, ChatMessageId, CustomRoleId, GameCompanyId, ListingId,
    MapId, SessionId, TenantId, TileId, TransactionId, UserId,
};
use crate::money::{DamagePercent, Money};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A role name: either a built-in role or a tenant-scoped custom role.
///
/// Stored normalized (lowercased, non-alphanumerics stripped except
/// underscores). Use [`RoleName::normalize`] before persisting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct RoleName(pub String);

impl RoleName {
    /// Normalize a raw role name: lowercase, keep only `[a-z0-9_]`.
    pub fn normalize(raw: &str) -> Self {
        let cleaned: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        Self(cleaned)
    }

    /// The built-in role this name denotes, if any.
    pub fn builtin(&self) -> Option<crate::enums::BuiltinRole> {
        crate::enums::BuiltinRole::from_name(&self.0)
    }

    /// The role name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// User & Tenant
// ---------------------------------------------------------------------------

/// A platform user: identity plus credential state.
///
/// Created by invitation or bootstrap; soft-deleted, never purged except
/// by a master operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// The owning tenant, absent only for the bootstrap master admin.
    pub tenant_id: Option<TenantId>,
    /// Unique e-mail address.
    pub email: String,
    /// Unique display username.
    pub username: String,
    /// bcrypt credential hash; absent for invitation-pending users.
    pub password_hash: Option<String>,
    /// The user's role (built-in or custom).
    pub role: RoleName,
    /// Whether the e-mail address has been verified.
    pub verified: bool,
    /// Soft-delete marker.
    pub archived_at: Option<DateTime<Utc>>,
    /// Outstanding magic-link token (query-string variant), if any.
    pub magic_token: Option<String>,
    /// Outstanding magic-link 6-digit code (manual-entry variant).
    pub magic_code: Option<String>,
    /// Expiry of the outstanding magic link.
    pub magic_expires_at: Option<DateTime<Utc>>,
    /// TOTP shared secret, present once two-factor is enabled.
    pub totp_secret: Option<String>,
    /// Secret issued at enrollment, awaiting the verify-setup check.
    pub totp_pending_secret: Option<String>,
    /// SHA-256 digests of unused recovery codes.
    pub recovery_codes: Vec<String>,
    /// Outstanding invitation token, if the user has not yet accepted.
    pub invitation_token: Option<String>,
    /// Expiry of the outstanding invitation.
    pub invitation_expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the user is active (not archived).
    pub const fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }

    /// Whether login must complete a second factor.
    pub const fn requires_two_factor(&self) -> bool {
        self.totp_secret.is_some()
    }
}

/// The organizational tenant scoping users, roles, and audit records.
///
/// Exactly one admin user may be designated; deleting the tenant cascades
/// deletion of its admin user before the tenant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tenant {
    /// Stable identifier.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// The designated admin user.
    pub admin_user_id: Option<UserId>,
    /// Data retention window in days.
    pub retention_days: u32,
    /// Whether the tenant is active.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A bearer session bound to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Session {
    /// Stable identifier (also carried in the token claims).
    pub id: SessionId,
    /// The owning user; must exist and be active.
    pub user_id: UserId,
    /// SHA-256 digest of the issued token.
    pub token_digest: String,
    /// Expiry instant (shorter for web, longer for mobile).
    pub expires_at: DateTime<Utc>,
    /// Whether the session was issued to a mobile client.
    pub is_mobile: bool,
    /// Device fingerprint captured at issuance.
    pub device_fingerprint: Option<String>,
    /// Source address captured at issuance.
    pub source_ip: Option<String>,
    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Map & Tile
// ---------------------------------------------------------------------------

/// The player-facing thresholds a company must exceed to hero out of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HeroThresholds {
    /// Minimum net worth (cash + offshore + building values).
    pub net_worth: Money,
    /// Minimum liquid cash.
    pub cash: Money,
    /// Minimum owned-land share of the map, in per-mille.
    pub land_permille: u16,
}

/// A rectangular game map. Dimensions are immutable post-creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameMap {
    /// Stable identifier.
    pub id: MapId,
    /// Country label shown to players.
    pub country: String,
    /// The map's tier.
    pub tier: MapTier,
    /// Grid width in tiles, `1..=100`.
    pub width: u32,
    /// Grid height in tiles, `1..=100`.
    pub height: u32,
    /// Hero-out thresholds for this map.
    pub hero_thresholds: HeroThresholds,
    /// Weekday (0 = Monday) on which detection rolls are skipped.
    pub police_strike_day: u8,
    /// Whether the map participates in ticks and accepts joins.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl GameMap {
    /// Total tile count of the grid.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.width).saturating_mul(u64::from(self.height))
    }
}

/// One cell of a map grid.
///
/// Exactly one tile exists per `(map, x, y)`. Water/road tiles and
/// special-building tiles are unownable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Stable identifier.
    pub id: TileId,
    /// The owning map.
    pub map_id: MapId,
    /// Zero-based column.
    pub x: u32,
    /// Zero-based row.
    pub y: u32,
    /// The tile's terrain.
    pub terrain: Terrain,
    /// A map fixture occupying the tile, if any.
    pub special: Option<SpecialBuilding>,
    /// The owning game company, if the tile has been bought.
    pub owner: Option<GameCompanyId>,
}

impl Tile {
    /// Whether this tile can be bought: ownable terrain, no fixture,
    /// currently unowned.
    pub const fn purchasable(&self) -> bool {
        self.terrain.ownable() && self.special.is_none() && self.owner.is_none()
    }
}

// ---------------------------------------------------------------------------
// GameCompany
// ---------------------------------------------------------------------------

/// A player's economic actor on a map (distinct from the tenant).
///
/// A user owns at most three game companies. Name and boss name pass
/// moderation and are immutable except by a master-admin override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameCompany {
    /// Stable identifier.
    pub id: GameCompanyId,
    /// The owning user.
    pub user_id: UserId,
    /// Moderated display name.
    pub name: String,
    /// Moderated boss name.
    pub boss_name: String,
    /// Liquid cash in minor units.
    pub cash: Money,
    /// Offshore savings held at the bank; counts toward net worth.
    pub offshore: Money,
    /// Current level, starting at 1.
    pub level: u8,
    /// Lifetime successful action count (drives level-ups).
    pub total_actions: u32,
    /// Ticks elapsed since the last successful action.
    pub ticks_since_action: u32,
    /// Whether the company is imprisoned after a detected trick.
    pub in_prison: bool,
    /// Outstanding fine that must be paid to act again.
    pub fine: Money,
    /// Consecutive land purchases; feeds the streak discount.
    pub land_streak: u32,
    /// The map the company currently plays on.
    pub map_id: Option<MapId>,
    /// The tier of the map the company joined.
    pub tier_joined: Option<MapTier>,
    /// Tiers unlocked by hero-out ceremonies.
    pub hero_unlocks: Vec<MapTier>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl GameCompany {
    /// Whether the company has unlocked the given tier.
    ///
    /// Town is always unlocked; higher tiers require the matching
    /// hero-out token.
    pub fn has_unlocked(&self, tier: MapTier) -> bool {
        tier == MapTier::Town || self.hero_unlocks.contains(&tier)
    }
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// One non-zero contribution recorded by the profit engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BreakdownEntry {
    /// What contributed (e.g. `"temple_adjacency"`, `"base_profit"`).
    pub source: String,
    /// The signed contribution in minor units.
    pub delta: Money,
    /// One human-readable line explaining the contribution.
    pub reason: String,
}

/// A built structure standing on one tile.
///
/// Exactly one non-collapsed instance may exist per tile; the owner
/// company must own the tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingInstance {
    /// Stable identifier.
    pub id: BuildingId,
    /// The tile the building stands on.
    pub tile_id: TileId,
    /// The owning map (denormalized for per-map sweeps).
    pub map_id: MapId,
    /// Catalog key.
    pub kind: BuildingKind,
    /// The owning game company.
    pub owner: GameCompanyId,
    /// Chosen specialty variant, if the kind declares variants.
    pub variant: Option<String>,
    /// Cached profit from the last adjacency evaluation.
    pub calculated_profit: Money,
    /// Cached valuation from the last adjacency evaluation.
    pub calculated_value: Money,
    /// Non-zero contributions behind the cached figures.
    pub breakdown: Vec<BreakdownEntry>,
    /// Accumulated damage percent.
    pub damage: DamagePercent,
    /// Whether the building has collapsed (earns nothing, blocks the tile).
    pub collapsed: bool,
    /// Whether an arson fire is still burning.
    pub burning: bool,
    /// Visible overlay, if any.
    pub overlay: Option<Overlay>,
    /// Set by the dirty tracker; cleared by the tick recalculation pass.
    pub needs_profit_recalc: bool,
    /// The last tick boundary whose earnings/decay were applied.
    pub last_tick_applied: i64,
    /// Construction timestamp.
    pub created_at: DateTime<Utc>,
}

impl BuildingInstance {
    /// Whether the building participates in earnings and adjacency.
    pub const fn is_live(&self) -> bool {
        !self.collapsed
    }
}

/// An optional guard layer attached to one building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingSecurity {
    /// Guard tier, `1..=3`.
    pub level: u8,
    /// Per-tick upkeep cost deducted from earnings.
    pub upkeep: Money,
    /// Damage that gets through, as an integer percentage (lower is
    /// stronger: level 3 lets 25% through).
    pub resistance_pct: u8,
}

// ---------------------------------------------------------------------------
// Attacks & market
// ---------------------------------------------------------------------------

/// A record of one offensive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attack {
    /// Stable identifier.
    pub id: AttackId,
    /// The attacking game company.
    pub attacker: GameCompanyId,
    /// The targeted building.
    pub target_building: BuildingId,
    /// The trick performed.
    pub trick: TrickKind,
    /// Taunt text left at the scene; visible only once approved.
    pub message: Option<String>,
    /// Moderation state of the taunt.
    pub moderation_status: ModerationStatus,
    /// Whether the detection roll caught the attacker.
    pub detected: bool,
    /// Damage actually inflicted after security resistance.
    pub damage_dealt: u8,
    /// When the attack happened.
    pub created_at: DateTime<Utc>,
}

/// What a market listing offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ListingSubject {
    /// Bare land.
    Tile(TileId),
    /// A standing building (conveys its tile).
    Building(BuildingId),
}

/// Lifecycle state of a market listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ListingStatus {
    /// Open for purchase.
    Active,
    /// Bought by a peer.
    Sold,
    /// Withdrawn by the seller.
    Cancelled,
}

/// An asking price published by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketListing {
    /// Stable identifier.
    pub id: ListingId,
    /// The map the subject belongs to.
    pub map_id: MapId,
    /// What is for sale.
    pub subject: ListingSubject,
    /// The asking price; a buyer must match it exactly.
    pub asking_price: Money,
    /// The selling company.
    pub seller: GameCompanyId,
    /// Lifecycle state.
    pub status: ListingStatus,
    /// Publication timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transactions, statistics, audit
// ---------------------------------------------------------------------------

/// An append-only audit record of one economic action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransactionRecord {
    /// Stable identifier.
    pub id: TransactionId,
    /// The action performed.
    pub kind: TransactionKind,
    /// The acting (or credited) company.
    pub company: GameCompanyId,
    /// The map context, if any.
    pub map_id: Option<MapId>,
    /// The tile involved, if any.
    pub tile_id: Option<TileId>,
    /// The building involved, if any.
    pub building_id: Option<BuildingId>,
    /// Signed amount from the company's perspective.
    pub amount: Money,
    /// Free-form structured detail (e.g. `{"unlocks": "city"}`).
    pub details: serde_json::Value,
    /// When the action committed.
    pub created_at: DateTime<Utc>,
}

/// Per-tick totals for one company on one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CompanyStatistics {
    /// The company the row describes.
    pub company: GameCompanyId,
    /// The map the totals were taken on.
    pub map_id: MapId,
    /// The tick boundary the snapshot belongs to.
    pub tick: i64,
    /// Net worth at snapshot time.
    pub net_worth: Money,
    /// Liquid cash at snapshot time.
    pub cash: Money,
    /// Standing (non-collapsed) building count.
    pub buildings: u32,
    /// Owned tile count.
    pub tiles: u32,
    /// Owned-land share of the map in per-mille.
    pub land_permille: u16,
    /// Net income credited this tick.
    pub income: Money,
    /// Sum of damage percent across the company's buildings.
    pub damage_total: u32,
    /// Row update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An immutable security-trail entry (normalized form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AuditEntry {
    /// Stable identifier.
    pub id: AuditEntryId,
    /// What happened.
    pub kind: AuditEventKind,
    /// The affected or acting user.
    pub user_id: Option<UserId>,
    /// The tenant scope.
    pub tenant_id: Option<TenantId>,
    /// The source address, when the event came from a request.
    pub source_ip: Option<String>,
    /// One human-readable line of detail.
    pub detail: String,
    /// When the event occurred.
    pub created_at: DateTime<Utc>,
}

/// The denormalized audit row shown to admins (resolved names inline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AuditEntryDisplay {
    /// The normalized entry.
    pub entry: AuditEntry,
    /// Resolved username, if the user still exists.
    pub username: Option<String>,
    /// Resolved e-mail, if the user still exists.
    pub email: Option<String>,
    /// Resolved tenant name.
    pub tenant_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Authorization metadata
// ---------------------------------------------------------------------------

/// A tenant-scoped custom role with an explicit page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CustomRole {
    /// Stable identifier.
    pub id: CustomRoleId,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// Normalized role name; must not collide with built-ins.
    pub name: RoleName,
    /// Pages granted to the role.
    pub pages: Vec<Page>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Pages the master admin has enabled for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TenantAvailablePages {
    /// The tenant.
    pub tenant_id: TenantId,
    /// The enabled pages.
    pub pages: Vec<Page>,
}

/// Pages a tenant admin has assigned to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RolePageAccess {
    /// The tenant scope.
    pub tenant_id: TenantId,
    /// The role (built-in restrictive or custom).
    pub role: RoleName,
    /// The assigned pages.
    pub pages: Vec<Page>,
}

/// A time-limited per-user capability override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UserPermission {
    /// The user the override applies to.
    pub user_id: UserId,
    /// The named capability.
    pub capability: String,
    /// `true` grants, `false` revokes.
    pub granted: bool,
    /// Expiry; `None` means indefinite.
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserPermission {
    /// Whether the override is in force at `now`.
    pub fn in_force(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// Whether a chat post is ordinary map chat or a hero-out farewell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ChatKind {
    /// Map-scoped chat.
    Map,
    /// Attached to a hero-out ceremony.
    Hero,
}

/// A map-scoped chat or hero message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Stable identifier.
    pub id: ChatMessageId,
    /// The map the message belongs to.
    pub map_id: MapId,
    /// The posting company.
    pub company: GameCompanyId,
    /// Message kind.
    pub kind: ChatKind,
    /// Message body.
    pub body: String,
    /// Moderation state; only approved messages are visible.
    pub moderation_status: ModerationStatus,
    /// Posting timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn role_name_normalization() {
        assert_eq!(RoleName::normalize("Shift Lead!").as_str(), "shiftlead");
        assert_eq!(RoleName::normalize("MASTER_ADMIN").as_str(), "master_admin");
        assert!(RoleName::normalize("admin").builtin().is_some());
        assert!(RoleName::normalize("night_auditor").builtin().is_none());
    }

    #[test]
    fn tile_purchasability() {
        let tile = Tile {
            id: TileId::new(),
            map_id: MapId::new(),
            x: 0,
            y: 0,
            terrain: Terrain::FreeLand,
            special: None,
            owner: None,
        };
        assert!(tile.purchasable());

        let watery = Tile { terrain: Terrain::Water, ..tile.clone() };
        assert!(!watery.purchasable());

        let fixture = Tile { special: Some(SpecialBuilding::Temple), ..tile.clone() };
        assert!(!fixture.purchasable());

        let owned = Tile { owner: Some(GameCompanyId::new()), ..tile };
        assert!(!owned.purchasable());
    }

    #[test]
    fn town_is_always_unlocked() {
        let company = GameCompany {
            id: GameCompanyId::new(),
            user_id: UserId::new(),
            name: String::from("Acme Holdings"),
            boss_name: String::from("J. Acme"),
            cash: Money::from_minor(50_000),
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
        };
        assert!(company.has_unlocked(MapTier::Town));
        assert!(!company.has_unlocked(MapTier::City));

        let unlocked = GameCompany { hero_unlocks: vec![MapTier::City], ..company };
        assert!(unlocked.has_unlocked(MapTier::City));
        assert!(!unlocked.has_unlocked(MapTier::Capital));
    }

    #[test]
    fn map_tile_count() {
        let map = GameMap {
            id: MapId::new(),
            country: String::from("Testland"),
            tier: MapTier::Town,
            width: 5,
            height: 5,
            hero_thresholds: HeroThresholds {
                net_worth: Money::from_minor(5_000_000),
                cash: Money::from_minor(3_000_000),
                land_permille: 50,
            },
            police_strike_day: 6,
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(map.tile_count(), 25);
    }

    #[test]
    fn listing_subject_serde_shape() {
        let subject = ListingSubject::Tile(TileId::new());
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("tile"));
    }
}
