//! Row types mirroring the schema, with conversions to domain structs.
//!
//! Uses runtime types rather than compile-time checked queries to avoid
//! requiring a live database during builds. Enum columns are TEXT in
//! snake case; the conversions parse them through
//! [`crate::postgres::enum_from_db`] so a corrupted column surfaces as a
//! typed error instead of a panic.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use boomtown_types::{
    Attack, AuditEntry, BuildingInstance, BuildingSecurity, ChatMessage, GameCompany, GameMap,
    HeroThresholds, MarketListing, ListingSubject, Money, RoleName, Session, Tenant, Tile,
    TransactionRecord, User,
};

use crate::error::DbError;
use crate::postgres::enum_from_db;

/// A row from `users`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Option<Uuid>,
    /// Unique e-mail.
    pub email: String,
    /// Unique username.
    pub username: String,
    /// bcrypt hash.
    pub password_hash: Option<String>,
    /// Role name.
    pub role: String,
    /// E-mail verified flag.
    pub verified: bool,
    /// Soft-delete marker.
    pub archived_at: Option<DateTime<Utc>>,
    /// Magic-link token.
    pub magic_token: Option<String>,
    /// Magic-link code.
    pub magic_code: Option<String>,
    /// Magic-link expiry.
    pub magic_expires_at: Option<DateTime<Utc>>,
    /// TOTP secret.
    pub totp_secret: Option<String>,
    /// Enrollment secret awaiting verify-setup.
    pub totp_pending_secret: Option<String>,
    /// Recovery-code digests.
    pub recovery_codes: serde_json::Value,
    /// Invitation token.
    pub invitation_token: Option<String>,
    /// Invitation expiry.
    pub invitation_expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] for a corrupted JSON column.
    pub fn into_domain(self) -> Result<User, DbError> {
        let recovery_codes: Vec<String> = serde_json::from_value(self.recovery_codes)?;
        Ok(User {
            id: self.id.into(),
            tenant_id: self.tenant_id.map(Into::into),
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            role: RoleName(self.role),
            verified: self.verified,
            archived_at: self.archived_at,
            magic_token: self.magic_token,
            magic_code: self.magic_code,
            magic_expires_at: self.magic_expires_at,
            totp_secret: self.totp_secret,
            totp_pending_secret: self.totp_pending_secret,
            recovery_codes,
            invitation_token: self.invitation_token,
            invitation_expires_at: self.invitation_expires_at,
            created_at: self.created_at,
        })
    }
}

/// A row from `tenants`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique name.
    pub name: String,
    /// Designated admin user.
    pub admin_user_id: Option<Uuid>,
    /// Retention window in days.
    pub retention_days: i32,
    /// Active flag.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TenantRow {
    /// Convert into the domain struct.
    pub fn into_domain(self) -> Tenant {
        Tenant {
            id: self.id.into(),
            name: self.name,
            admin_user_id: self.admin_user_id.map(Into::into),
            retention_days: u32::try_from(self.retention_days).unwrap_or(0),
            active: self.active,
            created_at: self.created_at,
        }
    }
}

/// A row from `sessions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Token digest.
    pub token_digest: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Mobile flag.
    pub is_mobile: bool,
    /// Device fingerprint.
    pub device_fingerprint: Option<String>,
    /// Source address.
    pub source_ip: Option<String>,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    /// Convert into the domain struct.
    pub fn into_domain(self) -> Session {
        Session {
            id: self.id.into(),
            user_id: self.user_id.into(),
            token_digest: self.token_digest,
            expires_at: self.expires_at,
            is_mobile: self.is_mobile,
            device_fingerprint: self.device_fingerprint,
            source_ip: self.source_ip,
            created_at: self.created_at,
        }
    }
}

/// A row from `maps`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MapRow {
    /// Primary key.
    pub id: Uuid,
    /// Country label.
    pub country: String,
    /// Tier name.
    pub tier: String,
    /// Width in tiles.
    pub width: i32,
    /// Height in tiles.
    pub height: i32,
    /// Hero net-worth threshold.
    pub hero_net_worth: i64,
    /// Hero cash threshold.
    pub hero_cash: i64,
    /// Hero land threshold in per-mille.
    pub hero_land_permille: i16,
    /// Police-strike weekday.
    pub police_strike_day: i16,
    /// Active flag.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl MapRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for an unrecognized tier.
    pub fn into_domain(self) -> Result<GameMap, DbError> {
        Ok(GameMap {
            id: self.id.into(),
            country: self.country,
            tier: enum_from_db("tier", &self.tier)?,
            width: u32::try_from(self.width).unwrap_or(1),
            height: u32::try_from(self.height).unwrap_or(1),
            hero_thresholds: HeroThresholds {
                net_worth: Money::from_minor(self.hero_net_worth),
                cash: Money::from_minor(self.hero_cash),
                land_permille: u16::try_from(self.hero_land_permille).unwrap_or(0),
            },
            police_strike_day: u8::try_from(self.police_strike_day).unwrap_or(6),
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// A row from `tiles`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TileRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning map.
    pub map_id: Uuid,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Terrain name.
    pub terrain: String,
    /// Special-building name.
    pub special: Option<String>,
    /// Owning company.
    pub owner_id: Option<Uuid>,
}

impl TileRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for unrecognized terrain or
    /// fixture names.
    pub fn into_domain(self) -> Result<Tile, DbError> {
        let special = self
            .special
            .as_deref()
            .map(|s| enum_from_db("special", s))
            .transpose()?;
        Ok(Tile {
            id: self.id.into(),
            map_id: self.map_id.into(),
            x: u32::try_from(self.x).unwrap_or(0),
            y: u32::try_from(self.y).unwrap_or(0),
            terrain: enum_from_db("terrain", &self.terrain)?,
            special,
            owner: self.owner_id.map(Into::into),
        })
    }
}

/// A row from `game_companies`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Boss name.
    pub boss_name: String,
    /// Liquid cash.
    pub cash: i64,
    /// Offshore savings.
    pub offshore: i64,
    /// Level.
    pub level: i16,
    /// Lifetime actions.
    pub total_actions: i32,
    /// Ticks since the last action.
    pub ticks_since_action: i32,
    /// Prison flag.
    pub in_prison: bool,
    /// Outstanding fine.
    pub fine: i64,
    /// Land streak.
    pub land_streak: i32,
    /// Current map.
    pub map_id: Option<Uuid>,
    /// Tier joined.
    pub tier_joined: Option<String>,
    /// Hero unlock tokens.
    pub hero_unlocks: serde_json::Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl CompanyRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for corrupted tier or unlock columns.
    pub fn into_domain(self) -> Result<GameCompany, DbError> {
        let tier_joined = self
            .tier_joined
            .as_deref()
            .map(|s| enum_from_db("tier_joined", s))
            .transpose()?;
        Ok(GameCompany {
            id: self.id.into(),
            user_id: self.user_id.into(),
            name: self.name,
            boss_name: self.boss_name,
            cash: Money::from_minor(self.cash),
            offshore: Money::from_minor(self.offshore),
            level: u8::try_from(self.level).unwrap_or(1),
            total_actions: u32::try_from(self.total_actions).unwrap_or(0),
            ticks_since_action: u32::try_from(self.ticks_since_action).unwrap_or(0),
            in_prison: self.in_prison,
            fine: Money::from_minor(self.fine),
            land_streak: u32::try_from(self.land_streak).unwrap_or(0),
            map_id: self.map_id.map(Into::into),
            tier_joined,
            hero_unlocks: serde_json::from_value(self.hero_unlocks)?,
            created_at: self.created_at,
        })
    }
}

/// A row from `buildings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildingRow {
    /// Primary key.
    pub id: Uuid,
    /// The tile the building stands on.
    pub tile_id: Uuid,
    /// Owning map.
    pub map_id: Uuid,
    /// Catalog key.
    pub kind: String,
    /// Owning company.
    pub owner_id: Uuid,
    /// Chosen variant.
    pub variant: Option<String>,
    /// Cached profit.
    pub calculated_profit: i64,
    /// Cached value.
    pub calculated_value: i64,
    /// Breakdown entries.
    pub breakdown: serde_json::Value,
    /// Damage percent.
    pub damage: i16,
    /// Collapsed flag.
    pub collapsed: bool,
    /// Burning flag.
    pub burning: bool,
    /// Overlay name.
    pub overlay: Option<String>,
    /// Dirty flag.
    pub needs_profit_recalc: bool,
    /// Tick idempotence marker.
    pub last_tick_applied: i64,
    /// Construction time.
    pub created_at: DateTime<Utc>,
}

impl BuildingRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for corrupted kind, overlay, or breakdown
    /// columns.
    pub fn into_domain(self) -> Result<BuildingInstance, DbError> {
        let overlay = self
            .overlay
            .as_deref()
            .map(|s| enum_from_db("overlay", s))
            .transpose()?;
        Ok(BuildingInstance {
            id: self.id.into(),
            tile_id: self.tile_id.into(),
            map_id: self.map_id.into(),
            kind: enum_from_db("kind", &self.kind)?,
            owner: self.owner_id.into(),
            variant: self.variant,
            calculated_profit: Money::from_minor(self.calculated_profit),
            calculated_value: Money::from_minor(self.calculated_value),
            breakdown: serde_json::from_value(self.breakdown)?,
            damage: boomtown_types::DamagePercent::new(u8::try_from(self.damage).unwrap_or(100)),
            collapsed: self.collapsed,
            burning: self.burning,
            overlay,
            needs_profit_recalc: self.needs_profit_recalc,
            last_tick_applied: self.last_tick_applied,
            created_at: self.created_at,
        })
    }
}

/// A row from `building_security`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SecurityRow {
    /// The protected building.
    pub building_id: Uuid,
    /// Guard tier.
    pub level: i16,
    /// Per-tick upkeep.
    pub upkeep: i64,
    /// Damage percent let through.
    pub resistance_pct: i16,
}

impl SecurityRow {
    /// Convert into the domain struct.
    pub fn into_domain(self) -> BuildingSecurity {
        BuildingSecurity {
            level: u8::try_from(self.level).unwrap_or(1),
            upkeep: Money::from_minor(self.upkeep),
            resistance_pct: u8::try_from(self.resistance_pct).unwrap_or(100),
        }
    }
}

/// A row from `attacks`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttackRow {
    /// Primary key.
    pub id: Uuid,
    /// Attacking company.
    pub attacker_id: Uuid,
    /// Target building.
    pub target_building_id: Uuid,
    /// Trick name.
    pub trick: String,
    /// Taunt text.
    pub message: Option<String>,
    /// Moderation state.
    pub moderation_status: String,
    /// Detection flag.
    pub detected: bool,
    /// Damage inflicted.
    pub damage_dealt: i16,
    /// The tick the attack happened on (cooldown bookkeeping).
    pub tick: i64,
    /// Attack time.
    pub created_at: DateTime<Utc>,
}

impl AttackRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for unrecognized trick or status
    /// names.
    pub fn into_domain(self) -> Result<Attack, DbError> {
        Ok(Attack {
            id: self.id.into(),
            attacker: self.attacker_id.into(),
            target_building: self.target_building_id.into(),
            trick: enum_from_db("trick", &self.trick)?,
            message: self.message,
            moderation_status: enum_from_db("moderation_status", &self.moderation_status)?,
            detected: self.detected,
            damage_dealt: u8::try_from(self.damage_dealt).unwrap_or(0),
            created_at: self.created_at,
        })
    }
}

/// A row from `market_listings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning map.
    pub map_id: Uuid,
    /// `tile` or `building`.
    pub subject_type: String,
    /// The listed entity.
    pub subject_id: Uuid,
    /// Asking price.
    pub asking_price: i64,
    /// Selling company.
    pub seller_id: Uuid,
    /// Lifecycle state.
    pub status: String,
    /// Publication time.
    pub created_at: DateTime<Utc>,
}

impl ListingRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for unrecognized subject or status
    /// values.
    pub fn into_domain(self) -> Result<MarketListing, DbError> {
        let subject = match self.subject_type.as_str() {
            "tile" => ListingSubject::Tile(self.subject_id.into()),
            "building" => ListingSubject::Building(self.subject_id.into()),
            other => {
                return Err(DbError::BadColumn {
                    column: "subject_type",
                    value: other.to_owned(),
                });
            }
        };
        Ok(MarketListing {
            id: self.id.into(),
            map_id: self.map_id.into(),
            subject,
            asking_price: Money::from_minor(self.asking_price),
            seller: self.seller_id.into(),
            status: enum_from_db("status", &self.status)?,
            created_at: self.created_at,
        })
    }
}

/// A row from `transactions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Primary key.
    pub id: Uuid,
    /// Transaction kind.
    pub kind: String,
    /// Acting company.
    pub company_id: Uuid,
    /// Map context.
    pub map_id: Option<Uuid>,
    /// Tile involved.
    pub tile_id: Option<Uuid>,
    /// Building involved.
    pub building_id: Option<Uuid>,
    /// Signed amount.
    pub amount: i64,
    /// Structured detail.
    pub details: serde_json::Value,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl TransactionRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for an unrecognized kind.
    pub fn into_domain(self) -> Result<TransactionRecord, DbError> {
        Ok(TransactionRecord {
            id: self.id.into(),
            kind: enum_from_db("kind", &self.kind)?,
            company: self.company_id.into(),
            map_id: self.map_id.map(Into::into),
            tile_id: self.tile_id.map(Into::into),
            building_id: self.building_id.map(Into::into),
            amount: Money::from_minor(self.amount),
            details: self.details,
            created_at: self.created_at,
        })
    }
}

/// A row from `audit_log`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRow {
    /// Primary key.
    pub id: Uuid,
    /// Event kind.
    pub kind: String,
    /// Affected user.
    pub user_id: Option<Uuid>,
    /// Tenant scope.
    pub tenant_id: Option<Uuid>,
    /// Source address.
    pub source_ip: Option<String>,
    /// Detail line.
    pub detail: String,
    /// Event time.
    pub created_at: DateTime<Utc>,
}

impl AuditRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for an unrecognized kind.
    pub fn into_domain(self) -> Result<AuditEntry, DbError> {
        Ok(AuditEntry {
            id: self.id.into(),
            kind: enum_from_db("kind", &self.kind)?,
            user_id: self.user_id.map(Into::into),
            tenant_id: self.tenant_id.map(Into::into),
            source_ip: self.source_ip,
            detail: self.detail,
            created_at: self.created_at,
        })
    }
}

/// A row from `chat_messages`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning map.
    pub map_id: Uuid,
    /// Posting company.
    pub company_id: Uuid,
    /// `map` or `hero`.
    pub kind: String,
    /// Body text.
    pub body: String,
    /// Moderation state.
    pub moderation_status: String,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}

impl ChatRow {
    /// Convert into the domain struct.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::BadColumn`] for unrecognized kind or status.
    pub fn into_domain(self) -> Result<ChatMessage, DbError> {
        Ok(ChatMessage {
            id: self.id.into(),
            map_id: self.map_id.into(),
            company: self.company_id.into(),
            kind: enum_from_db("kind", &self.kind)?,
            body: self.body,
            moderation_status: enum_from_db("moderation_status", &self.moderation_status)?,
            created_at: self.created_at,
        })
    }
}
