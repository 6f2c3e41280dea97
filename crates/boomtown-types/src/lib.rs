//! Shared type definitions for the Boomtown business simulation.
//!
//! This crate is the single source of truth for the types used across the
//! Boomtown workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the dashboard frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (terrain, tiers, tricks, roles, pages)
//! - [`money`] -- Integer minor-unit cash and clamped damage percent
//! - [`structs`] -- Core entity structs (users, maps, tiles, companies,
//!   buildings, listings, transactions, audit)
//! - [`error`] -- The shared `ErrorKind`/`GameError` taxonomy

pub mod enums;
pub mod error;
pub mod ids;
pub mod money;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AuditEventKind, BuildingCategory, BuildingKind, BuiltinRole, MapTier, ModerationCategory,
    ModerationStatus, Overlay, Page, SpecialBuilding, Terrain, TransactionKind, TrickKind,
    VisualClass,
};
pub use error::{ErrorKind, GameError};
pub use ids::{
    AttackId, AuditEntryId, BuildingId, CasinoGameId, ChatMessageId, CustomRoleId, GameCompanyId,
    ListingId, MapId, SessionId, TenantId, TileId, TransactionId, UserId,
};
pub use money::{DamagePercent, Money};
pub use structs::{
    Attack, AuditEntry, AuditEntryDisplay, BreakdownEntry, BuildingInstance, BuildingSecurity,
    ChatKind, ChatMessage, CompanyStatistics, CustomRole, GameCompany, GameMap, HeroThresholds,
    ListingStatus, ListingSubject, MarketListing, RoleName, RolePageAccess, Session, Tenant,
    TenantAvailablePages, Tile, TransactionRecord, User, UserPermission,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::TenantId::export_all();
        let _ = crate::ids::SessionId::export_all();
        let _ = crate::ids::MapId::export_all();
        let _ = crate::ids::TileId::export_all();
        let _ = crate::ids::GameCompanyId::export_all();
        let _ = crate::ids::BuildingId::export_all();
        let _ = crate::ids::AttackId::export_all();
        let _ = crate::ids::ListingId::export_all();
        let _ = crate::ids::TransactionId::export_all();
        let _ = crate::ids::AuditEntryId::export_all();
        let _ = crate::ids::CustomRoleId::export_all();
        let _ = crate::ids::ChatMessageId::export_all();
        let _ = crate::ids::CasinoGameId::export_all();

        // Enums
        let _ = crate::enums::Terrain::export_all();
        let _ = crate::enums::MapTier::export_all();
        let _ = crate::enums::SpecialBuilding::export_all();
        let _ = crate::enums::BuildingKind::export_all();
        let _ = crate::enums::BuildingCategory::export_all();
        let _ = crate::enums::VisualClass::export_all();
        let _ = crate::enums::TrickKind::export_all();
        let _ = crate::enums::Overlay::export_all();
        let _ = crate::enums::ModerationCategory::export_all();
        let _ = crate::enums::ModerationStatus::export_all();
        let _ = crate::enums::BuiltinRole::export_all();
        let _ = crate::enums::Page::export_all();
        let _ = crate::enums::TransactionKind::export_all();
        let _ = crate::enums::AuditEventKind::export_all();

        // Scalars and errors
        let _ = crate::money::Money::export_all();
        let _ = crate::money::DamagePercent::export_all();
        let _ = crate::error::ErrorKind::export_all();
        let _ = crate::error::GameError::export_all();

        // Structs
        let _ = crate::structs::RoleName::export_all();
        let _ = crate::structs::User::export_all();
        let _ = crate::structs::Tenant::export_all();
        let _ = crate::structs::Session::export_all();
        let _ = crate::structs::HeroThresholds::export_all();
        let _ = crate::structs::GameMap::export_all();
        let _ = crate::structs::Tile::export_all();
        let _ = crate::structs::GameCompany::export_all();
        let _ = crate::structs::BreakdownEntry::export_all();
        let _ = crate::structs::BuildingInstance::export_all();
        let _ = crate::structs::BuildingSecurity::export_all();
        let _ = crate::structs::Attack::export_all();
        let _ = crate::structs::ListingSubject::export_all();
        let _ = crate::structs::ListingStatus::export_all();
        let _ = crate::structs::MarketListing::export_all();
        let _ = crate::structs::TransactionRecord::export_all();
        let _ = crate::structs::CompanyStatistics::export_all();
        let _ = crate::structs::AuditEntry::export_all();
        let _ = crate::structs::AuditEntryDisplay::export_all();
        let _ = crate::structs::CustomRole::export_all();
        let _ = crate::structs::TenantAvailablePages::export_all();
        let _ = crate::structs::RolePageAccess::export_all();
        let _ = crate::structs::UserPermission::export_all();
        let _ = crate::structs::ChatKind::export_all();
        let _ = crate::structs::ChatMessage::export_all();
    }
}
