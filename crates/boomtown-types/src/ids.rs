//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the game has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. All IDs use UUID v7 (time-ordered)
//! for efficient database indexing.
//!
//! The `new()` constructors exist for app-side generation (new rows, tests,
//! seed data); rows read back from the database carry their stored value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a platform user (identity + credentials).
    UserId
}

define_id! {
    /// Unique identifier for a tenant (the organizational company that
    /// scopes users, roles, and audit records).
    TenantId
}

define_id! {
    /// Unique identifier for a login session.
    SessionId
}

define_id! {
    /// Unique identifier for a game map.
    MapId
}

define_id! {
    /// Unique identifier for one tile of a map grid.
    TileId
}

define_id! {
    /// Unique identifier for a player's in-game company.
    GameCompanyId
}

define_id! {
    /// Unique identifier for a building instance standing on a tile.
    BuildingId
}

define_id! {
    /// Unique identifier for an offensive action record.
    AttackId
}

define_id! {
    /// Unique identifier for a market listing.
    ListingId
}

define_id! {
    /// Unique identifier for an economic transaction record.
    TransactionId
}

define_id! {
    /// Unique identifier for an audit-log entry.
    AuditEntryId
}

define_id! {
    /// Unique identifier for a tenant-scoped custom role.
    CustomRoleId
}

define_id! {
    /// Unique identifier for a map-scoped chat message.
    ChatMessageId
}

define_id! {
    /// Unique identifier for a casino game in progress (blackjack hands).
    CasinoGameId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let user = UserId::new();
        let map = MapId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(user.into_inner(), Uuid::nil());
        assert_ne!(map.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = GameCompanyId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<GameCompanyId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = BuildingId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
