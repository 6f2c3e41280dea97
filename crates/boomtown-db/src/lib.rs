//! `PostgreSQL` data layer for Boomtown.
//!
//! One relational store holds everything: identities, maps, companies,
//! buildings, transactions, statistics, and the audit trail. All queries
//! are parameterized, runtime-constructed (no live database at build
//! time), and run inside caller-chosen transaction scopes.
//!
//! # Modules
//!
//! - [`postgres`] -- pool, migrations, enum-column codecs
//! - [`rows`] -- `FromRow` types and domain conversions
//! - [`user_store`] -- users, sessions, tenants, authorization
//!   metadata, audit trail
//! - [`map_store`] -- maps, chunked tile batches, advisory locks
//! - [`game_store`] -- companies, buildings, security, listings,
//!   attacks, chat
//! - [`transaction_store`] -- transactions, statistics, leaderboards
//! - [`tick_persist`] -- per-map tick load/advance/persist

pub mod error;
pub mod game_store;
pub mod map_store;
pub mod postgres;
pub mod rows;
pub mod tick_persist;
pub mod transaction_store;
pub mod user_store;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool, enum_from_db, enum_to_db};
pub use tick_persist::{PersistError, advance_map};
