//! Grid world, building catalog, and the pure adjacency/profit engine.
//!
//! # Modules
//!
//! - [`catalog`] -- the static building catalog (costs, profits, level
//!   gates, variants, license caps)
//! - [`grid`] -- read-only tile/building snapshots, neighborhoods, and the
//!   dirty set
//! - [`profit`] -- the deterministic adjacency/profit engine and its
//!   configuration-backed coefficient table
//! - [`damage`] -- incoming-damage filtering and per-tick decay
//! - [`mapgen`] -- terrain layout and fixture placement for new maps
//! - [`error`] -- the world error type

pub mod catalog;
pub mod damage;
pub mod error;
pub mod grid;
pub mod mapgen;
pub mod profit;

pub use catalog::{Blueprint, blueprint, is_marker};
pub use damage::{DecayTable, apply_incoming, decay_increment};
pub use error::WorldError;
pub use grid::{BuildingView, NEIGHBOR_OFFSETS, TileGrid, TileView, dirty_set, neighborhood};
pub use mapgen::generate_tiles;
pub use profit::{ProfitTable, TierMultipliers, Valuation, evaluate};
