//! The game layer: action handlers, the attack engine, progression, the
//! social sublayer, and casino games.
//!
//! Everything here is pure over loaded entities -- no database access.
//! The API layer loads rows under locks, invokes a handler, and persists
//! the returned outcome in the same transaction; the tick processor does
//! the same per map.
//!
//! # Modules
//!
//! - [`actions`] -- land, construction, market, security, takeover, and
//!   remedial operations
//! - [`tricks`] -- dirty tricks, detection, prison, fines
//! - [`progression`] -- level-ups, hero-out, the location ladder
//! - [`casino`] -- roulette and blackjack
//! - [`social`] -- chat, donations, offshore savings
//! - [`config`] -- the game-rule tables
//! - [`rng`] -- injectable randomness

pub mod actions;
pub mod casino;
pub mod config;
pub mod progression;
pub mod rng;
pub mod social;
pub mod tricks;

pub use config::{
    EconomyTable, GameTables, LandCostTable, LevelTable, SecurityTable, SecurityTier, TrickParams,
    TrickTable,
};
pub use rng::GameRng;
