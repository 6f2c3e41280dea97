//! Tick processor, tick clock, and typed configuration.
//!
//! # Modules
//!
//! - [`tick`] -- the scheduled global advance, pure per map
//! - [`clock`] -- tick boundaries and the weekday encoding
//! - [`config`] -- the typed YAML configuration with env overrides

pub mod clock;
pub mod config;
pub mod tick;

pub use clock::{ClockError, tick_boundary, weekday_utc};
pub use config::{AppConfig, AuthConfig, ConfigError, TickSchedule};
pub use tick::{MapTickState, TickContext, TickError, TickOutcome, TickSummary, run_map_tick};
