//! HTTP API server (Axum) for the Boomtown game.
//!
//! # Modules
//!
//! - [`router`] -- the request surface behind CORS, auth, and rate
//!   limits
//! - [`handlers`] -- per-domain handlers (`/auth`, `/users`,
//!   `/companies`, `/game`, `/admin`)
//! - [`guard`] -- token extraction, session checks, page authorization,
//!   rate-limit middleware
//! - [`error`] -- the `{success, data | error}` envelope and status
//!   mapping
//! - [`moderation`] -- the moderation gate client (timeout => pending)
//! - [`mailer`] -- the HTTP mail client with in-repo templates
//! - [`state`] -- shared application state
//! - [`server`] -- bind and serve

pub mod error;
pub mod guard;
pub mod handlers;
pub mod mailer;
pub mod moderation;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServeError, serve};
pub use state::AppState;
