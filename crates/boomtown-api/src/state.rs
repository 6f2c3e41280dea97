//! Shared application state for the API server.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use boomtown_auth::KeyedLimiter;
use boomtown_core::AppConfig;
use boomtown_db::PostgresPool;
use boomtown_game::GameRng;
use boomtown_game::casino::BlackjackGame;

use crate::mailer::Mailer;
use crate::moderation::ModerationGate;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// database pool is the only ambient dependency every request shares;
/// blackjack hands live in memory keyed on their game id.
#[derive(Clone)]
pub struct AppState {
    /// The database pool.
    pub pool: PostgresPool,
    /// The full application configuration.
    pub config: Arc<AppConfig>,
    /// The moderation gate client.
    pub moderation: ModerationGate,
    /// The outbound mail client.
    pub mailer: Arc<Mailer>,
    /// Per-IP limiter for auth endpoints.
    pub login_limiter: Arc<KeyedLimiter>,
    /// Per-session limiter for authenticated requests.
    pub authed_limiter: Arc<KeyedLimiter>,
    /// Per-IP limiter for anonymous API requests.
    pub anon_limiter: Arc<KeyedLimiter>,
    /// Blackjack hands in progress, keyed on game id.
    pub blackjack: Arc<Mutex<BTreeMap<Uuid, BlackjackGame>>>,
    /// The shared random source for detection rolls and casino draws.
    pub rng: Arc<Mutex<GameRng>>,
}

impl AppState {
    /// Assemble the state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns the template error if the in-repo mail templates are
    /// malformed.
    pub fn new(pool: PostgresPool, config: AppConfig) -> Result<Self, minijinja::Error> {
        let mailer = Mailer::new(
            config.email.api_url.clone(),
            config.email.sender.clone(),
            config.email.timeout_ms,
        )?;
        let moderation =
            ModerationGate::new(config.moderation.url.clone(), config.moderation.timeout_ms);
        let login_limiter = Arc::new(KeyedLimiter::per_minute(
            config.auth.login_attempts_per_minute,
        ));
        let authed_limiter = Arc::new(KeyedLimiter::per_minute(
            config.auth.authed_requests_per_minute,
        ));
        let anon_limiter = Arc::new(KeyedLimiter::per_minute(
            config.auth.anon_requests_per_minute,
        ));

        Ok(Self {
            pool,
            config: Arc::new(config),
            moderation,
            mailer: Arc::new(mailer),
            login_limiter,
            authed_limiter,
            anon_limiter,
            blackjack: Arc::new(Mutex::new(BTreeMap::new())),
            rng: Arc::new(Mutex::new(GameRng::from_entropy())),
        })
    }
}
