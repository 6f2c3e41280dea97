//! The request envelope: token extraction, session checks, page
//! authorization, and per-route rate limits.
//!
//! Every inbound request passes the fixed pipeline: CORS (layered on the
//! router) -> token extraction -> authorization -> per-route rate limit
//! -> handler. Handlers call [`authenticate`] and the `require_*`
//! helpers; the rate-limit middleware wraps whole sub-routers.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use boomtown_auth::{SessionClaims, verify_token};
use boomtown_db::user_store;
use boomtown_types::{BuiltinRole, GameError, Page, User};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated caller: verified claims plus the loaded user.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The verified token claims.
    pub claims: SessionClaims,
    /// The session's user, loaded and confirmed active.
    pub user: User,
}

impl AuthContext {
    /// Whether the caller is the master admin.
    pub fn is_master(&self) -> bool {
        self.user.role.builtin() == Some(BuiltinRole::MasterAdmin)
    }

    /// Whether the caller administers their tenant (or is the master).
    pub fn is_admin(&self) -> bool {
        matches!(
            self.user.role.builtin(),
            Some(BuiltinRole::MasterAdmin | BuiltinRole::Admin)
        )
    }
}

/// The client address used for rate-limit keys and audit entries.
///
/// Prefers the first `X-Forwarded-For` hop; falls back to a fixed
/// marker so local traffic still buckets consistently.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map_or_else(|| String::from("local"), |ip| ip.trim().to_owned())
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Authenticate a request: verify the token, confirm the session row is
/// live and belongs to this token, and load the active user.
///
/// # Errors
///
/// `unauthenticated` for missing/invalid/expired credentials or an
/// archived user.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Err(GameError::unauthenticated("missing bearer token").into());
    };
    let claims = verify_token(token, &state.config.auth.session_secret)?;

    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let session = user_store::find_live_session(&mut *conn, claims.session_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::from(GameError::unauthenticated("session no longer exists")))?;
    if session.token_digest != boomtown_auth::token::digest(token) {
        return Err(GameError::unauthenticated("session does not match token").into());
    }

    let user = user_store::find_user(&mut *conn, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::unauthenticated("user no longer exists")))?;
    if !user.is_active() {
        return Err(GameError::unauthenticated("user is archived").into());
    }

    Ok(AuthContext { claims, user })
}

/// Restrict a handler to the master admin.
///
/// # Errors
///
/// `forbidden` for everyone else.
pub fn require_master(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_master() {
        Ok(())
    } else {
        Err(GameError::forbidden("master admin only").into())
    }
}

/// Restrict a handler to tenant admins (and the master admin).
///
/// # Errors
///
/// `forbidden` for everyone else.
pub fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(GameError::forbidden("tenant admin only").into())
    }
}

/// Check the caller may open `page`, resolving tenant-enabled and
/// role-assigned pages from the store.
///
/// # Errors
///
/// `forbidden` when the resolved page set excludes the page.
pub async fn require_page(
    state: &AppState,
    ctx: &AuthContext,
    page: Page,
) -> Result<(), ApiError> {
    let (tenant_enabled, role_assigned) = match ctx.user.tenant_id {
        Some(tenant_id) => {
            let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
            let enabled = user_store::tenant_pages(&mut *conn, tenant_id.into_inner()).await?;
            let assigned =
                user_store::role_pages(&mut *conn, tenant_id.into_inner(), &ctx.user.role).await?;
            (enabled, assigned)
        }
        None => (Vec::new(), Vec::new()),
    };
    if boomtown_auth::may_access(&ctx.user.role, &tenant_enabled, &role_assigned, page) {
        Ok(())
    } else {
        Err(GameError::forbidden("page not available for your role").into())
    }
}

/// Rate-limit middleware for the auth sub-router: the tight per-IP
/// login quota.
pub async fn limit_auth_routes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(request.headers());
    check_limiter(&state.login_limiter, &ip)?;
    Ok(next.run(request).await)
}

/// Rate-limit middleware for the API sub-routers: authenticated callers
/// get the per-session quota keyed on their token, anonymous callers
/// the per-IP quota.
pub async fn limit_api_routes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match bearer_token(request.headers()) {
        Some(token) => {
            let key = boomtown_auth::token::digest(token);
            check_limiter(&state.authed_limiter, &key)?;
        }
        None => {
            let ip = client_ip(request.headers());
            check_limiter(&state.anon_limiter, &ip)?;
        }
    }
    Ok(next.run(request).await)
}

/// Convert a limiter rejection into the enveloped 429.
fn check_limiter(limiter: &boomtown_auth::KeyedLimiter, key: &str) -> Result<(), ApiError> {
    match limiter.check(key) {
        Ok(()) => Ok(()),
        Err(_) => {
            let retry = limiter.retry_after_secs(key).unwrap_or(60);
            Err(ApiError::rate_limited(retry))
        }
    }
}

/// Map a raw sqlx pool error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}
