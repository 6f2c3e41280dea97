//! `/auth/*` handlers: login, magic links, TOTP, invitations, logout.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use boomtown_auth::{
    MagicAnswer, SessionLifetimes, consume_recovery_code, hash_password, is_mobile_agent,
    issue_magic_link, issue_session, verify_code, verify_invitation, verify_magic_link,
    verify_password,
};
use boomtown_db::user_store;
use boomtown_ledger::audit_event;
use boomtown_types::{AuditEventKind, GameError, User};

use crate::error::{ApiError, ok};
use crate::guard::{authenticate, client_ip};
use crate::mailer::Template;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Account e-mail.
    #[validate(email)]
    pub email: String,
    /// Primary credential.
    pub password: String,
    /// Second factor, when the account has TOTP enabled.
    pub totp_code: Option<String>,
    /// A recovery code may stand in for the TOTP code.
    pub recovery_code: Option<String>,
}

/// `POST /auth/login`
///
/// Primary credential check; accounts with a second factor get a
/// `requires_two_factor` result until the 6-digit code arrives.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ip = client_ip(&headers);

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let user = user_store::find_user_by_email(&mut *tx, &body.email).await?;

    let Some(user) = user else {
        audit_failure(&mut *tx, None, &ip, "unknown e-mail").await?;
        tx.commit().await.map_err(db_err)?;
        return Err(GameError::unauthenticated("invalid credentials").into());
    };
    if !user.is_active() {
        audit_failure(&mut *tx, Some(&user), &ip, "archived account").await?;
        tx.commit().await.map_err(db_err)?;
        return Err(GameError::unauthenticated("invalid credentials").into());
    }
    let credential_ok = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&body.password, hash));
    if !credential_ok {
        audit_failure(&mut *tx, Some(&user), &ip, "bad password").await?;
        tx.commit().await.map_err(db_err)?;
        return Err(GameError::unauthenticated("invalid credentials").into());
    }

    // Second factor.
    if user.requires_two_factor() {
        let answered = match (&body.totp_code, &body.recovery_code) {
            (Some(code), _) => {
                let secret = user.totp_secret.as_deref().unwrap_or_default();
                verify_code(secret, code, Utc::now().timestamp()).is_ok()
            }
            (None, Some(recovery)) => {
                match consume_recovery_code(&user.recovery_codes, recovery) {
                    Ok(remaining) => {
                        let mut updated = user.clone();
                        updated.recovery_codes = remaining;
                        user_store::update_user(&mut *tx, &updated).await?;
                        true
                    }
                    Err(_) => false,
                }
            }
            (None, None) => {
                tx.commit().await.map_err(db_err)?;
                return Ok(ok(json!({
                    "requires_two_factor": true,
                    "user_id": user.id,
                    "email": user.email,
                })));
            }
        };
        if !answered {
            audit_failure(&mut *tx, Some(&user), &ip, "bad second factor").await?;
            tx.commit().await.map_err(db_err)?;
            return Err(GameError::unauthenticated("invalid two-factor code").into());
        }
    }

    let response = issue_and_store(&state, &mut *tx, &user, &headers, &ip).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::LoginSucceeded,
            Some(user.id),
            user.tenant_id,
            Some(ip),
            format!("login for {}", user.username),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(response)
}

/// Magic-link request body.
#[derive(Debug, Deserialize, Validate)]
pub struct MagicRequest {
    /// Account e-mail.
    #[validate(email)]
    pub email: String,
}

/// `POST /auth/magic/request`
///
/// Issues a one-time token and 6-digit code and mails them. Whether the
/// account exists is never revealed; mail failures surface as the same
/// generic acknowledgement.
pub async fn magic_request(
    State(state): State<AppState>,
    Json(body): Json<MagicRequest>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    if let Some(user) = user_store::find_user_by_email(&mut *tx, &body.email).await? {
        if user.is_active() {
            let challenge = issue_magic_link(state.config.auth.magic_link_minutes);
            let mut updated = user.clone();
            updated.magic_token = Some(challenge.token.clone());
            updated.magic_code = Some(challenge.code.clone());
            updated.magic_expires_at = Some(challenge.expires_at);
            user_store::update_user(&mut *tx, &updated).await?;

            state
                .mailer
                .send(
                    Template::MagicLink,
                    &user.email,
                    &json!({
                        "username": user.username,
                        "link": format!("/auth/magic/verify?token={}", challenge.token),
                        "code": challenge.code,
                        "valid_minutes": state.config.auth.magic_link_minutes,
                    }),
                )
                .await;
        }
    }
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "sent": true })))
}

/// Magic-link verification body: either credential satisfies.
#[derive(Debug, Deserialize)]
pub struct MagicVerify {
    /// Account e-mail.
    pub email: String,
    /// The URL token variant.
    pub token: Option<String>,
    /// The manual-entry code variant.
    pub code: Option<String>,
}

/// `POST /auth/magic/verify`
///
/// Consumes the challenge on success and issues a session; a second
/// verify fails.
pub async fn magic_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MagicVerify>,
) -> Result<Response, ApiError> {
    let answer = match (body.token, body.code) {
        (Some(t), _) => MagicAnswer::Token(t),
        (None, Some(c)) => MagicAnswer::Code(c),
        (None, None) => {
            return Err(GameError::invalid("supply the token or the code").into());
        }
    };

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let user = user_store::find_user_by_email(&mut *tx, &body.email)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| ApiError::from(GameError::unauthenticated("invalid credentials")))?;

    verify_magic_link(
        user.magic_token.as_deref(),
        user.magic_code.as_deref(),
        user.magic_expires_at,
        &answer,
        Utc::now(),
    )?;

    // Consume the challenge and mark the address verified.
    let mut updated = user.clone();
    updated.magic_token = None;
    updated.magic_code = None;
    updated.magic_expires_at = None;
    updated.verified = true;
    user_store::update_user(&mut *tx, &updated).await?;

    let ip = client_ip(&headers);
    let response = issue_and_store(&state, &mut *tx, &updated, &headers, &ip).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::LoginSucceeded,
            Some(user.id),
            user.tenant_id,
            Some(ip),
            format!("magic-link login for {}", user.username),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(response)
}

/// `POST /auth/totp/setup`
///
/// Returns the shared secret and recovery codes; two-factor is enabled
/// only after verify-setup proves the user can generate a code.
pub async fn totp_setup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let enrollment = boomtown_auth::enroll();

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut user = ctx.user;
    user.totp_pending_secret = Some(enrollment.secret.clone());
    user.recovery_codes = enrollment.recovery_digests.clone();
    user_store::update_user(&mut *tx, &user).await?;
    tx.commit().await.map_err(db_err)?;

    Ok(ok(json!({
        "secret": enrollment.secret,
        "recovery_codes": enrollment.recovery_codes,
    })))
}

/// Verify-setup body.
#[derive(Debug, Deserialize)]
pub struct TotpVerifySetup {
    /// A code generated from the freshly enrolled secret.
    pub code: String,
}

/// `POST /auth/totp/verify-setup`
pub async fn totp_verify_setup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TotpVerifySetup>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let Some(pending) = ctx.user.totp_pending_secret.clone() else {
        return Err(GameError::precondition("no enrollment in progress").into());
    };
    verify_code(&pending, &body.code, Utc::now().timestamp())?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut user = ctx.user;
    user.totp_secret = Some(pending);
    user.totp_pending_secret = None;
    user_store::update_user(&mut *tx, &user).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::TwoFactorChanged,
            Some(user.id),
            user.tenant_id,
            Some(client_ip(&headers)),
            "two-factor enabled",
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "enabled": true })))
}

/// `POST /auth/totp/disable`
pub async fn totp_disable(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut user = ctx.user;
    user.totp_secret = None;
    user.totp_pending_secret = None;
    user.recovery_codes = Vec::new();
    user_store::update_user(&mut *tx, &user).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::TwoFactorChanged,
            Some(user.id),
            user.tenant_id,
            Some(client_ip(&headers)),
            "two-factor disabled",
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "enabled": false })))
}

/// Invitation acceptance body.
#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInvitation {
    /// The invitation token from the e-mail.
    pub token: String,
    /// The invitee's e-mail, to locate the provisional user.
    #[validate(email)]
    pub email: String,
    /// Chosen password; optional (the account stays passwordless and
    /// uses magic links until one is set).
    pub password: Option<String>,
}

/// `POST /auth/invitations/accept`
///
/// Activates the provisional user and immediately issues a session,
/// mirroring the magic-link flow.
pub async fn accept_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AcceptInvitation>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let user = user_store::find_user_by_email(&mut *tx, &body.email)
        .await?
        .ok_or_else(|| ApiError::from(GameError::unauthenticated("no such invitation")))?;

    verify_invitation(
        user.invitation_token.as_deref(),
        user.invitation_expires_at,
        &body.token,
        Utc::now(),
    )?;

    let mut updated = user.clone();
    updated.invitation_token = None;
    updated.invitation_expires_at = None;
    updated.verified = true;
    if let Some(password) = &body.password {
        updated.password_hash = Some(hash_password(password)?);
    }
    user_store::update_user(&mut *tx, &updated).await?;

    let ip = client_ip(&headers);
    let response = issue_and_store(&state, &mut *tx, &updated, &headers, &ip).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(response)
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::delete_session(&mut *tx, ctx.claims.session_id).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::SessionRevoked,
            Some(ctx.user.id),
            ctx.user.tenant_id,
            Some(client_ip(&headers)),
            "logout",
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "logged_out": true })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a session for a fully authenticated user and persist its row.
async fn issue_and_store(
    state: &AppState,
    tx: &mut sqlx::PgConnection,
    user: &User,
    headers: &HeaderMap,
    ip: &str,
) -> Result<Response, ApiError> {
    let agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let is_mobile = is_mobile_agent(agent);
    let lifetimes = SessionLifetimes {
        web_hours: state.config.auth.web_session_hours,
        mobile_days: state.config.auth.mobile_session_days,
    };
    let issued = issue_session(
        user.id,
        user.tenant_id,
        &user.role,
        is_mobile,
        lifetimes,
        &state.config.auth.session_secret,
        Some(agent.to_owned()),
        Some(ip.to_owned()),
    )?;
    user_store::insert_session(tx, &issued.session).await?;

    Ok(ok(json!({
        "token": issued.token,
        "expires_at": issued.session.expires_at,
        "is_mobile": is_mobile,
        "user": {
            "id": user.id,
            "email": user.email,
            "username": user.username,
            "role": user.role,
        },
    })))
}

/// Record one login-failure audit entry.
async fn audit_failure(
    tx: &mut sqlx::PgConnection,
    user: Option<&User>,
    ip: &str,
    detail: &str,
) -> Result<(), ApiError> {
    user_store::insert_audit(
        tx,
        &audit_event(
            AuditEventKind::LoginFailed,
            user.map(|u| u.id),
            user.and_then(|u| u.tenant_id),
            Some(ip.to_owned()),
            detail,
        ),
    )
    .await?;
    Ok(())
}

/// Map a raw sqlx error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}
