//! `/users/*` handlers: profile, invitations, roles, permissions.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use boomtown_auth::issue_invitation;
use boomtown_db::user_store;
use boomtown_ledger::audit_event;
use boomtown_types::{
    AuditEventKind, BuiltinRole, GameError, RoleName, User, UserId, UserPermission,
};

use crate::error::{ApiError, created, ok};
use crate::guard::{authenticate, client_ip, require_admin};
use crate::mailer::Template;
use crate::state::AppState;

/// `GET /users/me`
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    Ok(ok(json!({
        "id": ctx.user.id,
        "email": ctx.user.email,
        "username": ctx.user.username,
        "role": ctx.user.role,
        "tenant_id": ctx.user.tenant_id,
        "verified": ctx.user.verified,
        "two_factor_enabled": ctx.user.requires_two_factor(),
    })))
}

/// Profile update body.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    /// New display username.
    #[validate(length(min = 3, max = 40))]
    pub username: String,
}

/// `PATCH /users/me`
pub async fn update_me(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfile>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut user = ctx.user;
    user.username = body.username;
    user_store::update_user(&mut *tx, &user).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "username": user.username })))
}

/// `GET /users` -- the caller's tenant roster (admin).
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;
    let Some(tenant_id) = ctx.user.tenant_id else {
        return Ok(ok(json!([])));
    };

    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let users = user_store::list_tenant_users(&mut *conn, tenant_id.into_inner()).await?;
    let listed: Vec<_> = users
        .iter()
        .map(|u| {
            json!({
                "id": u.id,
                "email": u.email,
                "username": u.username,
                "role": u.role,
                "verified": u.verified,
                "invited": u.invitation_token.is_some(),
            })
        })
        .collect();
    Ok(ok(listed))
}

/// Invitation body.
#[derive(Debug, Deserialize, Validate)]
pub struct InviteUser {
    /// Invitee e-mail.
    #[validate(email)]
    pub email: String,
    /// Username placeholder until the invitee picks one.
    #[validate(length(min = 3, max = 40))]
    pub username: String,
    /// Role for the new user (restrictive or custom).
    pub role: String,
}

/// `POST /users/invite` -- create a provisional user with a 72-hour
/// invitation and send the mail (admin).
pub async fn invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InviteUser>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let role = RoleName::normalize(&body.role);
    if role.builtin() == Some(BuiltinRole::MasterAdmin) {
        return Err(GameError::forbidden("cannot invite a master admin").into());
    }

    let invitation = issue_invitation(state.config.auth.invitation_hours);
    let user = User {
        id: UserId::new(),
        tenant_id: ctx.user.tenant_id,
        email: body.email.clone(),
        username: body.username,
        password_hash: None,
        role,
        verified: false,
        archived_at: None,
        magic_token: None,
        magic_code: None,
        magic_expires_at: None,
        totp_secret: None,
        totp_pending_secret: None,
        recovery_codes: Vec::new(),
        invitation_token: Some(invitation.token.clone()),
        invitation_expires_at: Some(invitation.expires_at),
        created_at: Utc::now(),
    };

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::insert_user(&mut *tx, &user).await?;
    tx.commit().await.map_err(db_err)?;

    state
        .mailer
        .send(
            Template::Invitation,
            &body.email,
            &json!({
                "inviter": ctx.user.username,
                "tenant": ctx.user.tenant_id.map(|t| t.to_string()).unwrap_or_default(),
                "link": format!("/auth/invitations/accept?token={}", invitation.token),
                "valid_hours": state.config.auth.invitation_hours,
            }),
        )
        .await;

    Ok(created(json!({ "id": user.id, "email": user.email })))
}

/// Role-change body.
#[derive(Debug, Deserialize)]
pub struct ChangeRole {
    /// The new role name.
    pub role: String,
}

/// `POST /users/{id}/role` (admin, same tenant).
pub async fn change_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ChangeRole>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let role = RoleName::normalize(&body.role);
    if role.builtin() == Some(BuiltinRole::MasterAdmin) && !ctx.is_master() {
        return Err(GameError::forbidden("only the master admin grants that role").into());
    }

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut target = fetch_tenant_user(&mut *tx, &ctx, user_id).await?;
    let old = target.role.clone();
    target.role = role;
    user_store::update_user(&mut *tx, &target).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::RoleChanged,
            Some(target.id),
            target.tenant_id,
            Some(client_ip(&headers)),
            format!("role {} -> {}", old.as_str(), target.role.as_str()),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "id": target.id, "role": target.role })))
}

/// `POST /users/{id}/archive` -- soft delete (admin, same tenant).
pub async fn archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let mut target = fetch_tenant_user(&mut *tx, &ctx, user_id).await?;
    target.archived_at = Some(Utc::now());
    user_store::update_user(&mut *tx, &target).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::UserArchived,
            Some(target.id),
            target.tenant_id,
            Some(client_ip(&headers)),
            format!("archived {}", target.username),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "id": target.id, "archived": true })))
}

/// Permission-override body.
#[derive(Debug, Deserialize)]
pub struct SetPermission {
    /// The named capability.
    pub capability: String,
    /// Grant (`true`) or revoke (`false`).
    pub granted: bool,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// `POST /users/{id}/permissions` (admin, same tenant).
pub async fn set_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetPermission>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    let target = fetch_tenant_user(&mut *tx, &ctx, user_id).await?;
    let permission = UserPermission {
        user_id: target.id,
        capability: body.capability.clone(),
        granted: body.granted,
        expires_at: body.expires_at,
    };
    user_store::set_user_permission(&mut *tx, &permission).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::PermissionChanged,
            Some(target.id),
            target.tenant_id,
            Some(client_ip(&headers)),
            format!(
                "{} {}",
                if body.granted { "granted" } else { "revoked" },
                body.capability
            ),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "id": target.id, "capability": permission.capability })))
}

/// `GET /users/{id}/permissions` -- the overrides currently in force
/// (admin, same tenant).
pub async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;

    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let target = fetch_tenant_user(&mut *conn, &ctx, user_id).await?;
    let permissions =
        user_store::user_permissions(&mut *conn, target.id.into_inner(), Utc::now()).await?;
    Ok(ok(permissions))
}

/// Load a user and confirm it belongs to the caller's tenant (the
/// master admin reaches across tenants).
async fn fetch_tenant_user(
    tx: &mut sqlx::PgConnection,
    ctx: &crate::guard::AuthContext,
    user_id: Uuid,
) -> Result<User, ApiError> {
    let target = user_store::find_user(tx, user_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such user")))?;
    if !ctx.is_master() && target.tenant_id != ctx.user.tenant_id {
        return Err(GameError::forbidden("user belongs to another tenant").into());
    }
    Ok(target)
}

/// Map a raw sqlx error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}
