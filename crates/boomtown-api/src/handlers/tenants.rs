//! `/companies/*` handlers -- tenant (organizational company)
//! management and authorization metadata.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use boomtown_auth::{issue_invitation, validate_custom_role_name};
use boomtown_db::user_store;
use boomtown_ledger::audit_event;
use boomtown_types::{
    AuditEventKind, BuiltinRole, CustomRole, CustomRoleId, GameError, Page, RoleName, Tenant,
    TenantId, User, UserId,
};

use crate::error::{ApiError, created, ok};
use crate::guard::{authenticate, client_ip, require_admin, require_master};
use crate::mailer::Template;
use crate::state::AppState;

/// Tenant creation body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenant {
    /// Tenant display name.
    #[validate(length(min = 2, max = 80))]
    pub name: String,
    /// E-mail of the designated admin user.
    #[validate(email)]
    pub admin_email: String,
    /// Username of the designated admin user.
    #[validate(length(min = 3, max = 40))]
    pub admin_username: String,
}

/// `POST /companies` -- create a tenant with its designated admin
/// (master admin only). The admin arrives by invitation.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTenant>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::from(GameError::invalid(e.to_string())))?;
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    let tenant_id = TenantId::new();
    let invitation = issue_invitation(state.config.auth.invitation_hours);
    let admin = User {
        id: UserId::new(),
        tenant_id: Some(tenant_id),
        email: body.admin_email.clone(),
        username: body.admin_username,
        password_hash: None,
        role: RoleName::normalize(BuiltinRole::Admin.as_str()),
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
    let tenant = Tenant {
        id: tenant_id,
        name: body.name,
        admin_user_id: Some(admin.id),
        retention_days: 365,
        active: true,
        created_at: Utc::now(),
    };

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::insert_tenant(&mut *tx, &tenant).await?;
    user_store::insert_user(&mut *tx, &admin).await?;
    tx.commit().await.map_err(db_err)?;

    state
        .mailer
        .send(
            Template::Invitation,
            &body.admin_email,
            &json!({
                "inviter": ctx.user.username,
                "tenant": tenant.name,
                "link": format!("/auth/invitations/accept?token={}", invitation.token),
                "valid_hours": state.config.auth.invitation_hours,
            }),
        )
        .await;

    Ok(created(json!({ "id": tenant.id, "name": tenant.name })))
}

/// `GET /companies/{id}`
pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    if !ctx.is_master() && ctx.user.tenant_id.map(TenantId::into_inner) != Some(tenant_id) {
        return Err(GameError::forbidden("not your tenant").into());
    }

    let mut conn = state.pool.pool().acquire().await.map_err(db_err)?;
    let tenant = user_store::find_tenant(&mut *conn, tenant_id)
        .await?
        .ok_or_else(|| ApiError::from(GameError::not_found("no such tenant")))?;
    Ok(ok(json!({
        "id": tenant.id,
        "name": tenant.name,
        "active": tenant.active,
        "admin_user_id": tenant.admin_user_id,
    })))
}

/// `DELETE /companies/{id}` -- delete a tenant, cascading its
/// designated admin user first (master admin only).
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::delete_tenant(&mut *tx, tenant_id).await?;
    user_store::insert_audit(
        &mut *tx,
        &audit_event(
            AuditEventKind::TenantDeleted,
            Some(ctx.user.id),
            None,
            Some(client_ip(&headers)),
            format!("tenant {tenant_id} deleted"),
        ),
    )
    .await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "deleted": true })))
}

/// Page-list body.
#[derive(Debug, Deserialize)]
pub struct PageList {
    /// The pages to set.
    pub pages: Vec<Page>,
}

/// `PUT /companies/{id}/pages` -- the pages enabled for the tenant
/// (master admin only).
pub async fn set_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<PageList>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_master(&ctx)?;

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::set_tenant_pages(&mut *tx, tenant_id, &body.pages).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "pages": body.pages })))
}

/// `PUT /companies/{id}/roles/{role}/pages` -- the pages a tenant admin
/// assigns to one of their roles.
pub async fn set_role_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((tenant_id, role)): Path<(Uuid, String)>,
    Json(body): Json<PageList>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;
    if !ctx.is_master() && ctx.user.tenant_id.map(TenantId::into_inner) != Some(tenant_id) {
        return Err(GameError::forbidden("not your tenant").into());
    }
    let role = RoleName::normalize(&role);
    if matches!(
        role.builtin(),
        Some(BuiltinRole::MasterAdmin | BuiltinRole::Admin)
    ) {
        return Err(GameError::invalid("that role's pages are built in").into());
    }

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::set_role_pages(&mut *tx, tenant_id, &role, &body.pages).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(ok(json!({ "role": role, "pages": body.pages })))
}

/// Custom-role body.
#[derive(Debug, Deserialize)]
pub struct CreateCustomRole {
    /// Raw role name (normalized before storage).
    pub name: String,
    /// The role's page list.
    pub pages: Vec<Page>,
}

/// `POST /companies/{id}/custom-roles`
pub async fn create_custom_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<CreateCustomRole>,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state, &headers).await?;
    require_admin(&ctx)?;
    if !ctx.is_master() && ctx.user.tenant_id.map(TenantId::into_inner) != Some(tenant_id) {
        return Err(GameError::forbidden("not your tenant").into());
    }

    let name = validate_custom_role_name(&body.name)?;
    let role = CustomRole {
        id: CustomRoleId::new(),
        tenant_id: tenant_id.into(),
        name: name.clone(),
        pages: body.pages.clone(),
        created_at: Utc::now(),
    };

    let mut tx = state.pool.pool().begin().await.map_err(db_err)?;
    user_store::insert_custom_role(&mut *tx, &role).await?;
    user_store::set_role_pages(&mut *tx, tenant_id, &name, &body.pages).await?;
    tx.commit().await.map_err(db_err)?;
    Ok(created(json!({ "id": role.id, "name": role.name })))
}

/// Map a raw sqlx error into the envelope.
fn db_err(err: sqlx::Error) -> ApiError {
    ApiError::from(boomtown_db::DbError::from(err))
}
