//! Users, sessions, tenants, authorization metadata, and the audit
//! trail.
//!
//! Every function takes a `&mut PgConnection` so callers choose the
//! transaction scope; the API layer runs each auth mutation in one
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use boomtown_types::{
    AuditEntry, AuditEntryDisplay, CustomRole, Page, RoleName, Session, Tenant, User,
    UserPermission,
};

use crate::error::DbError;
use crate::postgres::enum_to_db;
use crate::rows::{AuditRow, SessionRow, TenantRow, UserRow};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Insert a full user row.
pub async fn insert_user(conn: &mut PgConnection, user: &User) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO users (id, tenant_id, email, username, password_hash, role, verified,
                             archived_at, magic_token, magic_code, magic_expires_at, totp_secret,
                             totp_pending_secret, recovery_codes, invitation_token,
                             invitation_expires_at, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(user.id.into_inner())
    .bind(user.tenant_id.map(boomtown_types::TenantId::into_inner))
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.verified)
    .bind(user.archived_at)
    .bind(&user.magic_token)
    .bind(&user.magic_code)
    .bind(user.magic_expires_at)
    .bind(&user.totp_secret)
    .bind(&user.totp_pending_secret)
    .bind(serde_json::to_value(&user.recovery_codes)?)
    .bind(&user.invitation_token)
    .bind(user.invitation_expires_at)
    .bind(user.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Write back every mutable credential/profile field of a user.
pub async fn update_user(conn: &mut PgConnection, user: &User) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE users
          SET email = $2, username = $3, password_hash = $4, role = $5, verified = $6,
              archived_at = $7, magic_token = $8, magic_code = $9, magic_expires_at = $10,
              totp_secret = $11, totp_pending_secret = $12, recovery_codes = $13,
              invitation_token = $14, invitation_expires_at = $15
          WHERE id = $1",
    )
    .bind(user.id.into_inner())
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.verified)
    .bind(user.archived_at)
    .bind(&user.magic_token)
    .bind(&user.magic_code)
    .bind(user.magic_expires_at)
    .bind(&user.totp_secret)
    .bind(&user.totp_pending_secret)
    .bind(serde_json::to_value(&user.recovery_codes)?)
    .bind(&user.invitation_token)
    .bind(user.invitation_expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a user by id.
pub async fn find_user(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(UserRow::into_domain).transpose()
}

/// Fetch a user by e-mail (case-insensitive).
pub async fn find_user_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<User>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(conn)
        .await?;
    row.map(UserRow::into_domain).transpose()
}

/// Whether any user exists (bootstrap check).
pub async fn any_user_exists(conn: &mut PgConnection) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// List the active users of a tenant.
pub async fn list_tenant_users(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> Result<Vec<User>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE tenant_id = $1 AND archived_at IS NULL ORDER BY created_at",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(UserRow::into_domain).collect()
}

/// Hard-delete a user (master operation only; ordinary removal is the
/// soft archive via [`update_user`]).
pub async fn purge_user(conn: &mut PgConnection, id: Uuid) -> Result<(), DbError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Insert a session row.
pub async fn insert_session(conn: &mut PgConnection, session: &Session) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO sessions (id, user_id, token_digest, expires_at, is_mobile,
                                device_fingerprint, source_ip, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(session.id.into_inner())
    .bind(session.user_id.into_inner())
    .bind(&session.token_digest)
    .bind(session.expires_at)
    .bind(session.is_mobile)
    .bind(&session.device_fingerprint)
    .bind(&session.source_ip)
    .bind(session.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a live (unexpired) session by id.
pub async fn find_live_session(
    conn: &mut PgConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Session>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM sessions WHERE id = $1 AND expires_at > $2",
    )
    .bind(id)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(SessionRow::into_domain))
}

/// Delete one session (logout / revocation).
pub async fn delete_session(conn: &mut PgConnection, id: Uuid) -> Result<(), DbError> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete every expired session; returns how many were swept.
pub async fn sweep_expired_sessions(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

/// Insert a tenant row.
pub async fn insert_tenant(conn: &mut PgConnection, tenant: &Tenant) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO tenants (id, name, admin_user_id, retention_days, active, created_at)
          VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(tenant.id.into_inner())
    .bind(&tenant.name)
    .bind(tenant.admin_user_id.map(boomtown_types::UserId::into_inner))
    .bind(i32::try_from(tenant.retention_days).unwrap_or(365))
    .bind(tenant.active)
    .bind(tenant.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a tenant by id.
pub async fn find_tenant(conn: &mut PgConnection, id: Uuid) -> Result<Option<Tenant>, DbError> {
    let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(TenantRow::into_domain))
}

/// Delete a tenant, cascading its designated admin user first (the
/// invariant the schema defers for).
pub async fn delete_tenant(conn: &mut PgConnection, id: Uuid) -> Result<(), DbError> {
    let admin: Option<Uuid> =
        sqlx::query_scalar("SELECT admin_user_id FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .flatten();
    sqlx::query("UPDATE tenants SET admin_user_id = NULL WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if let Some(admin_id) = admin {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(admin_id)
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Authorization metadata
// ---------------------------------------------------------------------------

/// Insert a custom role.
pub async fn insert_custom_role(
    conn: &mut PgConnection,
    role: &CustomRole,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO custom_roles (id, tenant_id, name, pages, created_at)
          VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(role.id.into_inner())
    .bind(role.tenant_id.into_inner())
    .bind(role.name.as_str())
    .bind(serde_json::to_value(&role.pages)?)
    .bind(role.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// The pages assigned to a role within a tenant.
pub async fn role_pages(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    role: &RoleName,
) -> Result<Vec<Page>, DbError> {
    let value: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT pages FROM role_page_access WHERE tenant_id = $1 AND role = $2")
            .bind(tenant_id)
            .bind(role.as_str())
            .fetch_optional(conn)
            .await?;
    match value {
        Some(v) => Ok(serde_json::from_value(v)?),
        None => Ok(Vec::new()),
    }
}

/// Replace the pages assigned to a role within a tenant.
pub async fn set_role_pages(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    role: &RoleName,
    pages: &[Page],
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO role_page_access (tenant_id, role, pages) VALUES ($1, $2, $3)
          ON CONFLICT (tenant_id, role) DO UPDATE SET pages = EXCLUDED.pages",
    )
    .bind(tenant_id)
    .bind(role.as_str())
    .bind(serde_json::to_value(pages)?)
    .execute(conn)
    .await?;
    Ok(())
}

/// The pages the master admin has enabled for a tenant.
pub async fn tenant_pages(conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Page>, DbError> {
    let value: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT pages FROM tenant_pages WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(conn)
            .await?;
    match value {
        Some(v) => Ok(serde_json::from_value(v)?),
        None => Ok(Vec::new()),
    }
}

/// Replace the pages enabled for a tenant.
pub async fn set_tenant_pages(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    pages: &[Page],
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO tenant_pages (tenant_id, pages) VALUES ($1, $2)
          ON CONFLICT (tenant_id) DO UPDATE SET pages = EXCLUDED.pages",
    )
    .bind(tenant_id)
    .bind(serde_json::to_value(pages)?)
    .execute(conn)
    .await?;
    Ok(())
}

/// Upsert one per-user permission override.
pub async fn set_user_permission(
    conn: &mut PgConnection,
    permission: &UserPermission,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO user_permissions (user_id, capability, granted, expires_at)
          VALUES ($1, $2, $3, $4)
          ON CONFLICT (user_id, capability)
          DO UPDATE SET granted = EXCLUDED.granted, expires_at = EXCLUDED.expires_at",
    )
    .bind(permission.user_id.into_inner())
    .bind(&permission.capability)
    .bind(permission.granted)
    .bind(permission.expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// The overrides currently in force for a user.
pub async fn user_permissions(
    conn: &mut PgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<UserPermission>, DbError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        user_id: Uuid,
        capability: String,
        granted: bool,
        expires_at: Option<DateTime<Utc>>,
    }
    let rows = sqlx::query_as::<_, Row>(
        r"SELECT user_id, capability, granted, expires_at FROM user_permissions
          WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > $2)",
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| UserPermission {
            user_id: r.user_id.into(),
            capability: r.capability,
            granted: r.granted,
            expires_at: r.expires_at,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Append one audit entry.
pub async fn insert_audit(conn: &mut PgConnection, entry: &AuditEntry) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO audit_log (id, kind, user_id, tenant_id, source_ip, detail, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id.into_inner())
    .bind(enum_to_db(&entry.kind)?)
    .bind(entry.user_id.map(boomtown_types::UserId::into_inner))
    .bind(entry.tenant_id.map(boomtown_types::TenantId::into_inner))
    .bind(&entry.source_ip)
    .bind(&entry.detail)
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// The denormalized audit view for admins, newest first.
pub async fn list_audit_display(
    conn: &mut PgConnection,
    tenant_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<AuditEntryDisplay>, DbError> {
    #[derive(sqlx::FromRow)]
    struct DisplayRow {
        #[sqlx(flatten)]
        entry: AuditRow,
        username: Option<String>,
        email: Option<String>,
        tenant_name: Option<String>,
    }
    let rows = sqlx::query_as::<_, DisplayRow>(
        r"SELECT a.*, u.username AS username, u.email AS email, t.name AS tenant_name
          FROM audit_log a
          LEFT JOIN users u ON u.id = a.user_id
          LEFT JOIN tenants t ON t.id = a.tenant_id
          WHERE ($1::uuid IS NULL OR a.tenant_id = $1)
          ORDER BY a.created_at DESC
          LIMIT $2",
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    rows.into_iter()
        .map(|r| {
            Ok(AuditEntryDisplay {
                entry: r.entry.into_domain()?,
                username: r.username,
                email: r.email,
                tenant_name: r.tenant_name,
            })
        })
        .collect()
}
