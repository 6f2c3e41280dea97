//! First-run bootstrap: create the master admin when no users exist.

use chrono::Utc;
use tracing::info;

use boomtown_auth::hash_password;
use boomtown_core::AppConfig;
use boomtown_db::{DbError, PostgresPool, user_store};
use boomtown_types::{BuiltinRole, RoleName, User, UserId};

/// Errors that can occur during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A data-layer operation failed.
    #[error("data layer error: {0}")]
    Db(#[from] DbError),

    /// The pool refused a connection.
    #[error("pool error: {0}")]
    Pool(#[from] sqlx::Error),

    /// The configured bootstrap password is unusable.
    #[error("bootstrap credential error: {0}")]
    Credential(String),
}

/// Create the configured master admin if the user table is empty.
pub async fn ensure_master_admin(
    pool: &PostgresPool,
    config: &AppConfig,
) -> Result<(), BootstrapError> {
    let mut tx = pool.pool().begin().await?;
    if user_store::any_user_exists(&mut *tx).await? {
        return Ok(());
    }

    let password_hash = hash_password(&config.auth.bootstrap_password)
        .map_err(|e| BootstrapError::Credential(e.message))?;
    let admin = User {
        id: UserId::new(),
        tenant_id: None,
        email: config.auth.bootstrap_email.clone(),
        username: String::from("root"),
        password_hash: Some(password_hash),
        role: RoleName::normalize(BuiltinRole::MasterAdmin.as_str()),
        verified: true,
        archived_at: None,
        magic_token: None,
        magic_code: None,
        magic_expires_at: None,
        totp_secret: None,
        totp_pending_secret: None,
        recovery_codes: Vec::new(),
        invitation_token: None,
        invitation_expires_at: None,
        created_at: Utc::now(),
    };
    user_store::insert_user(&mut *tx, &admin).await?;
    tx.commit().await?;

    info!(email = %config.auth.bootstrap_email, "bootstrap master admin created");
    Ok(())
}
