//! Signed session tokens and session-row construction.
//!
//! Tokens are HS256 JWTs over a shared secret; rotating the secret
//! invalidates every active session. Web clients get a short lifetime,
//! mobile clients (detected from the User-Agent) a long one. The session
//! row stores only a SHA-256 digest of the token, never the token
//! itself.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use boomtown_types::{GameError, RoleName, Session, SessionId, TenantId, UserId};

/// The claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The authenticated user.
    pub user_id: Uuid,
    /// The user's tenant, if any.
    pub company_id: Option<Uuid>,
    /// The user's role name at issuance.
    pub role: String,
    /// Whether this is a mobile session.
    pub is_mobile: bool,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds (validated by the decoder).
    pub exp: i64,
    /// The session row this token belongs to.
    pub session_id: Uuid,
}

/// Lifetimes for issued sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetimes {
    /// Web session lifetime in hours.
    pub web_hours: i64,
    /// Mobile session lifetime in days.
    pub mobile_days: i64,
}

impl Default for SessionLifetimes {
    fn default() -> Self {
        Self {
            web_hours: 24,
            mobile_days: 90,
        }
    }
}

/// A freshly issued session: the bearer token and its row.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The signed bearer token handed to the client.
    pub token: String,
    /// The session row to persist (stores the token digest only).
    pub session: Session,
}

/// Whether a User-Agent string identifies a mobile client.
pub fn is_mobile_agent(user_agent: &str) -> bool {
    let lowered = user_agent.to_lowercase();
    ["mobile", "android", "iphone", "ipad"]
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Issue a signed session token and its session row.
///
/// # Errors
///
/// Returns `internal` if signing fails.
#[allow(clippy::too_many_arguments)]
pub fn issue_session(
    user_id: UserId,
    tenant_id: Option<TenantId>,
    role: &RoleName,
    is_mobile: bool,
    lifetimes: SessionLifetimes,
    secret: &str,
    device_fingerprint: Option<String>,
    source_ip: Option<String>,
) -> Result<IssuedSession, GameError> {
    let now = Utc::now();
    let expires_at = if is_mobile {
        now + Duration::days(lifetimes.mobile_days)
    } else {
        now + Duration::hours(lifetimes.web_hours)
    };
    let session_id = SessionId::new();

    let claims = SessionClaims {
        user_id: user_id.into_inner(),
        company_id: tenant_id.map(TenantId::into_inner),
        role: role.as_str().to_owned(),
        is_mobile,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        session_id: session_id.into_inner(),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GameError::internal(format!("token signing failed: {e}")))?;

    let session = Session {
        id: session_id,
        user_id,
        token_digest: digest(&token),
        expires_at,
        is_mobile,
        device_fingerprint,
        source_ip,
        created_at: now,
    };

    Ok(IssuedSession { token, session })
}

/// Decode and validate a session token.
///
/// # Errors
///
/// Returns `unauthenticated` for bad signatures, expired tokens, and
/// malformed input.
pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims, GameError> {
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| GameError::unauthenticated("invalid or expired session token"))
}

/// The stored digest of a token.
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn issue(is_mobile: bool) -> IssuedSession {
        issue_session(
            UserId::new(),
            Some(TenantId::new()),
            &RoleName::normalize("admin"),
            is_mobile,
            SessionLifetimes::default(),
            SECRET,
            Some(String::from("fp-1")),
            Some(String::from("203.0.113.9")),
        )
        .unwrap()
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let issued = issue(false);
        let claims = verify_token(&issued.token, SECRET).unwrap();
        assert_eq!(claims.session_id, issued.session.id.into_inner());
        assert_eq!(claims.role, "admin");
        assert!(!claims.is_mobile);
    }

    #[test]
    fn wrong_secret_fails() {
        let issued = issue(false);
        assert!(verify_token(&issued.token, "other-secret").is_err());
    }

    #[test]
    fn key_rotation_invalidates_sessions() {
        let issued = issue(true);
        assert!(verify_token(&issued.token, SECRET).is_ok());
        assert!(verify_token(&issued.token, "rotated").is_err());
    }

    #[test]
    fn mobile_sessions_live_longer() {
        let web = issue(false);
        let mobile = issue(true);
        assert!(mobile.session.expires_at > web.session.expires_at);
    }

    #[test]
    fn mobile_agents_detected() {
        assert!(is_mobile_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"));
        assert!(is_mobile_agent("Mozilla/5.0 (Linux; Android 14)"));
        assert!(!is_mobile_agent("Mozilla/5.0 (X11; Linux x86_64)"));
    }

    #[test]
    fn session_row_stores_digest_not_token() {
        let issued = issue(false);
        assert_ne!(issued.session.token_digest, issued.token);
        assert_eq!(issued.session.token_digest, digest(&issued.token));
    }
}
