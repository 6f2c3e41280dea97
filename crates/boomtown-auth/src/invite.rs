//! Invitations: provisional users activated by a one-time token.
//!
//! An admin creates a provisional user carrying an invitation token with
//! a 72-hour expiry. Accepting the invitation activates the user and
//! immediately issues a session, mirroring the magic-link flow.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use boomtown_types::GameError;

/// A freshly issued invitation.
#[derive(Debug, Clone)]
pub struct Invitation {
    /// The one-time token e-mailed to the invitee.
    pub token: String,
    /// When the invitation lapses.
    pub expires_at: DateTime<Utc>,
}

/// Issue a new invitation token.
pub fn issue_invitation(validity_hours: i64) -> Invitation {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    Invitation {
        token: URL_SAFE_NO_PAD.encode(bytes),
        expires_at: Utc::now() + Duration::hours(validity_hours),
    }
}

/// Validate an invitation acceptance.
///
/// On success the caller activates the user, clears the stored token,
/// and issues a session.
///
/// # Errors
///
/// Returns `unauthenticated` for a missing, expired, or mismatched
/// token.
pub fn verify_invitation(
    stored_token: Option<&str>,
    stored_expiry: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), GameError> {
    let (Some(token), Some(expiry)) = (stored_token, stored_expiry) else {
        return Err(GameError::unauthenticated("no invitation outstanding"));
    };
    if now > expiry {
        return Err(GameError::unauthenticated("invitation has expired"));
    }
    if token != submitted {
        return Err(GameError::unauthenticated("invitation does not match"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accept_within_window() {
        let invitation = issue_invitation(72);
        assert!(verify_invitation(
            Some(&invitation.token),
            Some(invitation.expires_at),
            &invitation.token,
            Utc::now(),
        )
        .is_ok());
    }

    #[test]
    fn expired_invitation_fails() {
        let invitation = issue_invitation(72);
        let late = invitation.expires_at + Duration::minutes(1);
        assert!(verify_invitation(
            Some(&invitation.token),
            Some(invitation.expires_at),
            &invitation.token,
            late,
        )
        .is_err());
    }

    #[test]
    fn wrong_token_fails() {
        let invitation = issue_invitation(72);
        assert!(verify_invitation(
            Some(&invitation.token),
            Some(invitation.expires_at),
            "someone-elses-token",
            Utc::now(),
        )
        .is_err());
    }
}
