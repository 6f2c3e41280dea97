//! Magic links: a one-time URL token paired with a 6-digit manual code.
//!
//! Either credential satisfies the challenge. Tokens expire after a
//! configurable window (15 minutes by default) and are consumed on first
//! successful verification -- the caller clears the stored fields so a
//! second verify fails.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use boomtown_types::GameError;

/// A freshly issued magic-link challenge.
#[derive(Debug, Clone)]
pub struct MagicChallenge {
    /// The URL token (query-string variant).
    pub token: String,
    /// The 6-digit code (manual-entry variant).
    pub code: String,
    /// When both credentials lapse.
    pub expires_at: DateTime<Utc>,
}

/// Issue a new magic-link challenge.
pub fn issue_magic_link(validity_minutes: i64) -> MagicChallenge {
    let mut rng = rand::rng();
    let mut token_bytes = [0u8; 32];
    rng.fill_bytes(&mut token_bytes);

    let code_number = rng.next_u32() % 1_000_000;

    MagicChallenge {
        token: URL_SAFE_NO_PAD.encode(token_bytes),
        code: format!("{code_number:06}"),
        expires_at: Utc::now() + Duration::minutes(validity_minutes),
    }
}

/// What the user supplied to answer the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicAnswer {
    /// The URL token from the e-mailed link.
    Token(String),
    /// The 6-digit code typed by hand.
    Code(String),
}

/// Verify a magic-link answer against the stored challenge.
///
/// On success the caller must clear the stored token, code, and expiry so
/// the challenge cannot be replayed.
///
/// # Errors
///
/// Returns `unauthenticated` for a missing, expired, or mismatched
/// challenge.
pub fn verify_magic_link(
    stored_token: Option<&str>,
    stored_code: Option<&str>,
    stored_expiry: Option<DateTime<Utc>>,
    answer: &MagicAnswer,
    now: DateTime<Utc>,
) -> Result<(), GameError> {
    let Some(expiry) = stored_expiry else {
        return Err(GameError::unauthenticated("no magic link outstanding"));
    };
    if now > expiry {
        return Err(GameError::unauthenticated("magic link has expired"));
    }

    let matched = match answer {
        MagicAnswer::Token(t) => stored_token.is_some_and(|s| constant_time_eq(s, t)),
        MagicAnswer::Code(c) => stored_code.is_some_and(|s| constant_time_eq(s, c)),
    };
    if matched {
        Ok(())
    } else {
        Err(GameError::unauthenticated("magic link does not match"))
    }
}

/// Compare two short credential strings without early exit.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn challenge_has_token_and_six_digit_code() {
        let challenge = issue_magic_link(15);
        assert!(challenge.token.len() >= 40);
        assert_eq!(challenge.code.len(), 6);
        assert!(challenge.code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn either_credential_verifies() {
        let challenge = issue_magic_link(15);
        let now = Utc::now();
        assert!(verify_magic_link(
            Some(&challenge.token),
            Some(&challenge.code),
            Some(challenge.expires_at),
            &MagicAnswer::Token(challenge.token.clone()),
            now,
        )
        .is_ok());
        assert!(verify_magic_link(
            Some(&challenge.token),
            Some(&challenge.code),
            Some(challenge.expires_at),
            &MagicAnswer::Code(challenge.code.clone()),
            now,
        )
        .is_ok());
    }

    #[test]
    fn expired_challenge_fails() {
        let challenge = issue_magic_link(15);
        let later = challenge.expires_at + Duration::seconds(1);
        let result = verify_magic_link(
            Some(&challenge.token),
            Some(&challenge.code),
            Some(challenge.expires_at),
            &MagicAnswer::Token(challenge.token.clone()),
            later,
        );
        assert!(result.is_err());
    }

    #[test]
    fn consumed_challenge_cannot_replay() {
        // After a successful verify the caller clears the stored fields;
        // a second verify then has nothing to match against.
        let challenge = issue_magic_link(15);
        let result = verify_magic_link(
            None,
            None,
            None,
            &MagicAnswer::Token(challenge.token),
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_code_fails() {
        let challenge = issue_magic_link(15);
        let result = verify_magic_link(
            Some(&challenge.token),
            Some(&challenge.code),
            Some(challenge.expires_at),
            &MagicAnswer::Code(String::from("000000")),
            Utc::now(),
        );
        // One-in-a-million collision with the generated code aside.
        if challenge.code != "000000" {
            assert!(result.is_err());
        }
    }
}
