//! Time-based one-time passwords and recovery codes.
//!
//! TOTP per RFC 6238 over HMAC-SHA-256 with a 30-second step and 6
//! digits; verification accepts one step of clock skew either side.
//! Enrollment hands the user the shared secret plus ten recovery codes;
//! only SHA-256 digests of the codes are stored, and each code is
//! consumed on use.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use boomtown_types::GameError;

/// Seconds per TOTP step.
const STEP_SECONDS: i64 = 30;

/// Accepted clock skew, in steps, either side of now.
const SKEW_STEPS: i64 = 1;

/// Number of recovery codes issued at enrollment.
const RECOVERY_CODE_COUNT: usize = 10;

/// A fresh TOTP enrollment: the shared secret and one-time recovery
/// codes. The plain codes are shown to the user exactly once; only
/// their digests are stored.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// The shared secret, URL-safe base64.
    pub secret: String,
    /// The plain recovery codes to display once.
    pub recovery_codes: Vec<String>,
    /// The digests to persist.
    pub recovery_digests: Vec<String>,
}

/// Begin TOTP enrollment: generate the secret and recovery codes.
pub fn enroll() -> TotpEnrollment {
    let mut rng = rand::rng();
    let mut secret_bytes = [0u8; 20];
    rng.fill_bytes(&mut secret_bytes);
    let secret = URL_SAFE_NO_PAD.encode(secret_bytes);

    let mut recovery_codes = Vec::with_capacity(RECOVERY_CODE_COUNT);
    let mut recovery_digests = Vec::with_capacity(RECOVERY_CODE_COUNT);
    for _ in 0..RECOVERY_CODE_COUNT {
        let code = format!("{:08x}", rng.next_u32());
        recovery_digests.push(digest_code(&code));
        recovery_codes.push(code);
    }

    TotpEnrollment {
        secret,
        recovery_codes,
        recovery_digests,
    }
}

/// The 6-digit code for a secret at a unix timestamp.
///
/// # Errors
///
/// Returns `internal` if the stored secret fails to decode.
pub fn code_at(secret: &str, unix_seconds: i64) -> Result<String, GameError> {
    let key = URL_SAFE_NO_PAD
        .decode(secret)
        .map_err(|_| GameError::internal("stored TOTP secret is malformed"))?;
    let counter = unix_seconds.div_euclid(STEP_SECONDS);

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|_| GameError::internal("TOTP key setup failed"))?;
    mac.update(&counter.to_be_bytes());
    let bytes = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 section 5.3).
    let offset = usize::from(bytes.last().copied().unwrap_or(0) & 0x0f);
    let slice: [u8; 4] = bytes
        .get(offset..offset.saturating_add(4))
        .and_then(|s| s.try_into().ok())
        .unwrap_or([0; 4]);
    let binary = u32::from_be_bytes(slice) & 0x7fff_ffff;
    Ok(format!("{:06}", binary % 1_000_000))
}

/// Verify a submitted 6-digit code, accepting one step of skew.
///
/// # Errors
///
/// Returns `unauthenticated` for a wrong code and `internal` for a
/// malformed stored secret.
pub fn verify_code(secret: &str, submitted: &str, unix_seconds: i64) -> Result<(), GameError> {
    for skew in -SKEW_STEPS..=SKEW_STEPS {
        let probe = unix_seconds.saturating_add(skew.saturating_mul(STEP_SECONDS));
        if code_at(secret, probe)? == submitted {
            return Ok(());
        }
    }
    Err(GameError::unauthenticated("two-factor code does not match"))
}

/// The stored digest of a recovery code.
pub fn digest_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify a recovery code against the stored digests.
///
/// Returns the remaining digests with the used one removed; the caller
/// persists them so the code cannot be reused.
///
/// # Errors
///
/// Returns `unauthenticated` when no digest matches.
pub fn consume_recovery_code(
    digests: &[String],
    submitted: &str,
) -> Result<Vec<String>, GameError> {
    let submitted_digest = digest_code(submitted.trim());
    if !digests.contains(&submitted_digest) {
        return Err(GameError::unauthenticated("recovery code does not match"));
    }
    Ok(digests
        .iter()
        .filter(|d| **d != submitted_digest)
        .cloned()
        .collect())
}
