//! Password hashing and verification.
//!
//! bcrypt with the library's default cost. Verification failures and
//! malformed hashes both read as "invalid credentials" to the caller;
//! the distinction is logged, never surfaced.

use boomtown_types::GameError;

/// The minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password for storage.
///
/// # Errors
///
/// Returns `invalid_request` for passwords under the minimum length and
/// `internal` if hashing itself fails.
pub fn hash_password(plain: &str) -> Result<String, GameError> {
    if plain.len() < MIN_PASSWORD_LEN {
        return Err(GameError::invalid("password must be at least 8 characters"));
    }
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| GameError::internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash verifies as `false` (and is logged); it never
/// leaks detail to the caller.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    match bcrypt::verify(plain, stored) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash failed to parse");
            false
        }
    }
}
