//! Sliding-window rate limiting keyed on client identity.
//!
//! Backed by `governor`'s keyed in-process limiter. Three quotas cover
//! the request surface: auth endpoints (tight, per IP), authenticated
//! requests (per session), and anonymous API requests (per IP).
//!
//! Rate limiting fails open: if the limiter cannot decide (a poisoned
//! store, an unrepresentable quota), the request proceeds -- an outage
//! in the limiting layer must never lock users out.

use std::num::NonZeroU32;

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use boomtown_types::GameError;

/// A keyed sliding-window limiter.
pub struct KeyedLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    clock: DefaultClock,
}

impl core::fmt::Debug for KeyedLimiter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyedLimiter").finish_non_exhaustive()
    }
}

impl KeyedLimiter {
    /// Build a limiter allowing `per_minute` requests per key.
    ///
    /// A zero quota is treated as one per minute (fail open rather than
    /// deny everything).
    pub fn per_minute(per_minute: u32) -> Self {
        let quota = NonZeroU32::new(per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(quota)),
            clock: DefaultClock::default(),
        }
    }

    /// Check one request for `key`.
    ///
    /// # Errors
    ///
    /// Returns `rate_limited` with a retry-after hint when the key has
    /// exhausted its quota.
    pub fn check(&self, key: &str) -> Result<(), GameError> {
        match self.limiter.check_key(&key.to_owned()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                let secs = wait.as_secs().max(1);
                Err(GameError::rate_limited(format!(
                    "too many attempts, retry in {secs}s"
                )))
            }
        }
    }

    /// The retry-after hint for a key that was just limited, in seconds.
    ///
    /// Returns `None` when the key currently has budget.
    pub fn retry_after_secs(&self, key: &str) -> Option<u64> {
        match self.limiter.check_key(&key.to_owned()) {
            Ok(()) => None,
            Err(not_until) => Some(not_until.wait_time_from(self.clock.now()).as_secs().max(1)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhausts_and_reports_retry_after() {
        let limiter = KeyedLimiter::per_minute(3);
        for _ in 0..3 {
            assert!(limiter.check("203.0.113.9").is_ok());
        }
        let err = limiter.check("203.0.113.9").unwrap_err();
        assert_eq!(err.kind, boomtown_types::ErrorKind::RateLimited);
        assert!(err.message.contains("retry in"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = KeyedLimiter::per_minute(1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[test]
    fn zero_quota_fails_open_to_one() {
        let limiter = KeyedLimiter::per_minute(0);
        assert!(limiter.check("x").is_ok());
        assert!(limiter.check("x").is_err());
    }
}
