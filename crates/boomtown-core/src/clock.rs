//! The tick clock: mapping wall time onto tick boundaries.
//!
//! A tick boundary is `floor(unix_seconds / cadence_seconds)`. The cron
//! scheduler fires on a fixed cadence and every firing computes the
//! boundary for "now"; re-running inside the same boundary is a no-op by
//! construction (the processor compares boundaries, never wall instants).

use chrono::{DateTime, Datelike, Utc};

/// Errors from clock computations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The configured cadence is zero.
    #[error("tick cadence must be at least one minute")]
    ZeroCadence,
}

/// Compute the tick boundary for an instant at the given cadence.
///
/// # Errors
///
/// Returns [`ClockError::ZeroCadence`] for a zero cadence.
pub fn tick_boundary(now: DateTime<Utc>, cadence_minutes: u32) -> Result<i64, ClockError> {
    if cadence_minutes == 0 {
        return Err(ClockError::ZeroCadence);
    }
    let cadence_secs = i64::from(cadence_minutes).saturating_mul(60);
    Ok(now.timestamp().div_euclid(cadence_secs))
}

/// Today's UTC weekday as `0 = Monday .. 6 = Sunday`, the encoding the
/// police-strike-day comparison uses.
pub fn weekday_utc(now: DateTime<Utc>) -> u8 {
    u8::try_from(now.weekday().num_days_from_monday()).unwrap_or(0)
}
