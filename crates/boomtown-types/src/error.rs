//! The shared error taxonomy for game and platform operations.
//!
//! Every fallible operation in the action layer, auth core, and router
//! surfaces a [`GameError`]: one machine-readable [`ErrorKind`] plus a
//! single human-readable line. Game-rule violations are local to one
//! action and surfaced verbatim to the caller; they are never retried
//! server-side.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The machine-readable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ErrorKind {
    /// Request shape or validation failure.
    InvalidRequest,
    /// Missing or invalid credential.
    Unauthenticated,
    /// Denied by policy.
    Forbidden,
    /// The referenced entity does not exist.
    NotFound,
    /// A game-rule precondition was violated (insufficient cash, license
    /// exhausted, in prison, tier locked, inactive).
    PreconditionFailed,
    /// A uniqueness or double-submission conflict.
    Conflict,
    /// A rate limit was exceeded.
    RateLimited,
    /// An upstream capability (moderation, email, storage) is unavailable.
    UpstreamUnavailable,
    /// An unexpected internal failure.
    Internal,
}

/// A single failure: kind + one human-readable line.
///
/// Stack traces and internal detail never cross this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[error("{kind:?}: {message}")]
#[ts(export, export_to = "bindings/")]
pub struct GameError {
    /// The machine-readable classification.
    pub kind: ErrorKind,
    /// One human-readable line describing the violated rule.
    pub message: String,
}

impl GameError {
    /// Construct an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A request-shape validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// A missing or invalid credential.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// A policy denial.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// A missing entity.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A game-rule violation.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    /// A uniqueness or double-submission conflict.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// A rate-limit rejection.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// An upstream-capability failure.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    /// An unexpected internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(GameError::precondition("in prison").kind, ErrorKind::PreconditionFailed);
        assert_eq!(GameError::conflict("name taken").kind, ErrorKind::Conflict);
        assert_eq!(GameError::rate_limited("slow down").kind, ErrorKind::RateLimited);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PreconditionFailed).unwrap_or_default();
        assert_eq!(json, "\"precondition_failed\"");
    }

    #[test]
    fn message_is_one_line() {
        let err = GameError::precondition("insufficient cash");
        assert!(!err.message.contains('\n'));
        assert_eq!(err.to_string(), "PreconditionFailed: insufficient cash");
    }
}
