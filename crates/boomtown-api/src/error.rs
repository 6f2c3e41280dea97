//! The response envelope and error mapping for the API server.
//!
//! Every response carries a top-level `success` boolean and either
//! `data` or `error {kind, message}`. [`ApiError`] wraps the shared
//! [`GameError`] taxonomy and maps each kind onto its status code;
//! rate-limited responses carry a `Retry-After` hint. Stack traces and
//! internal detail never cross this boundary.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use boomtown_types::{ErrorKind, GameError};

/// The API-layer error: a [`GameError`] plus an optional retry hint.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{inner}")]
pub struct ApiError {
    /// The underlying taxonomy error.
    pub inner: GameError,
    /// Seconds until a rate-limited caller may retry.
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Wrap a taxonomy error.
    pub const fn new(inner: GameError) -> Self {
        Self {
            inner,
            retry_after_secs: None,
        }
    }

    /// A rate-limit rejection with its retry hint.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            inner: GameError::rate_limited(format!(
                "too many attempts, retry in {retry_after_secs}s"
            )),
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(inner: GameError) -> Self {
        Self::new(inner)
    }
}

impl From<boomtown_db::DbError> for ApiError {
    fn from(err: boomtown_db::DbError) -> Self {
        // Uniqueness violations surface as conflicts; everything else in
        // the data layer is internal.
        let inner = if err.is_unique_violation() {
            GameError::conflict("a record with that value already exists")
        } else {
            tracing::error!(error = %err, "data layer failure");
            GameError::internal("internal storage error")
        };
        Self::new(inner)
    }
}

/// The status code for an error kind.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        // Game-rule violations and conflicts are client errors.
        ErrorKind::PreconditionFailed | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.inner.kind);
        let body = json!({
            "success": false,
            "error": {
                "kind": self.inner.kind,
                "message": self.inner.message,
            },
        });
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// A `200 OK` success envelope.
pub fn ok<T: serde::Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

/// A `201 Created` success envelope.
pub fn created<T: serde::Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_documented_statuses() {
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::PreconditionFailed), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rate_limited_carries_retry_hint() {
        let err = ApiError::rate_limited(42);
        assert_eq!(err.retry_after_secs, Some(42));
        assert!(err.inner.message.contains("42s"));
    }
}
