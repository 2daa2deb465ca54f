//! Error types for the fetch coordinator, cache and refresh pipeline
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Admission Error ==
/// Reasons a fetch could not be started. Reported synchronously, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// A fetch with the same key is already running
    #[error("Fetch already active: {0}")]
    AlreadyActive(String),

    /// Every concurrency slot is taken
    #[error("Maximum concurrent fetches reached ({limit})")]
    MaxConcurrentReached { limit: usize },
}

// == Persistence Error ==
/// Failures of the cache's storage backend.
///
/// The cache absorbs these: reads degrade to a miss, writes to a no-op.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read entry '{key}': {source}")]
    ReadFailure {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write entry '{key}': {source}")]
    WriteFailure {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode entry '{key}': {source}")]
    DecodeFailure {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

// == Timeout Error ==
/// The deadline passed before the guarded operation finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation timed out after {after:?}")]
pub struct TimeoutError {
    pub after: Duration,
}

// == Fetch Error ==
/// Failure of a single fetch operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure talking to the source
    #[error("Network error: {0}")]
    Network(String),

    /// The source answered with something that could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// The operation observed its cancellation token and stopped
    #[error("Fetch cancelled")]
    Cancelled,

    /// The worker task ended without reporting a result (panic or runtime shutdown)
    #[error("Fetch aborted before completion")]
    Aborted,

    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

// == Refresh Error ==
/// Terminal outcome of a refresh run that did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The batch worker ended without delivering its result
    #[error("Refresh batch aborted")]
    Aborted,
}

// == Api Error ==
/// Error type for the operator HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Nothing cached under the requested key
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Refresh(RefreshError::Admission(AdmissionError::AlreadyActive(_))) => {
                StatusCode::CONFLICT
            }
            ApiError::Refresh(RefreshError::Admission(
                AdmissionError::MaxConcurrentReached { .. },
            )) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Refresh(RefreshError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Refresh(RefreshError::Aborted) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the operator surface.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        let cases = vec![
            (ApiError::NotFound("feed".to_string()), StatusCode::NOT_FOUND),
            (
                ApiError::Refresh(AdmissionError::AlreadyActive("refresh".to_string()).into()),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Refresh(AdmissionError::MaxConcurrentReached { limit: 5 }.into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Refresh(
                    TimeoutError {
                        after: Duration::from_secs(30),
                    }
                    .into(),
                ),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ApiError::Refresh(RefreshError::Aborted),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_admission_error_messages() {
        let err = AdmissionError::AlreadyActive("feed-1".to_string());
        assert!(err.to_string().contains("feed-1"));

        let err = AdmissionError::MaxConcurrentReached { limit: 5 };
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_timeout_converts_into_fetch_error() {
        let err: FetchError = TimeoutError {
            after: Duration::from_millis(10),
        }
        .into();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
