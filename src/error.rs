//! Registrar error types with HTTP status code mapping.
//!
//! [`RegistrarError`] is the central error type of the crate. The three
//! client-facing kinds are [`RegistrarError::Connection`],
//! [`RegistrarError::Registration`] and [`RegistrarError::Timeout`]; each
//! carries the endpoint (and action, where there is one) it happened on.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body of the admin API.
///
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: unknown role 'observer'",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category      | HTTP Status               |
/// |-----------|---------------|---------------------------|
/// | 1000–1999 | Validation    | 400 Bad Request           |
/// | 2000–2999 | Not available | 404 Not Found             |
/// | 3000–3999 | Server        | 500 Internal Server Error |
/// | 5000–5999 | Remote peer   | 502 / 504                 |
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    /// Connecting to, or checking the liveness of, a remote endpoint failed.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// `host:port` of the remote side.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// The registrar answered with an error status, the request could not
    /// be sent, or the wait was interrupted.
    #[error("{action} on registrar {endpoint} failed: {message}")]
    Registration {
        /// Wire action of the request.
        action: String,
        /// `host:port` of the registrar.
        endpoint: String,
        /// Server-supplied or local cause.
        message: String,
    },

    /// No reply arrived within the request timeout.
    #[error("{action} on registrar {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// Wire action of the request.
        action: String,
        /// `host:port` of the registrar.
        endpoint: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A frame or envelope could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Caller-supplied input failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested facility is not running on this node.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Local socket failure (bind, accept).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistrarError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Protocol(_) => 1002,
            Self::NotAvailable(_) => 2001,
            Self::Io(_) => 3000,
            Self::Connection { .. } => 5001,
            Self::Registration { .. } => 5002,
            Self::Timeout { .. } => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::NotAvailable(_) => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Connection { .. } | Self::Registration { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Returns `true` for the kinds a caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Registration { .. } | Self::Timeout { .. }
        )
    }
}

impl IntoResponse for RegistrarError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = RegistrarError::Timeout {
            action: "findPublisher".to_string(),
            endpoint: "fe:8888".to_string(),
            timeout: Duration::from_secs(10),
        };
        let text = err.to_string();
        assert!(text.contains("findPublisher"));
        assert!(text.contains("fe:8888"));
    }

    #[test]
    fn status_mapping() {
        let err = RegistrarError::InvalidRequest("bad".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
        assert!(!err.is_retryable());

        let err = RegistrarError::Connection {
            endpoint: "proxy:7771".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_retryable());
    }
}
