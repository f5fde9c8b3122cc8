//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type for the crate. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "conflict: not arrived yet"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`ServiceError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                    |
/// |-----------|--------------------|--------------------------------|
/// | 1000–1999 | Validation / Auth  | 400 Bad Request / 401          |
/// | 2000–2999 | State / Not Found  | 404 Not Found / 409 Conflict   |
/// | 3000–3999 | Server             | 500 Internal Server Error      |
/// | 4000–4999 | Payment Gateway    | 503 Unavailable / 502 Bad Gateway |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Missing or unknown bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Ride, chair, or payment token does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation is not valid for the ride's current lifecycle state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A record the data model guarantees is missing.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The payment gateway could not be reached after all retries.
    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    /// The payment gateway answered with a failure.
    #[error("payment gateway error: {0}")]
    Upstream(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Unauthorized(_) => 1002,
            Self::NotFound(_) => 2001,
            Self::Conflict(_) => 2002,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::InternalInconsistency(_) => 3002,
            Self::Transport(_) => 4001,
            Self::Upstream(_) => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalInconsistency(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the caller caused the failure and retrying unchanged is
    /// pointless.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Unauthorized(_) | Self::NotFound(_) | Self::Conflict(_)
        )
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
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
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            ServiceError::Validation(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Upstream(String::new()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::InternalInconsistency(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_errors_are_flagged() {
        assert!(ServiceError::NotFound("ride".into()).is_client_error());
        assert!(!ServiceError::Transport("timeout".into()).is_client_error());
    }

    #[test]
    fn response_carries_code_and_status() {
        let response = ServiceError::NotFound("ride not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
