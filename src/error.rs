//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

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
///     "code": 2001,
///     "message": "member not found: ...",
///     "details": null
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
    /// Numeric error code.
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
/// | Range     | Category          | HTTP Status                |
/// |-----------|-------------------|----------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request            |
/// | 2000–2499 | Not Found         | 404 Not Found              |
/// | 2500–2999 | Conflict          | 409 Conflict               |
/// | 3000–3999 | Server            | 500 Internal Server Error  |
/// | 4000–4999 | Network-Specific  | 422 Unprocessable Entity   |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Member with the given ID was not found.
    #[error("member not found: {0}")]
    MemberNotFound(uuid::Uuid),

    /// No member carries the given referral code.
    #[error("referral code not recognized: {0}")]
    ReferralCodeNotFound(String),

    /// Reward claim with the given ID was not found.
    #[error("claim not found: {0}")]
    ClaimNotFound(uuid::Uuid),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Assigning the sponsor would make the member their own ancestor.
    #[error("sponsor assignment would create a cycle for member {0}")]
    SponsorCycle(uuid::Uuid),

    /// The member already has a sponsor; the forest allows one parent.
    #[error("member {0} already has a sponsor")]
    SponsorAlreadySet(uuid::Uuid),

    /// Persisted sponsor links are inconsistent (cycle or dangling link
    /// observed at read time).
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// Illegal reward-claim state transition.
    #[error("invalid claim transition from {from} to {to}")]
    InvalidTransition {
        /// Status the claim currently holds.
        from: String,
        /// Status the caller attempted to move to.
        to: String,
    },

    /// Optimistic-concurrency check failed on a claim update.
    #[error("concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MemberNotFound(_) => 2001,
            Self::ClaimNotFound(_) => 2002,
            Self::ReferralCodeNotFound(_) => 2003,
            Self::InvalidTransition { .. } => 2501,
            Self::ConcurrencyConflict(_) => 2502,
            Self::SponsorCycle(_) => 4001,
            Self::SponsorAlreadySet(_) => 4002,
            Self::DataIntegrity(_) => 4003,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MemberNotFound(_) | Self::ClaimNotFound(_) | Self::ReferralCodeNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidTransition { .. } | Self::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            Self::SponsorCycle(_) | Self::SponsorAlreadySet(_) | Self::DataIntegrity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
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
