//! Error types for talentvote.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Daily free-vote cap exceeded.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Competition policy forbids the action (e.g. online vote on an in-person-only event).
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Competition or contestant is in the wrong state, or the two do not belong together.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Payment gateway rejected the charge. Carries the gateway's cleaned message.
    #[error("{0}")]
    Payment(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::PolicyViolation(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Payment(_) => StatusCode::PAYMENT_REQUIRED,

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::ExternalService(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::PolicyViolation(_) => "POLICY_VIOLATION",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Payment(_) => "PAYMENT_ERROR",
            Self::Database(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message shown to API clients. Server-side details stay in the log.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Config(_) | Self::ExternalService(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            Self::Internal(_) => {
                "Something went wrong on our side. Please contact support if it persists."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::RateLimited("cap".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::PolicyViolation("in person".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidState("draft".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Payment("declined".into()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_storage_error_hides_details() {
        let err = AppError::Database("relation \"vote\" does not exist".into());
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(!err.public_message().contains("relation"));
    }

    #[test]
    fn test_payment_error_passes_gateway_message_through() {
        let err = AppError::Payment("The credit card has expired.".into());
        assert_eq!(err.public_message(), "The credit card has expired.");
    }
}
