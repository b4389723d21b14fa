//! Error types for the clinic backend
//!
//! Every rejected operation maps to exactly one variant. Variants carry a
//! human-readable reason; `code()` gives a stable machine-readable tag.

use hyper::StatusCode;

/// Main error type for clinic operations
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// Missing, invalid or expired token; bad credentials; stale credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Caller holds the wrong role for the operation
    #[error("Forbidden: {0}")]
    Authorization(String),

    /// Malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource is absent, or exists but belongs to someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal state transition or duplicate action
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClinicError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "AUTHENTICATION_FAILED",
            Self::Authorization(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DB_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for ClinicError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for clinic operations
pub type Result<T> = std::result::Result<T, ClinicError>;
