/// Unified error types for the AdWatch moderation service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the moderation service
#[derive(Error, Debug)]
pub enum ModError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown decision action submitted by staff
    #[error("Invalid moderation action: {0}")]
    InvalidAction(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Submission rejected by policy. Carries the computed score; rule
    /// detail is deliberately absent so it cannot reach submitters.
    #[error("Listing blocked by moderation (score {score})")]
    ModerationBlocked { score: i64 },

    /// A backing store was unreachable or timed out
    #[error("Dependency failure: {0}")]
    Dependency(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

/// Structured error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// Convert ModError to HTTP response
impl IntoResponse for ModError {
    fn into_response(self) -> Response {
        let score = match &self {
            ModError::ModerationBlocked { score } => Some(*score),
            _ => None,
        };

        let (status, error_code, message) = match self {
            ModError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ModError::Authorization(_) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                self.to_string(),
            ),
            ModError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ModError::InvalidAction(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidAction",
                self.to_string(),
            ),
            ModError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            ModError::ModerationBlocked { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ModerationBlocked",
                self.to_string(),
            ),
            ModError::Dependency(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DependencyFailure",
                "A backing store is unavailable".to_string(), // Don't leak details
            ),
            ModError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ModError::Database(_) | ModError::Internal(_) | ModError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            score,
        });

        (status, body).into_response()
    }
}

/// Result type alias for moderation operations
pub type ModResult<T> = Result<T, ModError>;
