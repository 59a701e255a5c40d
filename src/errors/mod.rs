//! Error handling module for the upvote board backend.
//!
//! Every error kind maps to a callable status string and an HTTP status code.
//! The mapping lives in one table here so the transport boundary stays explicit.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Callable status strings as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const FAILED_PRECONDITION: &str = "FAILED_PRECONDITION";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ABORTED: &str = "ABORTED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Message shown to callers for failures whose details stay server-side.
const OPAQUE_MESSAGE: &str = "Internal error";

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No resolved caller identity
    Unauthenticated(String),
    /// Payload failed validation
    InvalidArgument(String),
    /// Operation not allowed in the current state (e.g. duplicate upvote)
    FailedPrecondition(String),
    /// Document not found
    NotFound(String),
    /// Optimistic concurrency retries exhausted
    Aborted(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::FailedPrecondition(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Aborted(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the callable status string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => codes::UNAUTHENTICATED,
            AppError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            AppError::FailedPrecondition(_) => codes::FAILED_PRECONDITION,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Aborted(_) => codes::ABORTED,
            AppError::Database(_) => codes::INTERNAL,
            AppError::Internal(_) => codes::INTERNAL,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthenticated(msg) => msg.clone(),
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::FailedPrecondition(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Aborted(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    /// Message safe to send over the wire. Store and internal failures are opaque.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => OPAQUE_MESSAGE.to_string(),
            other => other.message(),
        }
    }

    /// Rebuild an error from a callable status string received over the wire.
    pub fn from_status(status: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            codes::UNAUTHENTICATED => AppError::Unauthenticated(message),
            codes::INVALID_ARGUMENT => AppError::InvalidArgument(message),
            codes::FAILED_PRECONDITION => AppError::FailedPrecondition(message),
            codes::NOT_FOUND => AppError::NotFound(message),
            codes::ABORTED => AppError::Aborted(message),
            _ => AppError::Internal(message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        AppError::Internal(format!("Transport error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub status: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: ErrorDetails {
                status: error.error_code().to_string(),
                message: error.public_message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
