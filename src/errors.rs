//! Structured error types with stable codes for API clients
//!
//! Every error carries a machine-readable code, an HTTP status, and a
//! human-readable message, serialized as a JSON body by the IntoResponse impl.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Validation Errors (400)
    InvalidInput { field: String, reason: String },
    MissingMessage,
    MissingFields,
    EmailTaken(String),

    // Auth Errors (401)
    TokenMissing,
    TokenInvalid(String),
    InvalidCredentials,
    TaskNotOwned(String),

    // Not Found Errors (404)
    TaskNotFound(String),
    UserNotFound(String),

    // Classifier quota (429)
    QuotaExceeded,

    // Internal Errors (500)
    ClassifierFailed(String),
    StorageError(String),
    SerializationError(String),

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl AppError {
    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::MissingMessage => "MISSING_MESSAGE",
            Self::MissingFields => "MISSING_FIELDS",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::TokenMissing => "TOKEN_MISSING",
            Self::TokenInvalid(_) => "TOKEN_INVALID",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TaskNotOwned(_) => "TASK_NOT_OWNED",
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::QuotaExceeded => "AI_QUOTA_EXCEEDED",
            Self::ClassifierFailed(_) => "CLASSIFIER_FAILED",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. }
            | Self::MissingMessage
            | Self::MissingFields
            | Self::EmailTaken(_) => StatusCode::BAD_REQUEST,

            Self::TokenMissing
            | Self::TokenInvalid(_)
            | Self::InvalidCredentials
            | Self::TaskNotOwned(_) => StatusCode::UNAUTHORIZED,

            Self::TaskNotFound(_) | Self::UserNotFound(_) => StatusCode::NOT_FOUND,

            Self::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,

            Self::ClassifierFailed(_)
            | Self::StorageError(_)
            | Self::SerializationError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::MissingMessage => "Please provide a message".to_string(),
            Self::MissingFields => "All fields are required".to_string(),
            Self::EmailTaken(email) => format!("Email already registered: {email}"),
            Self::TokenMissing => "Missing authorization token".to_string(),
            Self::TokenInvalid(reason) => format!("Invalid authorization token: {reason}"),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::TaskNotOwned(id) => {
                format!("You are not authorized to modify this activity: {id}")
            }
            Self::TaskNotFound(id) => format!("Activity not found: {id}"),
            Self::UserNotFound(id) => format!("User not found: {id}"),
            Self::QuotaExceeded => {
                "AI usage limit exceeded. Please try again later.".to_string()
            }
            Self::ClassifierFailed(msg) => format!("Classifier request failed: {msg}"),
            Self::StorageError(msg) => format!("Storage error: {msg}"),
            Self::SerializationError(msg) => format!("Serialization error: {msg}"),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

/// Convert from anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Axum IntoResponse implementation for proper HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::TaskNotFound("abc".to_string()).code(),
            "TASK_NOT_FOUND"
        );
        assert_eq!(AppError::QuotaExceeded.code(), "AI_QUOTA_EXCEEDED");
        assert_eq!(AppError::MissingFields.code(), "MISSING_FIELDS");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::MissingMessage.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::TaskNotOwned("t1".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TaskNotFound("t1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::QuotaExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::StorageError("failed".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_quota_message_is_user_facing() {
        assert_eq!(
            AppError::QuotaExceeded.message(),
            "AI usage limit exceeded. Please try again later."
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::UserNotFound("u-42".to_string());
        let response = err.to_response();

        assert_eq!(response.code, "USER_NOT_FOUND");
        assert!(response.message.contains("u-42"));
    }
}
