//! Error handling for the libris HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard error envelope for every failed request.
///
/// `error` is a stable category string clients may branch on; `message` is
/// meant for humans.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric HTTP status code
    pub status: u16,
    /// Stable error category
    pub error: String,
    /// Human-readable description
    pub message: String,
    /// Generation time, RFC 3339 UTC
    pub timestamp: String,
    /// Identifier correlating the response with server logs
    pub trace_id: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("duplicate: {message}")]
    Duplicate { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a duplicate resource error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Duplicate { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable category string carried in the `error` field.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "Validation Failed",
            AppError::NotFound { .. } => "Resource Not Found",
            AppError::Duplicate { .. } => "Duplicate Resource",
            AppError::Conflict { .. } => "Conflict",
            AppError::Internal(_) => "Internal Server Error",
        }
    }

    /// Render the envelope without consuming the error.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            AppError::Validation { message }
            | AppError::NotFound { message }
            | AppError::Duplicate { message }
            | AppError::Conflict { message } => message.clone(),
            AppError::Internal(e) => e.to_string(),
        };

        let now = OffsetDateTime::now_utc();
        let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());

        ErrorBody {
            status: self.status().as_u16(),
            error: self.category().to_string(),
            message,
            timestamp,
            trace_id: Uuid::now_v7().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.to_body();

        if status.is_server_error() {
            tracing::error!(
                trace_id = %body.trace_id,
                error = %body.error,
                status_code = %body.status,
                cause = ?self,
                "request failed"
            );
        } else {
            tracing::warn!(
                trace_id = %body.trace_id,
                error = %body.error,
                status_code = %body.status,
                message = %body.message,
                "request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: AppError) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::validation("title: must not be blank");

        match &error {
            AppError::Validation { message } => {
                assert_eq!(message, "title: must not be blank");
            }
            _ => panic!("Expected Validation error"),
        }
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.category(), "Validation Failed");
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = body_of(AppError::not_found("Book not found with id: 9")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status, 404);
        assert_eq!(body.error, "Resource Not Found");
        assert_eq!(body.message, "Book not found with id: 9");
        assert!(Uuid::parse_str(&body.trace_id).is_ok());
        assert!(OffsetDateTime::parse(&body.timestamp, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_is_client_error() {
        let (status, body) = body_of(AppError::duplicate("Book with ISBN X already exists")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Duplicate Resource");
        assert!(body.message.contains('X'));
    }

    #[tokio::test]
    async fn test_conflict_envelope() {
        let (status, body) = body_of(AppError::conflict("stale")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.status, 409);
        assert_eq!(body.error, "Conflict");
    }

    #[tokio::test]
    async fn test_internal_error_mapping() {
        let internal_error = anyhow::anyhow!("Database connection failed");
        let (status, body) = body_of(AppError::Internal(internal_error)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, "Database connection failed");
    }
}
