//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; clients only see a
//! generic message for those.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::GateRejection;
use crate::page::LoginError;
use crate::services::{IdentityError, StorageError};

/// Application-level error type for the registry server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity or session operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Login link request failed.
    #[error(transparent)]
    Login(#[from] LoginError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The authorization gate refused the page entry.
    #[error("Access refused: {0}")]
    Gate(#[from] GateRejection),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access denied.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_fault(&self) -> bool {
        match self {
            Self::Database(_) | Self::Internal(_) => true,
            Self::Identity(err) | Self::Login(LoginError::Identity(err)) => {
                !matches!(err, IdentityError::InvalidEmail)
            }
            Self::Storage(err) => !matches!(err, StorageError::NotFound(_)),
            _ => false,
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Identity(IdentityError::InvalidEmail)
            | Self::Login(
                LoginError::MissingEmail
                | LoginError::InvalidEmail(_)
                | LoginError::Identity(IdentityError::InvalidEmail),
            )
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Identity(_) | Self::Login(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(StorageError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Gate(GateRejection::Halted(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gate(GateRejection::MissingSession) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gate(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Gate(rejection) = self {
            return rejection.into_response();
        }

        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Storage(_) => {
                if status == StatusCode::NOT_FOUND {
                    "Not found".to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            Self::Identity(IdentityError::Session(_)) => "Session error".to_string(),
            Self::Identity(err) => err.to_string(),
            Self::Login(err) => err.to_string(),
            Self::NotFound(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Gate(rejection) => rejection.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in email.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
