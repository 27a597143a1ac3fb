//! HTTP error responses
//!
//! Maps domain errors to status codes. Bodies are `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::error::{AuthError, ChirpError, DbError, RefreshError};

/// Error returned by request handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Internal failure; the cause is logged, the client sees a generic message
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound => Self::not_found("Not found"),
            DbError::ConstraintViolation(_) => Self::new(StatusCode::CONFLICT, "Already exists"),
            other => Self::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Header(e) => {
                tracing::debug!(error = %e, "Rejected authorization header");
                Self::unauthorized("Couldn't find a valid authorization header")
            }
            AuthError::Token(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                Self::unauthorized("Couldn't validate token")
            }
            AuthError::Refresh(RefreshError::NotFound | RefreshError::Expired) => {
                Self::unauthorized("Invalid refresh token")
            }
            AuthError::Refresh(RefreshError::Storage(e)) => Self::from(e),
            AuthError::Refresh(e @ RefreshError::EntropyUnavailable) => Self::internal(e),
            AuthError::InvalidCredentials => Self::unauthorized("Incorrect email or password"),
            AuthError::InvalidApiKey | AuthError::WebhookDisabled => {
                Self::unauthorized("Invalid API key")
            }
            AuthError::Database(e) => Self::from(e),
            e @ (AuthError::Password(_) | AuthError::Internal(_)) => Self::internal(e),
        }
    }
}

impl From<ChirpError> for ApiError {
    fn from(error: ChirpError) -> Self {
        match error {
            ChirpError::TooLong { .. } => Self::bad_request("Chirp is too long"),
        }
    }
}
