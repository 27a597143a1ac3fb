//! Application error types for chirpy
//!
//! This module defines the error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling. None of them
//! know about HTTP; the server layer maps them to status codes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::server::ServerError;

/// Errors raised while extracting credentials from the `Authorization` header
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Header absent or empty
    #[error("Authorization header is missing or empty")]
    MalformedHeader,

    /// Header present but not `<Scheme> <credential>` with the expected scheme
    #[error("Authorization header has the wrong scheme or format")]
    WrongScheme,
}

/// Session token (JWT) errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature did not verify, the algorithm is not HS256, or the secret is empty
    #[error("Invalid token signature")]
    BadSignature,

    /// Current time is at or after the `exp` claim
    #[error("Token expired")]
    Expired,

    /// Wrong segment count, undecodable segments or a non-UUID subject
    #[error("Malformed token")]
    MalformedToken,

    /// Token could not be signed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Plaintext does not match the stored hash
    #[error("Password does not match")]
    Mismatch,

    /// Stored hash is not a valid PHC string
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Hashing failed
    #[error("Password hashing failed: {0}")]
    HashFailed(String),
}

/// Chirp validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChirpError {
    /// Body longer than the allowed number of characters
    #[error("Chirp is too long ({length} > {max} characters)")]
    TooLong { length: usize, max: usize },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection thread error
    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Refresh token lifecycle errors
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Token does not exist, or its owner could not be resolved
    #[error("Refresh token not found")]
    NotFound,

    /// Token has been revoked or is past its expiry
    #[error("Refresh token expired or revoked")]
    Expired,

    /// The OS random source could not supply bytes
    #[error("Secure random source unavailable")]
    EntropyUnavailable,

    /// Storage failure, surfaced as-is
    #[error("Refresh token storage error: {0}")]
    Storage(#[from] DbError),
}

/// Errors returned by the authentication service
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential extraction failed
    #[error("Invalid authorization header: {0}")]
    Header(#[from] HeaderError),

    /// Session token rejected
    #[error("Invalid session token: {0}")]
    Token(#[from] TokenError),

    /// Refresh token rejected or storage failed
    #[error("Refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// Unknown email or wrong password
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Webhook API key did not match
    #[error("Invalid API key")]
    InvalidApiKey,

    /// No webhook key is configured
    #[error("Webhook API key is not configured")]
    WebhookDisabled,

    /// Password hashing failed
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Blocking task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Top-level error for process startup and shutdown
///
/// It aggregates all domain-specific error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Storage could not be opened
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Authentication setup failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP server failed to bind or serve
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}
