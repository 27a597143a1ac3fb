//! Database layer for chirpy
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Chirp, RefreshToken, User};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a new user
    ///
    /// Fails with `DbError::ConstraintViolation` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<(), DbError>;

    /// Get a user by email address
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Get a user by ID
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Replace a user's email and password hash
    ///
    /// Returns the updated user, or `DbError::NotFound` for an unknown ID.
    async fn update_user_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError>;

    /// Grant the Chirpy Red membership
    async fn upgrade_user_to_chirpy_red(&self, id: Uuid) -> Result<(), DbError>;

    /// Delete every user (chirps and refresh tokens cascade)
    ///
    /// Returns the number of deleted users
    async fn delete_all_users(&self) -> Result<u64, DbError>;

    // =========================================================================
    // Chirp operations
    // =========================================================================

    /// Insert a chirp
    async fn create_chirp(&self, chirp: &Chirp) -> Result<(), DbError>;

    /// List chirps oldest first, optionally only those of one author
    async fn list_chirps(&self, author_id: Option<Uuid>) -> Result<Vec<Chirp>, DbError>;

    /// Get a chirp by ID
    async fn get_chirp(&self, id: Uuid) -> Result<Option<Chirp>, DbError>;

    /// Delete a chirp by ID
    async fn delete_chirp(&self, id: Uuid) -> Result<(), DbError>;

    // =========================================================================
    // Refresh token operations
    // =========================================================================

    /// Persist a refresh token
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DbError>;

    /// Look up a refresh token record
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, DbError>;

    /// Look up the user owning a refresh token
    async fn find_refresh_token_owner(&self, token: &str) -> Result<Option<User>, DbError>;

    /// Stamp a refresh token as revoked
    ///
    /// Returns `DbError::NotFound` when no such token exists. Revoking twice
    /// overwrites the timestamp.
    async fn revoke_refresh_token(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DbError>;
}
