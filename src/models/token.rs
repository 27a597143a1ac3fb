//! Refresh token models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Refresh token stored in database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    /// Opaque token value (64 lowercase hex characters), primary key
    pub token: String,

    /// Owner of the token
    pub user_id: Uuid,

    /// When the token was created
    pub created_at: DateTime<Utc>,

    /// When the row was last updated
    pub updated_at: DateTime<Utc>,

    /// When the token stops being redeemable
    pub expires_at: DateTime<Utc>,

    /// When the token was revoked (None = never)
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Create a new, unrevoked token issued at `now`
    pub fn new(
        token: impl Into<String>,
        user_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        }
    }

    /// Whether a revocation timestamp has been reached at `now`
    pub fn is_revoked_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_some_and(|revoked_at| now >= revoked_at)
    }

    /// Whether the token is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the token is usable (not expired and not revoked)
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked_at(now) && !self.is_expired_at(now)
    }
}

/// Response of `POST /api/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}
