//! Refresh token manager
//!
//! Refresh tokens are opaque 256-bit random values rendered as 64 lowercase hex
//! characters. They are persisted through the [`Database`] trait; the manager
//! never caches them, so revocation is visible on the next redemption.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, RefreshError};
use crate::models::RefreshToken;

/// Number of random bytes in a refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Default refresh token lifetime (60 days)
pub fn default_refresh_token_ttl() -> Duration {
    Duration::days(60)
}

/// Generate a new refresh token value
///
/// The bytes come from the operating system's secure random source. If that
/// source fails the error is returned instead of falling back to anything
/// weaker.
pub fn generate_refresh_token() -> Result<String, RefreshError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "Secure random source unavailable");
        RefreshError::EntropyUnavailable
    })?;
    Ok(hex::encode(bytes))
}

/// Refresh token lifecycle over a storage backend
pub struct RefreshTokenManager<D: Database> {
    db: Arc<D>,
    ttl: Duration,
}

impl<D: Database> RefreshTokenManager<D> {
    /// Create a new manager issuing tokens valid for `ttl`
    pub fn new(db: Arc<D>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Issue and persist a new refresh token for `owner`
    pub async fn issue(&self, owner: Uuid) -> Result<String, RefreshError> {
        let value = generate_refresh_token()?;
        let now = Utc::now();
        let record = RefreshToken::new(value.clone(), owner, now, now + self.ttl);

        self.db.insert_refresh_token(&record).await?;

        tracing::debug!(user_id = %owner, expires_at = %record.expires_at, "Issued refresh token");
        Ok(value)
    }

    /// Resolve a refresh token to its owner
    ///
    /// The token is neither consumed nor rotated.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, RefreshError> {
        let record = self
            .db
            .find_refresh_token(token)
            .await?
            .ok_or(RefreshError::NotFound)?;

        if !record.is_usable_at(Utc::now()) {
            tracing::debug!(
                user_id = %record.user_id,
                revoked = record.revoked_at.is_some(),
                "Refresh token is revoked or past its expiry"
            );
            return Err(RefreshError::Expired);
        }

        let owner = self
            .db
            .find_refresh_token_owner(token)
            .await?
            .ok_or(RefreshError::NotFound)?;

        Ok(owner.id)
    }

    /// Revoke a refresh token
    ///
    /// Revoking an already revoked token stamps it again and succeeds.
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshError> {
        match self.db.revoke_refresh_token(token, Utc::now()).await {
            Ok(()) => Ok(()),
            Err(DbError::NotFound) => Err(RefreshError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockDatabase;
    use crate::models::User;
    use std::collections::HashSet;

    fn record(owner: Uuid, expires_in: Duration) -> RefreshToken {
        let now = Utc::now();
        RefreshToken::new("ab".repeat(32), owner, now, now + expires_in)
    }

    fn owner_user(id: Uuid) -> User {
        let mut user = User::new("walt@breakingbad.com", "hash");
        user.id = id;
        user
    }

    // Test 1: Generated tokens are 64 lowercase hex characters
    #[test]
    fn test_generate_refresh_token_format() {
        let token = generate_refresh_token().unwrap();

        assert_eq!(token.len(), 64);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    // Test 2: 10,000 generated tokens are unique
    #[test]
    fn test_generate_refresh_token_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let token = generate_refresh_token().unwrap();
            assert_eq!(token.len(), 64);
            assert!(seen.insert(token), "duplicate refresh token generated");
        }
    }

    // Test 3: Issue persists the token for the owner with the configured TTL
    #[tokio::test]
    async fn test_issue_persists_token() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_insert_refresh_token()
            .withf(move |t| {
                t.user_id == owner
                    && t.token.len() == 64
                    && t.revoked_at.is_none()
                    && t.expires_at - t.created_at == Duration::days(60)
            })
            .times(1)
            .returning(|_| Ok(()));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        let token = manager.issue(owner).await.unwrap();
        assert_eq!(token.len(), 64);
    }

    // Test 4: Storage failures on issue are surfaced
    #[tokio::test]
    async fn test_issue_storage_failure() {
        let mut mock = MockDatabase::new();
        mock.expect_insert_refresh_token()
            .returning(|_| Err(DbError::ConstraintViolation("FOREIGN KEY".to_string())));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        let result = manager.issue(Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(RefreshError::Storage(DbError::ConstraintViolation(_)))
        ));
    }

    // Test 5: Redeem a valid token yields the owner
    #[tokio::test]
    async fn test_redeem_valid_token() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_find_refresh_token()
            .returning(move |_| Ok(Some(record(owner, Duration::days(60)))));
        mock.expect_find_refresh_token_owner()
            .returning(move |_| Ok(Some(owner_user(owner))));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert_eq!(manager.redeem(&"ab".repeat(32)).await.unwrap(), owner);
    }

    // Test 6: Unknown token
    #[tokio::test]
    async fn test_redeem_unknown_token() {
        let mut mock = MockDatabase::new();
        mock.expect_find_refresh_token().returning(|_| Ok(None));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(matches!(
            manager.redeem("missing").await,
            Err(RefreshError::NotFound)
        ));
    }

    // Test 7: Revoked token cannot be redeemed
    #[tokio::test]
    async fn test_redeem_revoked_token() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_find_refresh_token().returning(move |_| {
            let mut token = record(owner, Duration::days(60));
            token.revoked_at = Some(Utc::now() - Duration::seconds(1));
            Ok(Some(token))
        });
        mock.expect_find_refresh_token_owner().never();

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(matches!(
            manager.redeem(&"ab".repeat(32)).await,
            Err(RefreshError::Expired)
        ));
    }

    // Test 8: Expired token is rejected even when not revoked
    #[tokio::test]
    async fn test_redeem_expired_token() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_find_refresh_token()
            .returning(move |_| Ok(Some(record(owner, Duration::seconds(-1)))));
        mock.expect_find_refresh_token_owner().never();

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(matches!(
            manager.redeem(&"ab".repeat(32)).await,
            Err(RefreshError::Expired)
        ));
    }

    // Test 9: Owner lookup failure
    #[tokio::test]
    async fn test_redeem_owner_missing() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_find_refresh_token()
            .returning(move |_| Ok(Some(record(owner, Duration::days(1)))));
        mock.expect_find_refresh_token_owner().returning(|_| Ok(None));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(matches!(
            manager.redeem(&"ab".repeat(32)).await,
            Err(RefreshError::NotFound)
        ));
    }

    // Test 10: Revoke maps unknown tokens to NotFound
    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let mut mock = MockDatabase::new();
        mock.expect_revoke_refresh_token()
            .returning(|_, _| Err(DbError::NotFound));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(matches!(
            manager.revoke("missing").await,
            Err(RefreshError::NotFound)
        ));
    }

    // Test 11: Revoke is repeatable
    #[tokio::test]
    async fn test_revoke_twice() {
        let mut mock = MockDatabase::new();
        mock.expect_revoke_refresh_token()
            .times(2)
            .returning(|_, _| Ok(()));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert!(manager.revoke("token").await.is_ok());
        assert!(manager.revoke("token").await.is_ok());
    }

    // Test 12: A revocation stamped in the future does not block redemption yet
    #[tokio::test]
    async fn test_redeem_revocation_scheduled_later() {
        let owner = Uuid::new_v4();
        let mut mock = MockDatabase::new();

        mock.expect_find_refresh_token().returning(move |_| {
            let mut token = record(owner, Duration::days(60));
            token.revoked_at = Some(Utc::now() + Duration::hours(1));
            Ok(Some(token))
        });
        mock.expect_find_refresh_token_owner()
            .returning(move |_| Ok(Some(owner_user(owner))));

        let manager = RefreshTokenManager::new(Arc::new(mock), default_refresh_token_ttl());
        assert_eq!(manager.redeem(&"ab".repeat(32)).await.unwrap(), owner);
    }
}
