//! Authentication manager
//!
//! This module provides the main authentication interface for the application.
//! It combines password hashing, session tokens and refresh tokens with the
//! configured signing secret and lifetimes.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Duration;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{AuthError, PasswordError};
use crate::models::{LoginResponse, User, UserResponse};

use super::header::{get_api_key, get_bearer_token};
use super::password::{check_password_hash, hash_password};
use super::refresh::{default_refresh_token_ttl, RefreshTokenManager};
use super::session::{issue_session_token, verify_session_token};

type HmacSha256 = Hmac<Sha256>;

/// Message both webhook keys are MACed over before comparison
const WEBHOOK_KEY_CONTEXT: &[u8] = b"chirpy-webhook-key";

/// Longest lifetime accepted from configuration (100 years)
const MAX_CONFIGURED_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

/// Configuration for the authentication manager
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    pub jwt_secret: String,

    /// API key expected on the payment provider webhook (None = disabled)
    pub polka_key: Option<String>,

    /// Default session token lifetime
    pub access_token_ttl: Duration,

    /// Upper bound for a client-requested session token lifetime
    pub max_access_token_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            polka_key: None,
            access_token_ttl: Duration::hours(1),
            max_access_token_ttl: Duration::hours(1),
            refresh_token_ttl: default_refresh_token_ttl(),
        }
    }

    /// Set the webhook API key
    pub fn with_polka_key(mut self, key: impl Into<String>) -> Self {
        self.polka_key = Some(key.into());
        self
    }
}

impl From<&crate::config::AuthConfig> for AuthConfig {
    fn from(config: &crate::config::AuthConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            polka_key: config.polka_key.clone().filter(|key| !key.is_empty()),
            access_token_ttl: ttl_from_secs(config.access_token_ttl_secs),
            max_access_token_ttl: ttl_from_secs(config.max_access_token_ttl_secs),
            refresh_token_ttl: ttl_from_secs(config.refresh_token_ttl_secs),
        }
    }
}

fn ttl_from_secs(secs: u64) -> Duration {
    let secs = i64::try_from(secs)
        .unwrap_or(MAX_CONFIGURED_TTL_SECS)
        .min(MAX_CONFIGURED_TTL_SECS);
    Duration::seconds(secs)
}

/// Authentication manager
///
/// Provides methods for registering users, logging in and authenticating requests.
pub struct AuthManager<D: Database> {
    db: Arc<D>,
    config: AuthConfig,
    refresh_tokens: RefreshTokenManager<D>,
}

impl<D: Database> AuthManager<D> {
    /// Create a new authentication manager
    pub fn new(db: Arc<D>, config: AuthConfig) -> Self {
        let refresh_tokens = RefreshTokenManager::new(db.clone(), config.refresh_token_ttl);
        Self {
            db,
            config,
            refresh_tokens,
        }
    }

    /// Register a new user
    ///
    /// A duplicate email surfaces as `DbError::ConstraintViolation`.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let hashed_password = hash_blocking(password.to_string()).await?;
        let user = User::new(email, hashed_password);

        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Replace the email and password of an existing user
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let hashed_password = hash_blocking(password.to_string()).await?;

        let user = self
            .db
            .update_user_credentials(user_id, email, &hashed_password)
            .await?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Check credentials and issue a session token and a refresh token
    ///
    /// `expires_in_seconds` is honored when positive, capped at the configured maximum.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        expires_in_seconds: Option<i64>,
    ) -> Result<LoginResponse, AuthError> {
        let user = match self.db.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        match check_blocking(password.to_string(), user.hashed_password.clone()).await {
            Ok(()) => {}
            Err(AuthError::Password(PasswordError::Mismatch)) => {
                tracing::info!(user_id = %user.id, "Login failed: wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(AuthError::Password(PasswordError::MalformedHash(e))) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is malformed");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        }

        let ttl = self.session_ttl(expires_in_seconds);
        let token = issue_session_token(user.id, &self.config.jwt_secret, ttl)?;
        let refresh_token = self.refresh_tokens.issue(user.id).await?;

        tracing::info!(user_id = %user.id, ttl_secs = ttl.num_seconds(), "User logged in");

        Ok(LoginResponse {
            user: UserResponse::from(&user),
            token,
            refresh_token,
        })
    }

    /// Lifetime of a login session token for the requested duration
    pub fn session_ttl(&self, expires_in_seconds: Option<i64>) -> Duration {
        match expires_in_seconds {
            Some(secs) if secs > 0 => {
                let max_secs = self.config.max_access_token_ttl.num_seconds();
                Duration::seconds(secs.min(max_secs))
            }
            _ => self.config.access_token_ttl,
        }
    }

    /// Mint a new session token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let owner = self.refresh_tokens.redeem(refresh_token).await?;
        let token = issue_session_token(owner, &self.config.jwt_secret, self.config.access_token_ttl)?;

        tracing::debug!(user_id = %owner, "Session token refreshed");
        Ok(token)
    }

    /// Revoke a refresh token
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.refresh_tokens.revoke(refresh_token).await?;
        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Authenticate a request by its bearer session token
    ///
    /// Returns the user ID carried by the token.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = get_bearer_token(headers)?;
        let user_id = verify_session_token(&token, &self.config.jwt_secret)?;
        Ok(user_id)
    }

    /// Check the webhook API key
    pub fn verify_webhook(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let expected = self
            .config
            .polka_key
            .as_deref()
            .ok_or(AuthError::WebhookDisabled)?;

        let key = get_api_key(headers)?;
        if !keys_match(&key, expected) {
            tracing::warn!("Webhook request with wrong API key");
            return Err(AuthError::InvalidApiKey);
        }

        Ok(())
    }
}

/// Compare two API keys in constant time
///
/// Each key MACs a fixed message; the tags are compared with `verify_slice`,
/// so neither content nor length leaks through timing.
fn keys_match(provided: &str, expected: &str) -> bool {
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    expected_mac.update(WEBHOOK_KEY_CONTEXT);
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut provided_mac) = HmacSha256::new_from_slice(provided.as_bytes()) else {
        return false;
    };
    provided_mac.update(WEBHOOK_KEY_CONTEXT);
    provided_mac.verify_slice(&expected_tag).is_ok()
}

/// Hash a password on the blocking thread pool
async fn hash_blocking(password: String) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;
    Ok(hash)
}

/// Verify a password on the blocking thread pool
async fn check_blocking(password: String, hash: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || check_password_hash(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;
    Ok(())
}
