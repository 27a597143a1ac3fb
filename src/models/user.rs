//! User-related domain models
//!
//! This module defines the stored user record, its public projection and the
//! request bodies of the user, login and webhook endpoints.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Webhook event that upgrades a user to Chirpy Red
pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// User stored in database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (unique)
    pub email: String,

    /// Argon2id hash of the password
    pub hashed_password: String,

    /// Whether the user has the Chirpy Red membership
    pub is_chirpy_red: bool,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh ID
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        // Storage keeps microseconds
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public view of a user (never includes the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email.clone(),
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

/// Body of `POST /api/users` and `PUT /api/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Plaintext password
    pub password: String,

    /// Requested session token lifetime; capped by the server
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

/// Response of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,

    /// Session token (JWT)
    pub token: String,

    /// Opaque refresh token
    pub refresh_token: String,
}

/// Body of the payment provider webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    pub data: WebhookData,
}

/// Payload of a webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookData {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("walt@breakingbad.com", "$argon2id$hash");

        assert_eq!(user.email, "walt@breakingbad.com");
        assert!(!user.is_chirpy_red);
        assert_eq!(user.created_at, user.updated_at);
        assert_ne!(user.id, Uuid::nil());
    }

    #[test]
    fn test_user_response_omits_password_hash() {
        let user = User::new("walt@breakingbad.com", "$argon2id$secret-hash");
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();

        assert_eq!(json["email"], "walt@breakingbad.com");
        assert_eq!(json["is_chirpy_red"], false);
        assert_eq!(json["id"], user.id.to_string());
        assert!(json.get("hashed_password").is_none());
        assert!(!json.to_string().contains("secret-hash"));
    }

    #[test]
    fn test_login_request_without_expiry() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.c","password":"pw"}"#).unwrap();
        assert_eq!(req.expires_in_seconds, None);

        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.c","password":"pw","expires_in_seconds":60}"#)
                .unwrap();
        assert_eq!(req.expires_in_seconds, Some(60));
    }

    #[test]
    fn test_login_response_is_flat() {
        let user = User::new("a@b.c", "hash");
        let response = LoginResponse {
            user: UserResponse::from(&user),
            token: "jwt".to_string(),
            refresh_token: "refresh".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["token"], "jwt");
        assert_eq!(json["refresh_token"], "refresh");
        assert!(json.get("user").is_none());
    }

    #[test]
    fn test_webhook_request_parse() {
        let id = Uuid::new_v4();
        let body = format!(
            r#"{{"event":"user.upgraded","data":{{"user_id":"{}"}}}}"#,
            id
        );
        let req: WebhookRequest = serde_json::from_str(&body).unwrap();

        assert_eq!(req.event, USER_UPGRADED_EVENT);
        assert_eq!(req.data.user_id, id);
    }
}
