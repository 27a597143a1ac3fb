//! Authentication system for chirpy
//!
//! This module provides authentication and authorization functionality:
//! - Credential extraction from the `Authorization` header
//! - Password hashing
//! - Session tokens (HS256 JWT)
//! - Revocable refresh tokens

pub mod header;
pub mod manager;
pub mod password;
pub mod refresh;
pub mod session;

pub use header::{get_api_key, get_bearer_token, API_KEY_SCHEME, BEARER_SCHEME};
pub use manager::{AuthConfig, AuthManager};
pub use password::{check_password_hash, hash_password};
pub use refresh::{generate_refresh_token, RefreshTokenManager};
pub use session::{issue_session_token, verify_session_token, SessionClaims, ISSUER};
