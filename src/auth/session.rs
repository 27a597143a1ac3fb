//! Session token codec
//!
//! Session tokens are compact HS256 JWTs (`header.claims.signature`, each
//! segment base64url without padding). Signing is done directly with
//! HMAC-SHA256 so the accepted algorithm is fixed to HS256.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Issuer written into every session token
pub const ISSUER: &str = "chirpy";

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer, always "chirpy"
    pub iss: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// Subject: the user id in canonical UUID text form
    pub sub: String,
}

/// Issue a session token for `user_id`, valid for `ttl` from now
///
/// A zero or negative `ttl` yields a token that is already expired.
pub fn issue_session_token(
    user_id: Uuid,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    issue_session_token_at(user_id, secret, ttl, Utc::now())
}

/// Verify a session token and return the user id it was issued for
pub fn verify_session_token(token: &str, secret: &str) -> Result<Uuid, TokenError> {
    verify_session_token_at(token, secret, Utc::now())
}

pub(crate) fn issue_session_token_at(
    user_id: Uuid,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("signing secret is empty".to_string()));
    }

    // Expiry is the whole second at or before now + ttl
    let exp = match now.checked_add_signed(ttl) {
        Some(expires_at) => expires_at.timestamp(),
        None if ttl > Duration::zero() => i64::MAX,
        None => i64::MIN,
    };
    let claims = SessionClaims {
        iss: ISSUER.to_string(),
        iat: now.timestamp(),
        exp,
        sub: user_id.to_string(),
    };

    let header_json = serde_json::to_vec(&JwtHeader::default())
        .map_err(|e| TokenError::Signing(e.to_string()))?;
    let claims_json =
        serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::Signing(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

pub(crate) fn verify_session_token_at(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::MalformedToken);
    }
    let (header_b64, claims_b64, signature_b64) = (parts[0], parts[1], parts[2]);

    if secret.is_empty() {
        return Err(TokenError::BadSignature);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenError::MalformedToken)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenError::MalformedToken)?;
    if header.alg != ALGORITHM {
        tracing::debug!(alg = %header.alg, "Rejected session token with unexpected algorithm");
        return Err(TokenError::BadSignature);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::MalformedToken)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::BadSignature)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::MalformedToken)?;
    let claims: SessionClaims =
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::MalformedToken)?;

    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }

    Uuid::parse_str(&claims.sub).map_err(|_| TokenError::MalformedToken)
}
