//! Credential extraction from the `Authorization` header
//!
//! The header must contain exactly two whitespace-separated fields: the scheme
//! literal and the credential. The credential is returned verbatim.

use axum::http::{header, HeaderMap};

use crate::error::HeaderError;

/// Scheme used for session and refresh tokens
pub const BEARER_SCHEME: &str = "Bearer";

/// Scheme used by the payment provider webhook
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract a bearer token (`Authorization: Bearer <token>`)
pub fn get_bearer_token(headers: &HeaderMap) -> Result<String, HeaderError> {
    get_authorization(headers, BEARER_SCHEME)
}

/// Extract an API key (`Authorization: ApiKey <key>`)
pub fn get_api_key(headers: &HeaderMap) -> Result<String, HeaderError> {
    get_authorization(headers, API_KEY_SCHEME)
}

/// Extract the credential for `scheme` from the `Authorization` header
///
/// `HeaderMap` lookups are case-insensitive, so `authorization` and
/// `AUTHORIZATION` are accepted as well.
pub fn get_authorization(headers: &HeaderMap, scheme: &str) -> Result<String, HeaderError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if value.trim().is_empty() {
        tracing::debug!(scheme, "Authorization header is missing or empty");
        return Err(HeaderError::MalformedHeader);
    }

    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != 2 {
        tracing::debug!(
            scheme,
            fields = fields.len(),
            "Authorization header does not have two fields"
        );
        return Err(HeaderError::WrongScheme);
    }

    if fields[0] != scheme {
        tracing::debug!(scheme, "Authorization header has an unexpected scheme");
        return Err(HeaderError::WrongScheme);
    }

    Ok(fields[1].to_string())
}
