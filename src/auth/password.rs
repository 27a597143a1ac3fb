//! Password hashing
//!
//! Passwords are hashed with Argon2id using the crate's default parameters and
//! a random per-password salt. The output is a PHC string, so the parameters
//! and salt travel with the hash.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::PasswordError;

/// Hash a plaintext password
///
/// # Returns
///
/// The Argon2id hash string (PHC format)
///
/// # Example
///
/// ```
/// use chirpy::auth::password::{check_password_hash, hash_password};
///
/// let hash = hash_password("04234").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(check_password_hash("04234", &hash).is_ok());
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashFailed(e.to_string()))
}

/// Check a plaintext password against a stored hash
///
/// Returns `PasswordError::Mismatch` when the password is wrong.
pub fn check_password_hash(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::Mismatch)
}
