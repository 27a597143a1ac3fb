//! Database migrations for chirpy
//!
//! This module contains SQL migrations for the SQLite database schema.

/// SQL statement to create the initial database schema
///
/// Timestamps are RFC 3339 text and IDs are UUID text. Deleting a user removes
/// their chirps and refresh tokens.
pub const CREATE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    is_chirpy_red INTEGER NOT NULL DEFAULT 0
);

-- Chirps table
CREATE TABLE IF NOT EXISTS chirps (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    body TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chirps_user ON chirps(user_id);
CREATE INDEX IF NOT EXISTS idx_chirps_created ON chirps(created_at);

-- Refresh tokens table
CREATE TABLE IF NOT EXISTS refresh_tokens (
    token TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at TEXT NOT NULL,
    revoked_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id);
"#;

/// Get the migration version
pub fn migration_version() -> i32 {
    1
}
