//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{Chirp, RefreshToken, User};

const USER_COLUMNS: &str = "id, created_at, updated_at, email, hashed_password, is_chirpy_red";

const CHIRP_COLUMNS: &str = "id, created_at, updated_at, body, user_id";

const REFRESH_TOKEN_COLUMNS: &str =
    "token, created_at, updated_at, user_id, expires_at, revoked_at";

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await.map_err(map_db_error)?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_db_error)?;

        tracing::debug!(path, "Database opened");

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<(), DbError> {
        let id = user.id.to_string();
        let created_at = format_datetime(user.created_at);
        let updated_at = format_datetime(user.updated_at);
        let email = user.email.clone();
        let hashed_password = user.hashed_password.clone();
        let is_chirpy_red = user.is_chirpy_red;

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users
                    (id, created_at, updated_at, email, hashed_password, is_chirpy_red)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    rusqlite::params![
                        id,
                        created_at,
                        updated_at,
                        email,
                        hashed_password,
                        is_chirpy_red
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_error)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
                let user = conn
                    .query_row(&sql, [&email], user_from_row)
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(map_db_error)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                let user = conn.query_row(&sql, [&id], user_from_row).optional()?;
                Ok(user)
            })
            .await
            .map_err(map_db_error)
    }

    async fn update_user_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError> {
        let id = id.to_string();
        let email = email.to_string();
        let hashed_password = hashed_password.to_string();
        let updated_at = format_datetime(Utc::now());

        let user = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE users
                    SET email = ?1, hashed_password = ?2, updated_at = ?3
                    WHERE id = ?4
                    "#,
                    rusqlite::params![email, hashed_password, updated_at, id],
                )?;
                if updated == 0 {
                    return Ok(None);
                }

                let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                let user = conn.query_row(&sql, [&id], user_from_row)?;
                Ok(Some(user))
            })
            .await
            .map_err(map_db_error)?;

        user.ok_or(DbError::NotFound)
    }

    async fn upgrade_user_to_chirpy_red(&self, id: Uuid) -> Result<(), DbError> {
        let id = id.to_string();
        let updated_at = format_datetime(Utc::now());

        let updated = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE users SET is_chirpy_red = 1, updated_at = ?1 WHERE id = ?2",
                    [&updated_at, &id],
                )?;
                Ok(count)
            })
            .await
            .map_err(map_db_error)?;

        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_users(&self) -> Result<u64, DbError> {
        self.conn
            .call(|conn| {
                let count = conn.execute("DELETE FROM users", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(map_db_error)
    }

    // =========================================================================
    // Chirp operations
    // =========================================================================

    async fn create_chirp(&self, chirp: &Chirp) -> Result<(), DbError> {
        let id = chirp.id.to_string();
        let created_at = format_datetime(chirp.created_at);
        let updated_at = format_datetime(chirp.updated_at);
        let body = chirp.body.clone();
        let user_id = chirp.user_id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO chirps (id, created_at, updated_at, body, user_id)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params![id, created_at, updated_at, body, user_id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_error)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> Result<Vec<Chirp>, DbError> {
        let author_id = author_id.map(|id| id.to_string());

        self.conn
            .call(move |conn| {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM chirps
                    WHERE ?1 IS NULL OR user_id = ?1
                    ORDER BY created_at ASC, rowid ASC
                    "#,
                    CHIRP_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;

                let chirps = stmt
                    .query_map([&author_id], chirp_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(chirps)
            })
            .await
            .map_err(map_db_error)
    }

    async fn get_chirp(&self, id: Uuid) -> Result<Option<Chirp>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM chirps WHERE id = ?1", CHIRP_COLUMNS);
                let chirp = conn.query_row(&sql, [&id], chirp_from_row).optional()?;
                Ok(chirp)
            })
            .await
            .map_err(map_db_error)
    }

    async fn delete_chirp(&self, id: Uuid) -> Result<(), DbError> {
        let id = id.to_string();

        let deleted = self
            .conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM chirps WHERE id = ?1", [&id])?;
                Ok(count)
            })
            .await
            .map_err(map_db_error)?;

        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Refresh token operations
    // =========================================================================

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DbError> {
        let value = token.token.clone();
        let created_at = format_datetime(token.created_at);
        let updated_at = format_datetime(token.updated_at);
        let user_id = token.user_id.to_string();
        let expires_at = format_datetime(token.expires_at);
        let revoked_at = token.revoked_at.map(format_datetime);

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO refresh_tokens
                    (token, created_at, updated_at, user_id, expires_at, revoked_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    rusqlite::params![
                        value, created_at, updated_at, user_id, expires_at, revoked_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_error)
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, DbError> {
        let token = token.to_string();

        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM refresh_tokens WHERE token = ?1",
                    REFRESH_TOKEN_COLUMNS
                );
                let record = conn
                    .query_row(&sql, [&token], refresh_token_from_row)
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(map_db_error)
    }

    async fn find_refresh_token_owner(&self, token: &str) -> Result<Option<User>, DbError> {
        let token = token.to_string();

        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        r#"
                        SELECT u.id, u.created_at, u.updated_at, u.email, u.hashed_password, u.is_chirpy_red
                        FROM refresh_tokens t
                        JOIN users u ON u.id = t.user_id
                        WHERE t.token = ?1
                        "#,
                        [&token],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(map_db_error)
    }

    async fn revoke_refresh_token(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let token = token.to_string();
        let revoked_at = format_datetime(revoked_at);

        let updated = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE refresh_tokens SET revoked_at = ?1, updated_at = ?1 WHERE token = ?2",
                    [&revoked_at, &token],
                )?;
                Ok(count)
            })
            .await
            .map_err(map_db_error)?;

        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

/// Map a connection-thread error, surfacing constraint violations
fn map_db_error(err: tokio_rusqlite::Error) -> DbError {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::ConstraintViolation(msg.unwrap_or_else(|| e.to_string()))
        }
        tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
        other => DbError::Connection(other),
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse datetime string from SQLite
fn parse_datetime(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing SQLite's datetime format
            chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse UUID text from SQLite
fn parse_uuid(idx: usize, s: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(0, row.get(0)?)?,
        created_at: parse_datetime(1, row.get(1)?)?,
        updated_at: parse_datetime(2, row.get(2)?)?,
        email: row.get(3)?,
        hashed_password: row.get(4)?,
        is_chirpy_red: row.get(5)?,
    })
}

fn chirp_from_row(row: &Row<'_>) -> rusqlite::Result<Chirp> {
    Ok(Chirp {
        id: parse_uuid(0, row.get(0)?)?,
        created_at: parse_datetime(1, row.get(1)?)?,
        updated_at: parse_datetime(2, row.get(2)?)?,
        body: row.get(3)?,
        user_id: parse_uuid(4, row.get(4)?)?,
    })
}

fn refresh_token_from_row(row: &Row<'_>) -> rusqlite::Result<RefreshToken> {
    Ok(RefreshToken {
        token: row.get(0)?,
        created_at: parse_datetime(1, row.get(1)?)?,
        updated_at: parse_datetime(2, row.get(2)?)?,
        user_id: parse_uuid(3, row.get(3)?)?,
        expires_at: parse_datetime(4, row.get(4)?)?,
        revoked_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(5, s))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn db_with_user(email: &str) -> (SqliteDatabase, User) {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let user = User::new(email, "$argon2id$hash");
        db.create_user(&user).await.unwrap();
        (db, user)
    }

    // Test 1: Create in-memory database
    #[tokio::test]
    async fn test_create_in_memory_database() {
        let db = SqliteDatabase::in_memory().await;
        assert!(db.is_ok());
    }

    // Test 2: Create and fetch user by email and ID
    #[tokio::test]
    async fn test_create_and_get_user() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;

        let by_email = db
            .get_user_by_email("walt@breakingbad.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.hashed_password, "$argon2id$hash");
        assert!(!by_email.is_chirpy_red);

        let by_id = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "walt@breakingbad.com");
    }

    // Test 3: Unknown user lookups return None
    #[tokio::test]
    async fn test_get_unknown_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        assert!(db.get_user_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(db.get_user_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    // Test 4: Duplicate email is a constraint violation
    #[tokio::test]
    async fn test_duplicate_email() {
        let (db, _) = db_with_user("walt@breakingbad.com").await;

        let result = db
            .create_user(&User::new("walt@breakingbad.com", "other"))
            .await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    // Test 5: Update credentials
    #[tokio::test]
    async fn test_update_user_credentials() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;

        let updated = db
            .update_user_credentials(user.id, "heisenberg@breakingbad.com", "new-hash")
            .await
            .unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.email, "heisenberg@breakingbad.com");
        assert_eq!(updated.hashed_password, "new-hash");
        assert!(updated.updated_at >= updated.created_at);

        assert!(db
            .get_user_by_email("walt@breakingbad.com")
            .await
            .unwrap()
            .is_none());
    }

    // Test 6: Update of unknown user
    #[tokio::test]
    async fn test_update_unknown_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let result = db
            .update_user_credentials(Uuid::new_v4(), "a@b.c", "hash")
            .await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 7: Chirpy Red upgrade
    #[tokio::test]
    async fn test_upgrade_user_to_chirpy_red() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;

        db.upgrade_user_to_chirpy_red(user.id).await.unwrap();
        let fetched = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(fetched.is_chirpy_red);

        let result = db.upgrade_user_to_chirpy_red(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 8: Chirps are listed oldest first and filtered by author
    #[tokio::test]
    async fn test_list_chirps_order_and_filter() {
        let (db, walt) = db_with_user("walt@breakingbad.com").await;
        let jesse = User::new("jesse@breakingbad.com", "hash");
        db.create_user(&jesse).await.unwrap();

        let base = Utc::now();
        let mut first = Chirp::new("first", walt.id);
        first.created_at = base - Duration::seconds(10);
        let mut second = Chirp::new("second", jesse.id);
        second.created_at = base - Duration::seconds(5);
        let mut third = Chirp::new("third", walt.id);
        third.created_at = base;

        // Insert out of order
        db.create_chirp(&third).await.unwrap();
        db.create_chirp(&first).await.unwrap();
        db.create_chirp(&second).await.unwrap();

        let all = db.list_chirps(None).await.unwrap();
        let bodies: Vec<&str> = all.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);

        let walts = db.list_chirps(Some(walt.id)).await.unwrap();
        let bodies: Vec<&str> = walts.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "third"]);

        assert!(db.list_chirps(Some(Uuid::new_v4())).await.unwrap().is_empty());
    }

    // Test 9: Get and delete chirp
    #[tokio::test]
    async fn test_get_and_delete_chirp() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;
        let chirp = Chirp::new("hello", user.id);
        db.create_chirp(&chirp).await.unwrap();

        let fetched = db.get_chirp(chirp.id).await.unwrap().unwrap();
        assert_eq!(fetched.body, "hello");
        assert_eq!(fetched.user_id, user.id);

        db.delete_chirp(chirp.id).await.unwrap();
        assert!(db.get_chirp(chirp.id).await.unwrap().is_none());

        let result = db.delete_chirp(chirp.id).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 10: Chirp for unknown author violates the foreign key
    #[tokio::test]
    async fn test_chirp_requires_author() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let result = db.create_chirp(&Chirp::new("orphan", Uuid::new_v4())).await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    // Test 11: Refresh token insert, lookup and owner
    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;
        let now = Utc::now();
        let token = RefreshToken::new("ab".repeat(32), user.id, now, now + Duration::days(60));

        db.insert_refresh_token(&token).await.unwrap();

        let found = db.find_refresh_token(&token.token).await.unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert!(found.revoked_at.is_none());
        assert!(found.expires_at > now);

        let owner = db
            .find_refresh_token_owner(&token.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.id, user.id);

        assert!(db.find_refresh_token("unknown").await.unwrap().is_none());
        assert!(db.find_refresh_token_owner("unknown").await.unwrap().is_none());
    }

    // Test 12: Revoke sets revoked_at and can be repeated
    #[tokio::test]
    async fn test_revoke_refresh_token() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;
        let now = Utc::now();
        let token = RefreshToken::new("cd".repeat(32), user.id, now, now + Duration::days(60));
        db.insert_refresh_token(&token).await.unwrap();

        db.revoke_refresh_token(&token.token, now).await.unwrap();
        let first = db.find_refresh_token(&token.token).await.unwrap().unwrap();
        assert!(first.revoked_at.is_some());

        let later = now + Duration::seconds(5);
        db.revoke_refresh_token(&token.token, later).await.unwrap();
        let second = db.find_refresh_token(&token.token).await.unwrap().unwrap();
        assert!(second.revoked_at.unwrap() > first.revoked_at.unwrap());

        let result = db.revoke_refresh_token("unknown", now).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 13: Duplicate refresh token is rejected
    #[tokio::test]
    async fn test_duplicate_refresh_token() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;
        let now = Utc::now();
        let token = RefreshToken::new("ef".repeat(32), user.id, now, now + Duration::days(60));

        db.insert_refresh_token(&token).await.unwrap();
        let result = db.insert_refresh_token(&token).await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    // Test 14: Deleting all users cascades to chirps and tokens
    #[tokio::test]
    async fn test_delete_all_users_cascades() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;
        let now = Utc::now();
        let chirp = Chirp::new("hello", user.id);
        let token = RefreshToken::new("01".repeat(32), user.id, now, now + Duration::days(60));
        db.create_chirp(&chirp).await.unwrap();
        db.insert_refresh_token(&token).await.unwrap();

        let deleted = db.delete_all_users().await.unwrap();
        assert_eq!(deleted, 1);

        assert!(db.get_user_by_id(user.id).await.unwrap().is_none());
        assert!(db.list_chirps(None).await.unwrap().is_empty());
        assert!(db.find_refresh_token(&token.token).await.unwrap().is_none());
    }

    // Test 15: Timestamps survive storage with microsecond precision
    #[tokio::test]
    async fn test_timestamp_round_trip() {
        let (db, user) = db_with_user("walt@breakingbad.com").await;

        let fetched = db.get_user_by_id(user.id).await.unwrap().unwrap();
        let delta = (fetched.created_at - user.created_at).num_microseconds().unwrap();
        assert_eq!(delta.abs(), 0);
    }

    // Test 16: parse_datetime accepts SQLite's native format
    #[test]
    fn test_parse_datetime_formats() {
        let rfc = parse_datetime(0, "2024-01-02T03:04:05.000006Z".to_string()).unwrap();
        assert_eq!(rfc.timestamp(), 1704164645);

        let sqlite = parse_datetime(0, "2024-01-02 03:04:05".to_string()).unwrap();
        assert_eq!(sqlite.timestamp(), 1704164645);

        assert!(parse_datetime(0, "yesterday".to_string()).is_err());
    }
}
