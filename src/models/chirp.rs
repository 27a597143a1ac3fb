//! Chirp-related domain models
//!
//! A chirp is a short text post. Bodies are limited to 140 characters and a
//! small list of words is masked before storage.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChirpError;

/// Maximum chirp length in characters
pub const MAX_CHIRP_LENGTH: usize = 140;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

const MASK: &str = "****";

/// Chirp stored in database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    /// Unique chirp ID
    pub id: Uuid,

    /// When the chirp was created
    pub created_at: DateTime<Utc>,

    /// When the chirp was last updated
    pub updated_at: DateTime<Utc>,

    /// Censored body text
    pub body: String,

    /// Author
    pub user_id: Uuid,
}

impl Chirp {
    /// Create a new chirp with a fresh ID
    pub fn new(body: impl Into<String>, user_id: Uuid) -> Self {
        // Storage keeps microseconds
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.into(),
            user_id,
        }
    }
}

/// Body of `POST /api/chirps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

/// Ordering of `GET /api/chirps` by creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChirpSort {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

impl ChirpSort {
    /// Parse the `sort` query parameter; anything but "desc" sorts ascending
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => ChirpSort::Desc,
            _ => ChirpSort::Asc,
        }
    }
}

/// Validate the length of a chirp body and censor it
pub fn prepare_body(body: &str) -> Result<String, ChirpError> {
    let length = body.chars().count();
    if length > MAX_CHIRP_LENGTH {
        return Err(ChirpError::TooLong {
            length,
            max: MAX_CHIRP_LENGTH,
        });
    }

    Ok(censor_body(body))
}

/// Replace profane words with `****`
///
/// Words are separated by single spaces and compared case-insensitively.
/// A word with punctuation attached (`Sharbert!`) is left untouched.
pub fn censor_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANE_WORDS
                .iter()
                .any(|profane| word.eq_ignore_ascii_case(profane))
            {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
