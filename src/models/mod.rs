//! Domain models for chirpy
//!
//! This module contains the core domain models used throughout the application.

pub mod chirp;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use chirp::{censor_body, prepare_body, Chirp, ChirpSort, CreateChirpRequest, MAX_CHIRP_LENGTH};
pub use token::{RefreshResponse, RefreshToken};
pub use user::{
    CreateUserRequest, LoginRequest, LoginResponse, User, UserResponse, WebhookData,
    WebhookRequest, USER_UPGRADED_EVENT,
};
