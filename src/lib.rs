//! chirpy - A small social network API
//!
//! This crate provides the chirpy HTTP service: users, short posts ("chirps"),
//! session and refresh token authentication, and a payment webhook.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
