//! HTTP middleware for chirpy
//!
//! This module provides middleware layers for:
//! - Session authentication (bearer JWT)
//! - File server hit counting
//! - Request/response logging

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::atomic::Ordering;
use std::time::Instant;
use uuid::Uuid;

use super::error::ApiError;
use super::router::AppState;
use crate::database::Database;

/// Authenticated user extension for requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Session authentication middleware
///
/// Verifies the bearer session token and adds the user ID to the request
/// extensions. Requests without a valid token are rejected with 401.
pub async fn require_session<D: Database + 'static>(
    State(state): State<AppState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = state.auth_manager.authenticate(request.headers())?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));

    Ok(next.run(request).await)
}

/// Count every request that reaches the file server
pub async fn count_file_server_hits<D: Database + 'static>(
    State(state): State<AppState<D>>,
    request: Request,
    next: Next,
) -> Response {
    state.file_server_hits.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
