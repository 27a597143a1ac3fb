//! HTTP router for chirpy
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Readiness, metrics and admin reset
//! - The static file server under `/app` and the landing page at `/`
//! - Users, login and token lifecycle
//! - Chirps
//! - The Polka payment webhook

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Json},
    routing::{delete, get, get_service, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use uuid::Uuid;

use super::error::ApiError;
use super::middleware::{
    count_file_server_hits, logging_middleware, require_session, AuthenticatedUser,
};
use crate::auth::{get_bearer_token, AuthManager};
use crate::config::DEV_PLATFORM;
use crate::database::Database;
use crate::error::{AuthError, DbError};
use crate::models::{
    prepare_body, Chirp, ChirpSort, CreateChirpRequest, CreateUserRequest, LoginRequest,
    LoginResponse, RefreshResponse, UserResponse, WebhookRequest, USER_UPGRADED_EVENT,
};

/// Shared application state
pub struct AppState<D: Database> {
    /// Authentication manager
    pub auth_manager: Arc<AuthManager<D>>,

    /// Database
    pub database: Arc<D>,

    /// Requests served by the file server since start or last reset
    pub file_server_hits: Arc<AtomicU64>,

    /// Deployment platform; `dev` unlocks the admin reset
    pub platform: String,

    /// Root directory served under `/app`
    pub filepath_root: PathBuf,
}

impl<D: Database> AppState<D> {
    pub fn new(
        auth_manager: Arc<AuthManager<D>>,
        database: Arc<D>,
        platform: impl Into<String>,
        filepath_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            auth_manager,
            database,
            file_server_hits: Arc::new(AtomicU64::new(0)),
            platform: platform.into(),
            filepath_root: filepath_root.into(),
        }
    }

    pub fn is_dev(&self) -> bool {
        self.platform == DEV_PLATFORM
    }
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            auth_manager: Arc::clone(&self.auth_manager),
            database: Arc::clone(&self.database),
            file_server_hits: Arc::clone(&self.file_server_hits),
            platform: self.platform.clone(),
            filepath_root: self.filepath_root.clone(),
        }
    }
}

/// Query parameters for listing chirps
#[derive(Debug, Default, Deserialize)]
pub struct ListChirpsQuery {
    pub author_id: Option<String>,
    pub sort: Option<String>,
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the managers and storage
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let file_server = Router::new()
        .nest_service("/app", ServeDir::new(&state.filepath_root))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            count_file_server_hits::<D>,
        ));

    let public = Router::new()
        .route(
            "/",
            get_service(ServeFile::new(state.filepath_root.join("index.html"))),
        )
        .route("/api/healthz", get(readiness_handler))
        .route("/admin/metrics", get(metrics_handler::<D>))
        .route("/admin/reset", post(reset_handler::<D>))
        .route("/api/users", post(create_user_handler::<D>))
        .route("/api/login", post(login_handler::<D>))
        .route("/api/refresh", post(refresh_handler::<D>))
        .route("/api/revoke", post(revoke_handler::<D>))
        .route("/api/chirps", get(list_chirps_handler::<D>))
        .route("/api/chirps/:chirp_id", get(get_chirp_handler::<D>))
        .route("/api/polka/webhooks", post(polka_webhook_handler::<D>));

    // Routes that require a bearer session token
    let protected = Router::new()
        .route("/api/users", put(update_user_handler::<D>))
        .route("/api/chirps", post(create_chirp_handler::<D>))
        .route("/api/chirps/:chirp_id", delete(delete_chirp_handler::<D>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<D>,
        ));

    Router::new()
        .merge(file_server)
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Readiness check
async fn readiness_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "OK",
    )
}

/// Admin page with the file server hit count
async fn metrics_handler<D: Database>(State(state): State<AppState<D>>) -> Html<String> {
    let hits = state.file_server_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n  <body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {} times!</p>\n  </body>\n</html>",
        hits
    ))
}

/// Delete every user and reset the hit counter (dev only)
async fn reset_handler<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.is_dev() {
        tracing::warn!(platform = %state.platform, "Reset rejected outside dev");
        return Err(ApiError::forbidden(
            "Reset is only allowed in dev environment",
        ));
    }

    let deleted = state.database.delete_all_users().await?;
    state.file_server_hits.store(0, Ordering::Relaxed);

    tracing::warn!(deleted_users = deleted, "Database reset");
    Ok((
        StatusCode::OK,
        "Hits reset to 0 and database reset to initial state.",
    ))
}

fn validate_credentials(request: &CreateUserRequest) -> Result<(), ApiError> {
    if request.email.trim().is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }
    Ok(())
}

async fn create_user_handler<D: Database>(
    State(state): State<AppState<D>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_credentials(&request)?;

    let user = state
        .auth_manager
        .register(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            AuthError::Database(DbError::ConstraintViolation(_)) => {
                ApiError::new(StatusCode::CONFLICT, "Email is already registered")
            }
            other => ApiError::from(other),
        })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

async fn update_user_handler<D: Database>(
    State(state): State<AppState<D>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_credentials(&request)?;

    let user = state
        .auth_manager
        .update_credentials(user_id, &request.email, &request.password)
        .await
        .map_err(|e| match e {
            AuthError::Database(DbError::NotFound) => ApiError::not_found("User not found"),
            AuthError::Database(DbError::ConstraintViolation(_)) => {
                ApiError::new(StatusCode::CONFLICT, "Email is already registered")
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(UserResponse::from(&user)))
}

async fn login_handler<D: Database>(
    State(state): State<AppState<D>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state
        .auth_manager
        .login(&request.email, &request.password, request.expires_in_seconds)
        .await?;

    Ok(Json(response))
}

async fn refresh_handler<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refresh_token = get_bearer_token(&headers).map_err(AuthError::from)?;
    let token = state.auth_manager.refresh(&refresh_token).await?;

    Ok(Json(RefreshResponse { token }))
}

async fn revoke_handler<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let refresh_token = get_bearer_token(&headers).map_err(AuthError::from)?;
    state.auth_manager.revoke(&refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn create_chirp_handler<D: Database>(
    State(state): State<AppState<D>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<CreateChirpRequest>,
) -> Result<(StatusCode, Json<Chirp>), ApiError> {
    let body = prepare_body(&request.body)?;
    let chirp = Chirp::new(body, user_id);

    state.database.create_chirp(&chirp).await?;

    tracing::debug!(chirp_id = %chirp.id, user_id = %user_id, "Chirp created");
    Ok((StatusCode::CREATED, Json(chirp)))
}

async fn list_chirps_handler<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<ListChirpsQuery>,
) -> Result<Json<Vec<Chirp>>, ApiError> {
    let author_id = match query.author_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid author ID"))?,
        ),
    };

    let mut chirps = state.database.list_chirps(author_id).await?;
    if ChirpSort::from_query(query.sort.as_deref()) == ChirpSort::Desc {
        chirps.reverse();
    }

    Ok(Json(chirps))
}

fn parse_chirp_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid chirp ID"))
}

async fn get_chirp_handler<D: Database>(
    State(state): State<AppState<D>>,
    Path(chirp_id): Path<String>,
) -> Result<Json<Chirp>, ApiError> {
    let chirp_id = parse_chirp_id(&chirp_id)?;

    let chirp = state
        .database
        .get_chirp(chirp_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chirp not found"))?;

    Ok(Json(chirp))
}

async fn delete_chirp_handler<D: Database>(
    State(state): State<AppState<D>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(chirp_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let chirp_id = parse_chirp_id(&chirp_id)?;

    let chirp = state
        .database
        .get_chirp(chirp_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chirp not found"))?;

    if chirp.user_id != user_id {
        tracing::info!(chirp_id = %chirp_id, user_id = %user_id, "Delete rejected: not the author");
        return Err(ApiError::forbidden("You can't delete this chirp"));
    }

    state.database.delete_chirp(chirp_id).await.map_err(|e| match e {
        DbError::NotFound => ApiError::not_found("Chirp not found"),
        other => ApiError::from(other),
    })?;

    Ok(StatusCode::NO_CONTENT)
}

async fn polka_webhook_handler<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
    Json(request): Json<WebhookRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth_manager.verify_webhook(&headers)?;

    if request.event != USER_UPGRADED_EVENT {
        tracing::debug!(event = %request.event, "Ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = request.data.user_id;
    state
        .database
        .upgrade_user_to_chirpy_red(user_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::not_found("User not found"),
            other => ApiError::from(other),
        })?;

    tracing::info!(user_id = %user_id, "User upgraded to Chirpy Red");
    Ok(StatusCode::NO_CONTENT)
}
