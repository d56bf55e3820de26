//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and logout.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lesson_core::domain::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::errors::{reject, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl From<User> for AuthResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account and sign into it
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Missing fields or password too short"),
        (status = 409, description = "Email already registered, or already signed in"),
        (status = 503, description = "Still starting up")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .controller
        .lock()
        .await
        .register(&req.full_name, &req.email, &req.password)
        .map_err(reject)?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(user))))
}

/// POST /auth/login - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Unknown email or wrong password"),
        (status = 409, description = "Already signed in"),
        (status = 503, description = "Still starting up")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, HandlerError> {
    let user = state
        .controller
        .lock()
        .await
        .login(&req.email, &req.password)
        .map_err(reject)?;

    Ok(Json(AuthResponse::from(user)))
}

/// POST /auth/logout - Sign out and forget the in-memory content and history
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Result<StatusCode, HandlerError> {
    state.controller.lock().await.logout().map_err(reject)?;
    Ok(StatusCode::OK)
}
