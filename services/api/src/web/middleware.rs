//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::errors::{reject, HandlerError};
use crate::web::state::AppState;

/// Middleware that lets a request through only while a user is signed in.
///
/// Returns 401 when signed out and 503 while the service is still initializing.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    state
        .controller
        .lock()
        .await
        .require_authenticated()
        .map_err(reject)?;

    Ok(next.run(req).await)
}
