pub mod auth;
pub mod errors;
pub mod middleware;
pub mod presentation;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;

/// Builds the API router: public status and auth routes, everything else
/// behind `require_auth`.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/status", get(rest::status_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/content/generate", post(rest::generate_handler))
        .route("/content/current", get(rest::current_content_handler))
        .route("/content/current/images", post(rest::backfill_images_handler))
        .route("/view/{view}", put(rest::set_view_handler))
        .route(
            "/history",
            get(rest::list_history_handler).delete(rest::clear_history_handler),
        )
        .route("/history/{id}/select", post(rest::select_history_handler))
        .route("/error/dismiss", post(rest::dismiss_error_handler))
        .route("/presentation", get(presentation::presentation_handler))
        .route("/quiz/answers/{index}", put(presentation::answer_handler))
        .route("/quiz/score", post(presentation::score_handler))
        .route("/quiz/reset", post(presentation::reset_quiz_handler))
        .route("/qa/{index}/toggle", post(presentation::toggle_qa_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
