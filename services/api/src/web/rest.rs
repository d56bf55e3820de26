//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for status, generation, slide images, views and
//! history, plus the master definition for the OpenAPI specification.

use crate::web::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::web::errors::{reject, HandlerError};
use crate::web::presentation::{AnswerRequest, ToggleResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use lesson_core::backfill::{backfill_images, BackfillReport};
use lesson_core::controller::{HistorySummary, Status, View};
use lesson_core::domain::{ContentBundle, SearchParams};
use lesson_core::ControllerError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        status_handler,
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        generate_handler,
        current_content_handler,
        backfill_images_handler,
        set_view_handler,
        list_history_handler,
        select_history_handler,
        clear_history_handler,
        dismiss_error_handler,
        crate::web::presentation::presentation_handler,
        crate::web::presentation::answer_handler,
        crate::web::presentation::score_handler,
        crate::web::presentation::reset_quiz_handler,
        crate::web::presentation::toggle_qa_handler,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, AuthResponse, GenerateRequest, ViewName,
            ClearHistoryResponse, AnswerRequest, ToggleResponse
        )
    ),
    tags(
        (name = "Lesson Generator API", description = "Generate lesson slides, quizzes and puzzles for a topic.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The generation form.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub subject: String,
    pub topic: String,
    pub grade: String,
    /// Defaults to `Uzbek`.
    pub language: Option<String>,
    /// Defaults to `new topic`.
    pub lesson_type: Option<String>,
}

impl From<GenerateRequest> for SearchParams {
    fn from(req: GenerateRequest) -> Self {
        let mut params = SearchParams::new(&req.subject, &req.topic, &req.grade);
        if let Some(language) = req.language.filter(|l| !l.trim().is_empty()) {
            params.language = language;
        }
        if let Some(lesson_type) = req.lesson_type.filter(|l| !l.trim().is_empty()) {
            params.lesson_type = lesson_type;
        }
        params
    }
}

#[derive(Deserialize, Serialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    Create,
    History,
}

impl From<ViewName> for View {
    fn from(view: ViewName) -> Self {
        match view {
            ViewName::Create => View::Create,
            ViewName::History => View::History,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearHistoryQuery {
    /// Must be `true` for anything to be removed.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub cleared: bool,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Current phase, user, loading flag, error banner and view.
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Application status"))
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(state.controller.lock().await.status())
}

/// Generate lesson materials for a subject and topic.
///
/// The controller is unlocked while the model works, so `/status` reports
/// `loading: true` in the meantime.
#[utoipa::path(
    post,
    path = "/content/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated bundle"),
        (status = 400, description = "Subject or topic missing"),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Signed out or replaced by a newer request while generating"),
        (status = 429, description = "Model quota exhausted"),
        (status = 502, description = "Model call failed or returned invalid JSON")
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<ContentBundle>, HandlerError> {
    let params = SearchParams::from(req);
    let ticket = state
        .controller
        .lock()
        .await
        .begin_generation(&params)
        .map_err(reject)?;

    let result = state.content_adapter.generate_content(&params).await;

    let bundle = state
        .controller
        .lock()
        .await
        .finish_generation(ticket, result)
        .map_err(reject)?;
    Ok(Json(bundle))
}

/// The bundle currently shown, including any slide images generated so far.
#[utoipa::path(
    get,
    path = "/content/current",
    responses(
        (status = 200, description = "Current bundle"),
        (status = 404, description = "Nothing generated or selected yet")
    )
)]
pub async fn current_content_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ContentBundle>, HandlerError> {
    let controller = state.controller.lock().await;
    let presentation = controller.current().ok_or_else(|| reject(ControllerError::NoContent))?;
    Ok(Json(presentation.bundle().clone()))
}

/// Generate illustrations for every slide that still lacks one.
///
/// Slides are processed one at a time; after a quota error the rest get
/// placeholder images.
#[utoipa::path(
    post,
    path = "/content/current/images",
    responses(
        (status = 200, description = "Backfill report"),
        (status = 404, description = "Nothing generated or selected yet")
    )
)]
pub async fn backfill_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BackfillReport>, HandlerError> {
    let job = state.controller.lock().await.begin_backfill().map_err(reject)?;
    let Some(mut job) = job else {
        return Ok(Json(BackfillReport::default()));
    };

    let report = backfill_images(&mut job.slides, &job.subject, state.image_adapter.as_ref()).await;
    state.controller.lock().await.finish_backfill(job, &report);
    Ok(Json(report))
}

#[utoipa::path(
    put,
    path = "/view/{view}",
    params(("view" = ViewName, Path, description = "`create` or `history`")),
    responses((status = 204, description = "View switched"))
)]
pub async fn set_view_handler(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewName>,
) -> Result<StatusCode, HandlerError> {
    state.controller.lock().await.set_view(view.into()).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stored history, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "History entries"))
)]
pub async fn list_history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HistorySummary>> {
    Json(state.controller.lock().await.history_summaries())
}

#[utoipa::path(
    post,
    path = "/history/{id}/select",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "Entry is now the current content"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn select_history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ContentBundle>, HandlerError> {
    let bundle = state
        .controller
        .lock()
        .await
        .select_from_history(&id)
        .map_err(reject)?;
    Ok(Json(bundle))
}

#[utoipa::path(
    delete,
    path = "/history",
    params(ClearHistoryQuery),
    responses((status = 200, description = "Whether history was cleared", body = ClearHistoryResponse))
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearHistoryQuery>,
) -> Result<Json<ClearHistoryResponse>, HandlerError> {
    let cleared = state
        .controller
        .lock()
        .await
        .clear_history(query.confirm)
        .map_err(reject)?;
    if !cleared {
        info!("History clear requested without confirmation");
    }
    Ok(Json(ClearHistoryResponse { cleared }))
}

#[utoipa::path(
    post,
    path = "/error/dismiss",
    responses((status = 204, description = "Error banner dismissed"))
)]
pub async fn dismiss_error_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.controller.lock().await.dismiss_error();
    StatusCode::NO_CONTENT
}
