//! services/api/src/web/presentation.rs
//!
//! Handlers for the interactive parts of the current presentation: the quiz
//! and the expandable Q&A list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lesson_core::presentation::QuizScore;
use lesson_core::ControllerError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::errors::{reject, HandlerError};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Serialize, ToSchema)]
pub struct ToggleResponse {
    pub index: usize,
    pub open: bool,
}

/// Everything the result view shows: slides with layout, image progress,
/// quiz state, Q&A (answers only for open entries) and the puzzle section.
#[utoipa::path(
    get,
    path = "/presentation",
    responses(
        (status = 200, description = "Presentation view"),
        (status = 404, description = "Nothing generated or selected yet")
    )
)]
pub async fn presentation_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let controller = state.controller.lock().await;
    let presentation = controller.current().ok_or_else(|| reject(ControllerError::NoContent))?;
    let view = serde_json::to_value(presentation.view())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(view))
}

#[utoipa::path(
    put,
    path = "/quiz/answers/{index}",
    request_body = AnswerRequest,
    params(("index" = usize, Path, description = "Question index")),
    responses(
        (status = 204, description = "Answer recorded"),
        (status = 404, description = "No such question"),
        (status = 409, description = "Quiz already scored")
    )
)]
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<AnswerRequest>,
) -> Result<StatusCode, HandlerError> {
    let mut controller = state.controller.lock().await;
    controller
        .current_mut()
        .map_err(reject)?
        .answer(index, &req.answer)
        .map_err(|e| reject(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Scores the quiz and locks it until reset.
#[utoipa::path(
    post,
    path = "/quiz/score",
    responses((status = 200, description = "Correct answers out of total"))
)]
pub async fn score_handler(State(state): State<Arc<AppState>>) -> Result<Json<QuizScore>, HandlerError> {
    let mut controller = state.controller.lock().await;
    let score = controller.current_mut().map_err(reject)?.submit_quiz();
    Ok(Json(score))
}

#[utoipa::path(
    post,
    path = "/quiz/reset",
    responses((status = 204, description = "Answers and score cleared"))
)]
pub async fn reset_quiz_handler(State(state): State<Arc<AppState>>) -> Result<StatusCode, HandlerError> {
    let mut controller = state.controller.lock().await;
    controller.current_mut().map_err(reject)?.reset_quiz();
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/qa/{index}/toggle",
    params(("index" = usize, Path, description = "Q&A entry index")),
    responses(
        (status = 200, description = "New open state", body = ToggleResponse),
        (status = 404, description = "No such entry")
    )
)]
pub async fn toggle_qa_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let mut controller = state.controller.lock().await;
    let open = controller
        .current_mut()
        .map_err(reject)?
        .toggle_qa(index)
        .map_err(|e| reject(e.into()))?;
    Ok(Json(ToggleResponse { index, open }))
}
