//! services/api/src/web/errors.rs
//!
//! Maps controller errors onto HTTP responses.

use axum::http::StatusCode;
use lesson_core::controller::{ControllerError, GENERIC_FAILURE_MESSAGE, RATE_LIMIT_MESSAGE};
use lesson_core::credentials::AuthError;
use lesson_core::ports::PortError;
use lesson_core::presentation::PresentationError;
use tracing::error;

pub type HandlerError = (StatusCode, String);

/// Converts a controller error into the status and message sent to the client.
pub fn reject(err: ControllerError) -> HandlerError {
    let status = match &err {
        ControllerError::Initializing => StatusCode::SERVICE_UNAVAILABLE,
        ControllerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ControllerError::AlreadyAuthenticated => StatusCode::CONFLICT,
        ControllerError::MissingParams => StatusCode::BAD_REQUEST,
        ControllerError::Superseded => StatusCode::CONFLICT,
        ControllerError::Auth(auth) => match auth {
            AuthError::IncompleteFields | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::UserNotFound | AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ControllerError::Port(PortError::QuotaExceeded) => StatusCode::TOO_MANY_REQUESTS,
        ControllerError::Port(PortError::GenerationFailed(_)) => StatusCode::BAD_GATEWAY,
        ControllerError::Port(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ControllerError::NoContent | ControllerError::UnknownHistoryEntry(_) => StatusCode::NOT_FOUND,
        ControllerError::Presentation(PresentationError::QuizLocked) => StatusCode::CONFLICT,
        ControllerError::Presentation(_) => StatusCode::NOT_FOUND,
    };

    let message = match &err {
        ControllerError::Port(PortError::QuotaExceeded) => RATE_LIMIT_MESSAGE.to_string(),
        ControllerError::Port(PortError::GenerationFailed(_)) => GENERIC_FAILURE_MESSAGE.to_string(),
        _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
            error!("Request failed: {:?}", err);
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };

    (status, message)
}
