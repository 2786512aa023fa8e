//! # Error Handling Middleware
//!
//! Maps `ScheduleError` to HTTP status codes and JSON error bodies.
//!
//! Validation and not-found messages are returned verbatim because they are
//! meant for users. Upstream, database and internal failures are logged with
//! their full detail by the caller and answered with a generic message instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use slotpoll_core::errors::ScheduleError;
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use slotpoll_api::middleware::error_handling::AppError;
/// use slotpoll_core::errors::ScheduleError;
///
/// async fn handler(title: String) -> Result<Json<String>, AppError> {
///     if title.is_empty() {
///         return Err(AppError(ScheduleError::Validation("An event title is required".into())));
///     }
///     Ok(Json(title))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub ScheduleError);

/// HTTP status for a domain error
pub fn status_for(err: &ScheduleError) -> StatusCode {
    match err {
        ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
        ScheduleError::Validation(_) => StatusCode::BAD_REQUEST,
        ScheduleError::Upstream(_) => StatusCode::BAD_GATEWAY,
        ScheduleError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ScheduleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message safe to return to a client. Callers log the full error.
pub fn public_message(err: &ScheduleError) -> String {
    match err {
        ScheduleError::NotFound(_) | ScheduleError::Validation(_) => err.to_string(),
        ScheduleError::Upstream(_) => {
            "A calendar or messaging service could not be reached. Please try again later.".to_string()
        }
        ScheduleError::Database(_) | ScheduleError::Internal(_) => {
            "Something went wrong on our side. Please try again later.".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.0.is_user_facing() {
            error!("Request failed: {:?}", self.0);
        }
        let status = status_for(&self.0);
        let body = Json(json!({ "error": public_message(&self.0) }));

        (status, body).into_response()
    }
}

/// Allows `?` on `ScheduleResult` inside handlers.
impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError(err)
    }
}

/// Wraps repository and adapter failures as database errors.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(ScheduleError::Database(err))
    }
}

/// Maps a ScheduleError to an HTTP response
pub fn map_error(err: ScheduleError) -> Response {
    AppError(err).into_response()
}
