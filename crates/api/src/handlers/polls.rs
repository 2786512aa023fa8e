//! # Poll Handlers
//!
//! Endpoints driven by the chat layer: opening a poll for a group, relaying
//! button presses from a rendered poll, and inspecting an open poll.
//!
//! Every response to a poll action carries a `reply` text that the chat layer
//! can post back verbatim.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use slotpoll_core::{
    errors::ScheduleError,
    models::{
        poll::{PollAction, PollPresentation},
        voting::{SessionKey, SessionSnapshot},
    },
};
use std::sync::Arc;
use tracing::error;

use crate::{
    middleware::error_handling::{public_message, status_for, AppError},
    replies,
    scheduler::{ActionOutcome, GroupPollOutcome, GroupPollRequest},
    ApiState,
};

/// Response of poll creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePollResponse {
    /// The poll to render, absent when nobody is free at the same time
    pub poll: Option<PollPresentation>,

    /// Text for the group chat
    pub reply: String,
}

/// A button press relayed by the chat layer
#[derive(Debug, Serialize, Deserialize)]
pub struct PollActionRequest {
    /// User who pressed the button
    pub user_id: String,

    /// Decoded postback data of the button
    pub action: PollAction,
}

/// Response of a poll action, successful or not
#[derive(Debug, Serialize, Deserialize)]
pub struct PollActionResponse {
    pub ok: bool,

    /// Text for the chat, safe to show as-is
    pub reply: String,

    /// What the action did; absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActionOutcome>,

    /// Error detail that may be shown to users; absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Searches for common free time and opens a poll over it
///
/// # Endpoint
///
/// ```text
/// POST /api/polls
/// {
///   "group_id": "C123",
///   "event_title": "Retro",
///   "organizer_id": "U1",
///   "participant_ids": ["U2"],
///   "start": "2024-06-03T00:00:00Z",
///   "end": "2024-06-08T00:00:00Z",
///   "duration_minutes": 60
/// }
/// ```
///
/// # Returns
///
/// * `Result<Json<CreatePollResponse>, AppError>` - The poll to render and a reply;
///   `poll` is null when there is no common free time
#[axum::debug_handler]
pub async fn create_poll(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<GroupPollRequest>,
) -> Result<Json<CreatePollResponse>, AppError> {
    let outcome = state.scheduler.schedule_group_poll(&request).await?;

    let response = match outcome {
        GroupPollOutcome::Opened { poll } => CreatePollResponse {
            reply: replies::poll_opened(&request.event_title, poll.options.len()),
            poll: Some(poll),
        },
        GroupPollOutcome::NoCommonTime => CreatePollResponse {
            poll: None,
            reply: replies::no_common_time(&request.event_title),
        },
    };

    Ok(Json(response))
}

/// Applies a vote or close action on behalf of a user
///
/// The action runs on its own task so that a close keeps going to teardown
/// even if the client disconnects or the request times out.
///
/// # Endpoint
///
/// ```text
/// POST /api/polls/actions
/// {
///   "user_id": "U2",
///   "action": { "action": "close_vote", "group_id": "C123", "event_title": "Retro" }
/// }
/// ```
#[axum::debug_handler]
pub async fn poll_action(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PollActionRequest>,
) -> Response {
    let scheduler = state.scheduler.clone();
    let PollActionRequest { user_id, action } = request;
    let dispatched = action.clone();

    let result = tokio::spawn(async move { scheduler.handle_action(&user_id, dispatched).await })
        .await
        .unwrap_or_else(|join_err| Err(ScheduleError::Internal(Box::new(join_err))));

    let timezone = state.scheduler.settings().timezone;
    match result {
        Ok(outcome) => {
            let reply = match &outcome {
                ActionOutcome::Voted { key, option, .. } => {
                    replies::vote_recorded(&key.event_title, option, timezone)
                }
                ActionOutcome::Closed { report } => replies::poll_closed(report, timezone),
            };
            let body = PollActionResponse {
                ok: true,
                reply,
                outcome: Some(outcome),
                error: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            if !err.is_user_facing() {
                error!("Poll action {:?} failed: {:?}", action, err);
            }
            let body = PollActionResponse {
                ok: false,
                reply: replies::action_failed(&action, &err),
                outcome: None,
                error: Some(public_message(&err)),
            };
            (status_for(&err), Json(body)).into_response()
        }
    }
}

/// Current options and standings of an open poll
///
/// # Endpoint
///
/// ```text
/// GET /api/polls/:group_id/:event_title
/// ```
#[axum::debug_handler]
pub async fn get_poll(
    State(state): State<Arc<ApiState>>,
    Path((group_id, event_title)): Path<(String, String)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .scheduler
        .session_snapshot(&SessionKey::new(group_id, event_title))
        .await?;

    Ok(Json(snapshot))
}
