//! # Availability Handlers
//!
//! Searches for windows in which every attendee is free.
//!
//! ## Availability Algorithm
//!
//! 1. Every attendee's calendar is read concurrently, each call bounded by the
//!    configured timeout
//! 2. Each weekday in range is cut into 30 minute slots between 09:00 and 18:00
//!    in the group's time zone
//! 3. A slot overlapping any attendee's event is busy for the whole group
//! 4. Every run of free slots long enough for the meeting yields a window;
//!    overlapping windows are all reported
//!
//! Attendees whose calendar cannot be read are either treated as free or fail
//! the search, depending on the configured policy.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use slotpoll_core::models::time_slot::AvailabilityWindow;
use std::sync::Arc;

use crate::{middleware::error_handling::AppError, scheduler::AvailabilityRequest, ApiState};

/// Response of the availability search
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilitySearchResponse {
    /// Number of windows found
    pub count: usize,

    /// Candidate windows in chronological order
    pub windows: Vec<AvailabilityWindow>,
}

/// Finds common free windows for a group
///
/// # Endpoint
///
/// ```text
/// POST /api/availability/search
/// {
///   "organizer_id": "U1",
///   "participant_ids": ["U2", "U3"],
///   "start": "2024-06-03T00:00:00Z",
///   "end": "2024-06-08T00:00:00Z",
///   "duration_minutes": 60
/// }
/// ```
///
/// # Returns
///
/// * `Result<Json<AvailabilitySearchResponse>, AppError>` - Windows, possibly none
#[axum::debug_handler]
pub async fn search_availability(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilitySearchResponse>, AppError> {
    let windows = state.scheduler.find_available_times(&request).await?;

    Ok(Json(AvailabilitySearchResponse {
        count: windows.len(),
        windows,
    }))
}
