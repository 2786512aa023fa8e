use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use slotpoll_core::{
    availability::find_windows,
    errors::{ScheduleError, ScheduleResult},
    models::{calendar::CalendarEvent, time_slot::AvailabilityWindow},
    slots::{generate_slots, mark_busy},
};
use tracing::{debug, info, warn};

use super::{AvailabilityPolicy, GroupScheduler};

fn default_duration_minutes() -> i64 {
    60
}

/// A search for times when everybody in a group is free
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub organizer_id: String,
    #[serde(default)]
    pub participant_ids: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
}

impl AvailabilityRequest {
    /// Organizer first, then participants, each user at most once.
    pub fn attendees(&self) -> Vec<&str> {
        let mut attendees: Vec<&str> = Vec::with_capacity(self.participant_ids.len() + 1);
        for user_id in std::iter::once(&self.organizer_id).chain(&self.participant_ids) {
            if !attendees.contains(&user_id.as_str()) {
                attendees.push(user_id);
            }
        }
        attendees
    }

    /// Meeting length; zero when `duration_minutes` is out of range, which
    /// `validate` rejects.
    pub fn duration(&self) -> Duration {
        Duration::try_minutes(self.duration_minutes).unwrap_or_else(Duration::zero)
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.organizer_id.trim().is_empty() {
            return Err(ScheduleError::Validation("An organizer is required".to_string()));
        }
        if self.start >= self.end {
            return Err(ScheduleError::Validation(format!(
                "Search range must end after it starts ({} - {})",
                self.start.to_rfc3339(),
                self.end.to_rfc3339()
            )));
        }
        if self.duration_minutes <= 0 {
            return Err(ScheduleError::Validation(format!(
                "Meeting duration must be positive, got {} minutes",
                self.duration_minutes
            )));
        }
        let range_minutes = (self.end - self.start).num_minutes();
        if self.duration_minutes > range_minutes {
            return Err(ScheduleError::Validation(format!(
                "Meeting duration of {} minutes does not fit in a {} minute search range",
                self.duration_minutes, range_minutes
            )));
        }
        Ok(())
    }
}

/// What reading one attendee's calendar produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Events(Vec<CalendarEvent>),
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFetch {
    pub user_id: String,
    pub outcome: FetchOutcome,
}

impl GroupScheduler {
    /// Reads every attendee's calendar concurrently, each call bounded by the
    /// configured timeout.
    pub async fn fetch_participant_events(&self, request: &AvailabilityRequest) -> Vec<ParticipantFetch> {
        let timeout = self.settings.calendar_timeout;
        let fetches = request.attendees().into_iter().map(|user_id| async move {
            let call = self.calendar.get_events(user_id, request.start, request.end);
            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(events)) => FetchOutcome::Events(events),
                Ok(Err(err)) => FetchOutcome::Failed(format!("{:#}", err)),
                Err(_) => FetchOutcome::TimedOut,
            };
            ParticipantFetch {
                user_id: user_id.to_string(),
                outcome,
            }
        });

        join_all(fetches).await
    }

    /// Finds every window of the requested length in which all attendees are
    /// free, in chronological order
    ///
    /// Windows may overlap; truncation happens when a poll is opened.
    ///
    /// # Arguments
    ///
    /// * `request` - Attendees, search range and meeting duration
    ///
    /// # Returns
    ///
    /// * `ScheduleResult<Vec<AvailabilityWindow>>` - Candidate windows, possibly empty
    ///
    /// # Errors
    ///
    /// * `Validation` for an empty organizer, an inverted range, or a duration
    ///   that is not positive or exceeds the range
    /// * `Upstream` when a calendar could not be read and the policy is strict
    pub async fn find_available_times(
        &self,
        request: &AvailabilityRequest,
    ) -> ScheduleResult<Vec<AvailabilityWindow>> {
        request.validate()?;

        let fetches = self.fetch_participant_events(request).await;

        let mut busy: Vec<CalendarEvent> = Vec::new();
        for fetch in fetches {
            match fetch.outcome {
                FetchOutcome::Events(events) => {
                    debug!("{} has {} events in range", fetch.user_id, events.len());
                    busy.extend(events);
                }
                FetchOutcome::TimedOut => self.degrade(&fetch.user_id, "timed out")?,
                FetchOutcome::Failed(reason) => self.degrade(&fetch.user_id, &reason)?,
            }
        }

        let mut slots = generate_slots(request.start, request.end, self.settings.timezone);
        mark_busy(&mut slots, &busy);
        let windows = find_windows(&slots, request.duration());

        info!(
            "Found {} windows of {} minutes for {} attendees across {} slots",
            windows.len(),
            request.duration_minutes,
            request.attendees().len(),
            slots.len()
        );

        Ok(windows)
    }

    fn degrade(&self, user_id: &str, reason: &str) -> ScheduleResult<()> {
        match self.settings.policy {
            AvailabilityPolicy::Lenient => {
                warn!("Calendar of {} unavailable ({}); treating them as free", user_id, reason);
                Ok(())
            }
            AvailabilityPolicy::Strict => Err(ScheduleError::Upstream(format!(
                "Calendar of {} could not be read: {}",
                user_id, reason
            ))),
        }
    }
}
