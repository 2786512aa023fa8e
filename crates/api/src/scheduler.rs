//! # Group Scheduler
//!
//! `GroupScheduler` coordinates the whole group scheduling flow:
//!
//! 1. [`find_available_times`](GroupScheduler::find_available_times) reads every
//!    attendee's calendar and returns the windows in which all of them are free
//! 2. [`open_poll`](GroupScheduler::open_poll) turns the earliest windows into a
//!    poll for the group
//! 3. [`process_vote`](GroupScheduler::process_vote) records ballots
//! 4. [`close_voting`](GroupScheduler::close_voting) picks the winner, writes it
//!    to every voter's calendar, announces it and discards the poll
//!
//! All collaborators are injected as trait objects so the same coordinator runs
//! against Google Calendar and LINE in production and against mocks in tests.

/// Free/busy aggregation across attendees
pub mod availability;
/// Poll lifecycle: open, vote, close
pub mod voting;

use chrono_tz::Tz;
use eyre::{eyre, Report};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc, time::Duration};
use slotpoll_core::services::{CalendarClient, GroupNotifier, SessionStore};

pub use availability::{AvailabilityRequest, FetchOutcome, ParticipantFetch};
pub use voting::{ActionOutcome, GroupPollOutcome, GroupPollRequest};

/// How an attendee whose calendar could not be read is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityPolicy {
    /// The attendee counts as free for the whole range.
    #[default]
    Lenient,
    /// The search fails with an upstream error.
    Strict,
}

impl FromStr for AvailabilityPolicy {
    type Err = Report;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(AvailabilityPolicy::Lenient),
            "strict" => Ok(AvailabilityPolicy::Strict),
            other => Err(eyre!("Unknown availability policy '{}'", other)),
        }
    }
}

/// Tunables of the scheduling flow
///
/// The working window, slot width and weekday rule are fixed and live in
/// `slotpoll_core::slots`.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Civil time zone of the group, used for the working window and replies
    pub timezone: Tz,

    /// Upper bound for a single calendar or messaging call
    pub calendar_timeout: Duration,

    /// Number of windows offered in a new poll
    pub max_poll_options: usize,

    /// Treatment of attendees whose calendar could not be read
    pub policy: AvailabilityPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Tokyo,
            calendar_timeout: Duration::from_secs(10),
            max_poll_options: 5,
            policy: AvailabilityPolicy::Lenient,
        }
    }
}

/// Coordinator of availability search and group polls
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct GroupScheduler {
    calendar: Arc<dyn CalendarClient>,
    notifier: Arc<dyn GroupNotifier>,
    sessions: Arc<dyn SessionStore>,
    settings: SchedulerSettings,
}

impl GroupScheduler {
    /// Creates a scheduler from its collaborators
    ///
    /// # Arguments
    ///
    /// * `calendar` - Reads and writes attendees' calendars
    /// * `notifier` - Posts announcements to group chats
    /// * `sessions` - Owns the open polls
    /// * `settings` - Time zone, timeouts, poll size and degradation policy
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        notifier: Arc<dyn GroupNotifier>,
        sessions: Arc<dyn SessionStore>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            calendar,
            notifier,
            sessions,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }
}
