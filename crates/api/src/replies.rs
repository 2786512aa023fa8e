//! # Chat Replies
//!
//! Polite, user-facing texts for the chat layer. Times are always rendered in
//! the group's civil time zone; error details are only included when the error
//! is safe to show to users.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use slotpoll_core::{
    errors::ScheduleError,
    models::{
        poll::PollAction,
        voting::{FinalizationReport, PollOption},
    },
};

const WHEN_FORMAT: &str = "%Y-%m-%d (%a) %H:%M";

pub fn format_when(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(WHEN_FORMAT).to_string()
}

/// `2024-06-03 (Mon) 10:00-11:00`, with the end date spelled out only when it
/// falls on another day.
pub fn format_span(option: &PollOption, tz: Tz) -> String {
    let start = option.start.with_timezone(&tz);
    let end = option.end.with_timezone(&tz);
    if start.date_naive() == end.date_naive() {
        format!("{}-{}", start.format(WHEN_FORMAT), end.format("%H:%M"))
    } else {
        format!("{} - {}", start.format(WHEN_FORMAT), end.format(WHEN_FORMAT))
    }
}

pub fn no_common_time(event_title: &str) -> String {
    format!(
        "Sorry, there is no time when everyone is free for {}. Try a wider date range or a shorter meeting.",
        event_title
    )
}

pub fn poll_opened(event_title: &str, option_count: usize) -> String {
    format!(
        "A poll for {} is open with {} candidate times. Tap the time that suits you.",
        event_title, option_count
    )
}

pub fn vote_recorded(event_title: &str, option: &PollOption, tz: Tz) -> String {
    format!("Your vote for {} ({}) has been recorded.", event_title, format_span(option, tz))
}

pub fn poll_closed(report: &FinalizationReport, tz: Tz) -> String {
    format!(
        "Voting for {} is closed. The most popular time was chosen: {}.",
        report.key.event_title,
        format_span(&report.winner, tz)
    )
}

/// Group announcement sent once a poll has been closed.
pub fn finalized_announcement(
    event_title: &str,
    winner: &PollOption,
    committed: usize,
    voters: usize,
    tz: Tz,
) -> String {
    let calendars = if voters == 0 {
        "Nobody voted, so no calendars were updated.".to_string()
    } else if committed == voters {
        "It has been added to every participant's calendar.".to_string()
    } else {
        format!(
            "It has been added to {} of {} participants' calendars. The others may need to add it themselves.",
            committed, voters
        )
    };

    format!(
        "{} is scheduled for {}.\n{}",
        event_title,
        format_span(winner, tz),
        calendars
    )
}

/// Reply for a poll action that could not be carried out.
pub fn action_failed(action: &PollAction, err: &ScheduleError) -> String {
    let key = action.session_key();
    match (action, err) {
        (PollAction::CloseVote { .. }, ScheduleError::NotFound(_)) => {
            format!("There is no open poll for {} to close.", key.event_title)
        }
        (_, ScheduleError::Validation(message)) => {
            format!("Sorry, that did not work for {}: {}", key.event_title, message)
        }
        (PollAction::Vote { .. }, _) => {
            "Sorry, something went wrong while recording your vote. Please try again later.".to_string()
        }
        (PollAction::CloseVote { .. }, _) => {
            "Sorry, something went wrong while closing the poll. Please try again later.".to_string()
        }
    }
}
