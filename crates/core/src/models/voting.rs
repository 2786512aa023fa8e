use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::errors::{ScheduleError, ScheduleResult};
use crate::models::time_slot::AvailabilityWindow;

/// Identifies one open poll: a group may run several polls as long as
/// their titles differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub group_id: String,
    pub event_title: String,
}

impl SessionKey {
    pub fn new(group_id: impl Into<String>, event_title: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            event_title: event_title.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.event_title)
    }
}

/// A candidate time offered in a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<AvailabilityWindow> for PollOption {
    fn from(window: AvailabilityWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

/// Mutable state of one group poll.
///
/// `options` keeps the order in which the choices were offered, so a
/// position doubles as the option index carried by ballots. `ballots` holds
/// exactly one current choice per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    pub id: Uuid,
    pub key: SessionKey,
    pub options: Vec<PollOption>,
    pub ballots: BTreeMap<String, usize>,
    pub created_at: DateTime<Utc>,
}

/// What a single ballot changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotOutcome {
    pub option_index: usize,
    pub appended_option: bool,
    pub previous_choice: Option<usize>,
}

impl VotingSession {
    pub fn new(key: SessionKey) -> Self {
        Self::with_options(key, Vec::new())
    }

    pub fn with_options(key: SessionKey, options: Vec<PollOption>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            options,
            ballots: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.key.event_title
    }

    /// Records `user_id`'s choice, replacing any earlier ballot.
    ///
    /// An index equal to the current option count registers `option` as the
    /// next choice. Indices past that, or an option that disagrees with the
    /// one already registered at the index, are rejected and leave the
    /// session untouched.
    pub fn record_ballot(
        &mut self,
        user_id: &str,
        option_index: usize,
        option: PollOption,
    ) -> ScheduleResult<BallotOutcome> {
        let appended_option = match option_index.cmp(&self.options.len()) {
            std::cmp::Ordering::Less => {
                let registered = self.options[option_index];
                if registered != option {
                    return Err(ScheduleError::Validation(format!(
                        "Option {} of '{}' is {} - {}, not {} - {}",
                        option_index,
                        self.key.event_title,
                        registered.start.to_rfc3339(),
                        registered.end.to_rfc3339(),
                        option.start.to_rfc3339(),
                        option.end.to_rfc3339(),
                    )));
                }
                false
            }
            std::cmp::Ordering::Equal => {
                if option.start >= option.end {
                    return Err(ScheduleError::Validation(format!(
                        "Option {} of '{}' ends before it starts",
                        option_index, self.key.event_title
                    )));
                }
                self.options.push(option);
                true
            }
            std::cmp::Ordering::Greater => {
                return Err(ScheduleError::Validation(format!(
                    "Option {} does not exist in '{}' ({} options registered)",
                    option_index,
                    self.key.event_title,
                    self.options.len()
                )));
            }
        };

        let previous_choice = self.ballots.insert(user_id.to_string(), option_index);

        Ok(BallotOutcome {
            option_index,
            appended_option,
            previous_choice,
        })
    }

    /// Everyone who currently holds a ballot, in a stable order.
    pub fn voters(&self) -> impl Iterator<Item = &str> {
        self.ballots.keys().map(String::as_str)
    }
}

/// Result of writing the winning slot to one voter's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed { event_id: String },
    Failed { reason: String },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCommit {
    pub user_id: String,
    #[serde(flatten)]
    pub outcome: CommitOutcome,
}

/// Everything that happened when a poll was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationReport {
    pub key: SessionKey,
    pub winning_index: usize,
    pub winner: PollOption,
    pub counts: Vec<usize>,
    pub commits: Vec<UserCommit>,
    pub notified: bool,
}

impl FinalizationReport {
    pub fn failed_commits(&self) -> impl Iterator<Item = &UserCommit> {
        self.commits.iter().filter(|c| !c.outcome.is_committed())
    }
}

/// Read-only view of an open poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub key: SessionKey,
    pub options: Vec<PollOption>,
    pub counts: Vec<usize>,
    pub ballots_cast: usize,
    pub leading_index: Option<usize>,
    pub created_at: DateTime<Utc>,
}
