use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::voting::{PollOption, SessionKey};

/// A button press coming back from a rendered poll.
///
/// Carried as JSON in the chat platform's postback payload so that titles
/// containing separators survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PollAction {
    Vote {
        group_id: String,
        event_title: String,
        option_index: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CloseVote {
        group_id: String,
        event_title: String,
    },
}

impl PollAction {
    pub fn vote(key: &SessionKey, option_index: usize, option: PollOption) -> Self {
        PollAction::Vote {
            group_id: key.group_id.clone(),
            event_title: key.event_title.clone(),
            option_index,
            start: option.start,
            end: option.end,
        }
    }

    pub fn close(key: &SessionKey) -> Self {
        PollAction::CloseVote {
            group_id: key.group_id.clone(),
            event_title: key.event_title.clone(),
        }
    }

    pub fn session_key(&self) -> SessionKey {
        match self {
            PollAction::Vote {
                group_id,
                event_title,
                ..
            }
            | PollAction::CloseVote {
                group_id,
                event_title,
            } => SessionKey::new(group_id.clone(), event_title.clone()),
        }
    }

    pub fn to_postback_data(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_postback_data(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptionView {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub action: PollAction,
}

/// Everything the chat layer needs to render a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPresentation {
    pub group_id: String,
    pub event_title: String,
    pub options: Vec<PollOptionView>,
    pub close_action: PollAction,
}

impl PollPresentation {
    pub fn new(key: &SessionKey, options: &[PollOption]) -> Self {
        let options = options
            .iter()
            .enumerate()
            .map(|(index, option)| PollOptionView {
                index,
                start: option.start,
                end: option.end,
                action: PollAction::vote(key, index, *option),
            })
            .collect();

        Self {
            group_id: key.group_id.clone(),
            event_title: key.event_title.clone(),
            options,
            close_action: PollAction::close(key),
        }
    }
}
