use futures::future::join_all;
use serde::{Deserialize, Serialize};
use slotpoll_core::{
    errors::{ScheduleError, ScheduleResult},
    models::{
        calendar::NewCalendarEvent,
        poll::{PollAction, PollPresentation},
        time_slot::AvailabilityWindow,
        voting::{
            BallotOutcome, CommitOutcome, FinalizationReport, PollOption, SessionKey,
            SessionSnapshot, UserCommit, VotingSession,
        },
    },
    tally::VoteTally,
};
use tracing::{debug, error, info, warn};

use super::{AvailabilityRequest, GroupScheduler};
use crate::replies;

/// Find common free time and open a poll over it in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPollRequest {
    pub group_id: String,
    pub event_title: String,
    #[serde(flatten)]
    pub availability: AvailabilityRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupPollOutcome {
    Opened { poll: PollPresentation },
    NoCommonTime,
}

/// Result of dispatching a [`PollAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionOutcome {
    Voted {
        key: SessionKey,
        option: PollOption,
        ballot: BallotOutcome,
    },
    Closed {
        report: FinalizationReport,
    },
}

fn validate_key(key: &SessionKey) -> ScheduleResult<()> {
    if key.group_id.trim().is_empty() {
        return Err(ScheduleError::Validation("A group id is required".to_string()));
    }
    if key.event_title.trim().is_empty() {
        return Err(ScheduleError::Validation("An event title is required".to_string()));
    }
    Ok(())
}

impl GroupScheduler {
    /// Opens a poll offering the earliest `max_poll_options` windows
    ///
    /// # Arguments
    ///
    /// * `key` - Group and event title identifying the poll
    /// * `windows` - Candidate windows in chronological order
    ///
    /// # Returns
    ///
    /// * `ScheduleResult<PollPresentation>` - Options and actions to render in the chat
    ///
    /// # Errors
    ///
    /// * `Validation` if there are no windows or a poll with the same key is already open
    pub async fn open_poll(
        &self,
        key: &SessionKey,
        windows: &[AvailabilityWindow],
    ) -> ScheduleResult<PollPresentation> {
        validate_key(key)?;
        if windows.is_empty() {
            return Err(ScheduleError::Validation(format!(
                "No candidate times to offer for '{}'",
                key.event_title
            )));
        }

        let _lock = self.sessions.lock(key).await?;
        if self.sessions.get(key).await?.is_some() {
            return Err(ScheduleError::Validation(format!(
                "A poll for '{}' is already open in this group",
                key.event_title
            )));
        }

        let options: Vec<PollOption> = windows
            .iter()
            .take(self.settings.max_poll_options)
            .copied()
            .map(PollOption::from)
            .collect();
        let session = VotingSession::with_options(key.clone(), options);
        self.sessions.upsert(&session).await?;

        info!("Opened poll {} ({}) with {} options", key, session.id, session.options.len());

        Ok(PollPresentation::new(key, &session.options))
    }

    /// Searches for common free time and, if there is any, opens a poll over it.
    pub async fn schedule_group_poll(&self, request: &GroupPollRequest) -> ScheduleResult<GroupPollOutcome> {
        let key = SessionKey::new(request.group_id.clone(), request.event_title.clone());
        validate_key(&key)?;

        let windows = self.find_available_times(&request.availability).await?;
        if windows.is_empty() {
            info!("No common free time for {}", key);
            return Ok(GroupPollOutcome::NoCommonTime);
        }

        let poll = self.open_poll(&key, &windows).await?;
        Ok(GroupPollOutcome::Opened { poll })
    }

    /// Records `user_id`'s ballot, replacing any earlier one
    ///
    /// A poll that was never opened is created by its first ballot, and an
    /// option is registered the first time its index is voted for.
    ///
    /// # Errors
    ///
    /// * `Validation` for an index past the next unregistered one, or times that
    ///   disagree with the option already registered at the index
    /// * `Database` if the session store fails; the ballot is then not recorded
    pub async fn process_vote(
        &self,
        user_id: &str,
        key: &SessionKey,
        option_index: usize,
        option: PollOption,
    ) -> ScheduleResult<BallotOutcome> {
        validate_key(key)?;
        if user_id.trim().is_empty() {
            return Err(ScheduleError::Validation("A user id is required to vote".to_string()));
        }

        let _lock = self.sessions.lock(key).await?;
        let mut session = match self.sessions.get(key).await? {
            Some(session) => session,
            None => {
                info!("First ballot for {}; starting a new poll", key);
                VotingSession::new(key.clone())
            }
        };

        let outcome = session.record_ballot(user_id, option_index, option)?;
        self.sessions.upsert(&session).await?;

        debug!(
            "{} voted for option {} of {} (previously {:?})",
            user_id, option_index, key, outcome.previous_choice
        );

        Ok(outcome)
    }

    /// Closes a poll: tally, commit the winner to every voter's calendar,
    /// announce it to the group, then discard the session
    ///
    /// The key stays locked until teardown, so a ballot arriving during the
    /// close waits and then starts a new poll under the same key.
    ///
    /// # Returns
    ///
    /// * `ScheduleResult<FinalizationReport>` - Winner, counts, per-voter commit
    ///   results and whether the announcement was delivered
    ///
    /// # Errors
    ///
    /// * `NotFound` if no poll is open for the key
    /// * `Validation` if the poll has no options; the poll is kept
    /// * `Database` if the session store fails; the poll is kept
    pub async fn close_voting(&self, key: &SessionKey) -> ScheduleResult<FinalizationReport> {
        let _lock = self.sessions.lock(key).await?;
        let session = self
            .sessions
            .get(key)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("No open poll for {}", key)))?;

        let tally = VoteTally::from_session(&session);
        let winning_index = tally.winner().ok_or_else(|| {
            ScheduleError::Validation(format!("The poll for '{}' has no options", key.event_title))
        })?;
        let winner = session.options[winning_index];

        let event = NewCalendarEvent {
            title: session.title().to_string(),
            start: winner.start,
            end: winner.end,
        };
        let commits = self.commit_to_voters(&session, &event).await;
        let committed = commits.iter().filter(|c| c.outcome.is_committed()).count();

        let announcement = replies::finalized_announcement(
            session.title(),
            &winner,
            committed,
            commits.len(),
            self.settings.timezone,
        );
        let notified = self.announce(&key.group_id, &announcement).await;

        self.sessions.delete(key).await?;

        info!(
            "Closed poll {} ({}): option {} won with {} of {} ballots, {}/{} calendars updated",
            key,
            session.id,
            winning_index,
            tally.counts[winning_index],
            tally.total(),
            committed,
            commits.len()
        );

        Ok(FinalizationReport {
            key: key.clone(),
            winning_index,
            winner,
            counts: tally.counts,
            commits,
            notified,
        })
    }

    async fn commit_to_voters(&self, session: &VotingSession, event: &NewCalendarEvent) -> Vec<UserCommit> {
        let timeout = self.settings.calendar_timeout;
        let commits = session.voters().map(|user_id| async move {
            let call = self.calendar.create_event(user_id, event);
            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(event_id)) => CommitOutcome::Committed { event_id },
                Ok(Err(err)) => CommitOutcome::Failed {
                    reason: format!("{:#}", err),
                },
                Err(_) => CommitOutcome::Failed {
                    reason: format!("timed out after {}s", timeout.as_secs()),
                },
            };
            if let CommitOutcome::Failed { reason } = &outcome {
                warn!("Could not add '{}' to the calendar of {}: {}", event.title, user_id, reason);
            }
            UserCommit {
                user_id: user_id.to_string(),
                outcome,
            }
        });

        join_all(commits).await
    }

    async fn announce(&self, group_id: &str, text: &str) -> bool {
        let call = self.notifier.send_group_message(group_id, text);
        match tokio::time::timeout(self.settings.calendar_timeout, call).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                error!("Failed to notify group {}: {:#}", group_id, err);
                false
            }
            Err(_) => {
                error!("Notifying group {} timed out", group_id);
                false
            }
        }
    }

    /// Read-only view of an open poll and its current standings.
    pub async fn session_snapshot(&self, key: &SessionKey) -> ScheduleResult<SessionSnapshot> {
        let session = self
            .sessions
            .get(key)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("No open poll for {}", key)))?;

        let tally = VoteTally::from_session(&session);
        let ballots_cast = tally.total();
        let leading_index = if ballots_cast > 0 { tally.winner() } else { None };

        Ok(SessionSnapshot {
            id: session.id,
            key: session.key,
            options: session.options,
            counts: tally.counts,
            ballots_cast,
            leading_index,
            created_at: session.created_at,
        })
    }

    /// Dispatches a button press from a rendered poll on behalf of `user_id`.
    pub async fn handle_action(&self, user_id: &str, action: PollAction) -> ScheduleResult<ActionOutcome> {
        match action {
            PollAction::Vote {
                group_id,
                event_title,
                option_index,
                start,
                end,
            } => {
                let key = SessionKey::new(group_id, event_title);
                let option = PollOption { start, end };
                let ballot = self.process_vote(user_id, &key, option_index, option).await?;
                Ok(ActionOutcome::Voted { key, option, ballot })
            }
            PollAction::CloseVote {
                group_id,
                event_title,
            } => {
                let key = SessionKey::new(group_id, event_title);
                let report = self.close_voting(&key).await?;
                Ok(ActionOutcome::Closed { report })
            }
        }
    }
}
