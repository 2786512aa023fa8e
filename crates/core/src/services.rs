//! Collaborator contracts.
//!
//! The scheduler only talks to calendars, group chats and storage through
//! these traits so that each can be swapped for a mock in tests or for a
//! different backend in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::models::{
    calendar::{CalendarEvent, NewCalendarEvent, UserTokens},
    voting::{SessionKey, VotingSession},
};

/// Read and write access to users' calendars.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Events overlapping `[start, end)` on the user's primary calendar.
    async fn get_events(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> eyre::Result<Vec<CalendarEvent>>;

    /// Creates an event and returns its provider id.
    async fn create_event(&self, user_id: &str, event: &NewCalendarEvent) -> eyre::Result<String>;
}

/// Outbound messages to a whole group chat.
#[async_trait]
pub trait GroupNotifier: Send + Sync {
    async fn send_group_message(&self, group_id: &str, text: &str) -> eyre::Result<()>;
}

/// Exclusive access to one session key.
///
/// Held for the whole read-modify-write of a ballot or a close; dropping it
/// releases the key.
pub struct SessionLock {
    _guard: OwnedMutexGuard<()>,
}

impl SessionLock {
    pub fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

/// Owner of every open voting session.
///
/// Callers must hold the [`SessionLock`] for a key across `get`, `upsert`
/// and `delete` of that key; keys are independent of each other.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn lock(&self, key: &SessionKey) -> eyre::Result<SessionLock>;

    async fn get(&self, key: &SessionKey) -> eyre::Result<Option<VotingSession>>;

    async fn upsert(&self, session: &VotingSession) -> eyre::Result<()>;

    /// Returns whether a session was actually removed.
    async fn delete(&self, key: &SessionKey) -> eyre::Result<bool>;
}

/// Per-user calendar credentials.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(&self, user_id: &str) -> eyre::Result<Option<UserTokens>>;

    async fn save_tokens(&self, user_id: &str, tokens: &UserTokens) -> eyre::Result<()>;
}
