use async_trait::async_trait;
use eyre::Result;
use slotpoll_core::{
    models::{
        calendar::UserTokens,
        voting::{SessionKey, VotingSession},
    },
    services::{SessionLock, SessionStore, TokenStore},
};

use crate::{locks::KeyedLocks, repositories, DbPool};

/// Session store that survives restarts.
///
/// Key locking is in-process, so a single scheduler instance is expected to
/// own the tables.
pub struct PgSessionStore {
    pool: DbPool,
    locks: KeyedLocks,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            locks: KeyedLocks::new(),
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn lock(&self, key: &SessionKey) -> Result<SessionLock> {
        Ok(self.locks.acquire(key).await)
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<VotingSession>> {
        repositories::voting::get_session(&self.pool, key).await
    }

    async fn upsert(&self, session: &VotingSession) -> Result<()> {
        repositories::voting::upsert_session(&self.pool, session).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        repositories::voting::delete_session(&self.pool, key).await
    }
}

pub struct PgTokenStore {
    pool: DbPool,
}

impl PgTokenStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get_tokens(&self, user_id: &str) -> Result<Option<UserTokens>> {
        repositories::tokens::get_user_tokens(&self.pool, user_id).await
    }

    async fn save_tokens(&self, user_id: &str, tokens: &UserTokens) -> Result<()> {
        repositories::tokens::save_user_tokens(&self.pool, user_id, tokens).await
    }
}
