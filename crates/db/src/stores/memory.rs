use async_trait::async_trait;
use eyre::Result;
use slotpoll_core::{
    models::voting::{SessionKey, VotingSession},
    services::{SessionLock, SessionStore},
};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::locks::KeyedLocks;

/// Process-local session store. Open polls are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, VotingSession>>,
    locks: KeyedLocks,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn lock(&self, key: &SessionKey) -> Result<SessionLock> {
        Ok(self.locks.acquire(key).await)
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<VotingSession>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn upsert(&self, session: &VotingSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.key.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool> {
        Ok(self.sessions.write().await.remove(key).is_some())
    }
}
