use slotpoll_core::{models::voting::SessionKey, services::SessionLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process registry of one mutex per session key.
///
/// Entries nobody holds or waits on are pruned on the next acquisition, so
/// the map only grows with the number of keys in use at the same time.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &SessionKey) -> SessionLock {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };

        SessionLock::new(lock.lock_owned().await)
    }

    pub async fn tracked_keys(&self) -> usize {
        self.locks.lock().await.len()
    }
}
