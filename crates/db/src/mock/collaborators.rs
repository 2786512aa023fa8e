use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use slotpoll_core::{
    models::{
        calendar::{CalendarEvent, NewCalendarEvent, UserTokens},
        voting::{SessionKey, VotingSession},
    },
    services::{CalendarClient, GroupNotifier, SessionLock, SessionStore, TokenStore},
};

mock! {
    pub Calendar {}

    #[async_trait]
    impl CalendarClient for Calendar {
        async fn get_events(
            &self,
            user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> eyre::Result<Vec<CalendarEvent>>;

        async fn create_event(
            &self,
            user_id: &str,
            event: &NewCalendarEvent,
        ) -> eyre::Result<String>;
    }
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl GroupNotifier for Notifier {
        async fn send_group_message(&self, group_id: &str, text: &str) -> eyre::Result<()>;
    }
}

mock! {
    pub Sessions {}

    #[async_trait]
    impl SessionStore for Sessions {
        async fn lock(&self, key: &SessionKey) -> eyre::Result<SessionLock>;

        async fn get(&self, key: &SessionKey) -> eyre::Result<Option<VotingSession>>;

        async fn upsert(&self, session: &VotingSession) -> eyre::Result<()>;

        async fn delete(&self, key: &SessionKey) -> eyre::Result<bool>;
    }
}

mock! {
    pub Tokens {}

    #[async_trait]
    impl TokenStore for Tokens {
        async fn get_tokens(&self, user_id: &str) -> eyre::Result<Option<UserTokens>>;

        async fn save_tokens(&self, user_id: &str, tokens: &UserTokens) -> eyre::Result<()>;
    }
}

/// A lock nobody else can contend for, for use in `MockSessions::expect_lock`.
pub fn uncontended_lock() -> SessionLock {
    let mutex = std::sync::Arc::new(tokio::sync::Mutex::new(()));
    match mutex.try_lock_owned() {
        Ok(guard) => SessionLock::new(guard),
        Err(_) => unreachable!("a freshly created mutex is unlocked"),
    }
}
