use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Calendar credentials per chat user
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_tokens (
            user_id VARCHAR(255) PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT NULL,
            token_uri TEXT NULL,
            client_id TEXT NULL,
            client_secret TEXT NULL,
            scopes TEXT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Open polls, one per (group, title)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voting_sessions (
            group_id VARCHAR(255) NOT NULL,
            event_title TEXT NOT NULL,
            id UUID NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (group_id, event_title)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS poll_options (
            group_id VARCHAR(255) NOT NULL,
            event_title TEXT NOT NULL,
            option_index INTEGER NOT NULL,
            start_time TIMESTAMP WITH TIME ZONE NOT NULL,
            end_time TIMESTAMP WITH TIME ZONE NOT NULL,
            PRIMARY KEY (group_id, event_title, option_index),
            FOREIGN KEY (group_id, event_title)
                REFERENCES voting_sessions(group_id, event_title) ON DELETE CASCADE,
            CONSTRAINT valid_option_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ballots (
            group_id VARCHAR(255) NOT NULL,
            event_title TEXT NOT NULL,
            user_id VARCHAR(255) NOT NULL,
            option_index INTEGER NOT NULL,
            cast_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (group_id, event_title, user_id),
            FOREIGN KEY (group_id, event_title)
                REFERENCES voting_sessions(group_id, event_title) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_voting_sessions_group_id ON voting_sessions(group_id);
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
