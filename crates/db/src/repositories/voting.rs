use crate::models::{DbBallot, DbPollOption, DbVotingSession};
use chrono::Utc;
use eyre::{Result, WrapErr};
use slotpoll_core::models::voting::{PollOption, SessionKey, VotingSession};
use sqlx::{Pool, Postgres};
use std::collections::BTreeMap;

pub async fn get_session(pool: &Pool<Postgres>, key: &SessionKey) -> Result<Option<VotingSession>> {
    tracing::debug!("Loading voting session {}", key);

    let Some(row) = sqlx::query_as::<_, DbVotingSession>(
        r#"
        SELECT group_id, event_title, id, created_at
        FROM voting_sessions
        WHERE group_id = $1 AND event_title = $2
        "#,
    )
    .bind(&key.group_id)
    .bind(&key.event_title)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let options = sqlx::query_as::<_, DbPollOption>(
        r#"
        SELECT option_index, start_time, end_time
        FROM poll_options
        WHERE group_id = $1 AND event_title = $2
        ORDER BY option_index ASC
        "#,
    )
    .bind(&key.group_id)
    .bind(&key.event_title)
    .fetch_all(pool)
    .await?;

    let ballots = sqlx::query_as::<_, DbBallot>(
        r#"
        SELECT user_id, option_index, cast_at
        FROM ballots
        WHERE group_id = $1 AND event_title = $2
        "#,
    )
    .bind(&key.group_id)
    .bind(&key.event_title)
    .fetch_all(pool)
    .await?;

    let ballots = ballots
        .into_iter()
        .map(|b| -> Result<(String, usize)> { Ok((b.user_id, usize::try_from(b.option_index)?)) })
        .collect::<Result<BTreeMap<_, _>>>()
        .wrap_err("Stored ballot has a negative option index")?;

    Ok(Some(VotingSession {
        id: row.id,
        key: SessionKey::new(row.group_id, row.event_title),
        options: options
            .into_iter()
            .map(|o| PollOption {
                start: o.start_time,
                end: o.end_time,
            })
            .collect(),
        ballots,
        created_at: row.created_at,
    }))
}

/// Replaces the stored copy of `session` (options and ballots included) in
/// one transaction.
pub async fn upsert_session(pool: &Pool<Postgres>, session: &VotingSession) -> Result<()> {
    let key = &session.key;
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO voting_sessions (group_id, event_title, id, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (group_id, event_title)
        DO UPDATE SET id = EXCLUDED.id, created_at = EXCLUDED.created_at
        "#,
    )
    .bind(&key.group_id)
    .bind(&key.event_title)
    .bind(session.id)
    .bind(session.created_at)
    .execute(&mut *tx)
    .await?;

    for table in ["poll_options", "ballots"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE group_id = $1 AND event_title = $2",
            table
        ))
        .bind(&key.group_id)
        .bind(&key.event_title)
        .execute(&mut *tx)
        .await?;
    }

    for (index, option) in session.options.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO poll_options (group_id, event_title, option_index, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&key.group_id)
        .bind(&key.event_title)
        .bind(i32::try_from(index)?)
        .bind(option.start)
        .bind(option.end)
        .execute(&mut *tx)
        .await?;
    }

    for (user_id, index) in &session.ballots {
        sqlx::query(
            r#"
            INSERT INTO ballots (group_id, event_title, user_id, option_index, cast_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&key.group_id)
        .bind(&key.event_title)
        .bind(user_id)
        .bind(i32::try_from(*index)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        "Stored voting session {} ({} options, {} ballots)",
        key,
        session.options.len(),
        session.ballots.len()
    );
    Ok(())
}

pub async fn delete_session(pool: &Pool<Postgres>, key: &SessionKey) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM voting_sessions
        WHERE group_id = $1 AND event_title = $2
        "#,
    )
    .bind(&key.group_id)
    .bind(&key.event_title)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
