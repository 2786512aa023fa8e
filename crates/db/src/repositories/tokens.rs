use crate::models::DbUserTokens;
use chrono::Utc;
use eyre::{Result, WrapErr};
use slotpoll_core::models::calendar::UserTokens;
use sqlx::{Pool, Postgres};

pub async fn get_user_tokens(pool: &Pool<Postgres>, user_id: &str) -> Result<Option<UserTokens>> {
    let row = sqlx::query_as::<_, DbUserTokens>(
        r#"
        SELECT user_id, access_token, refresh_token, token_uri, client_id, client_secret, scopes, updated_at
        FROM user_tokens
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> Result<UserTokens> {
        let scopes = match row.scopes.as_deref() {
            Some(raw) if !raw.is_empty() => {
                serde_json::from_str(raw).wrap_err("Stored scopes are not a JSON array")?
            }
            _ => Vec::new(),
        };

        Ok(UserTokens {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_uri: row.token_uri,
            client_id: row.client_id,
            client_secret: row.client_secret,
            scopes,
        })
    })
    .transpose()
}

pub async fn save_user_tokens(pool: &Pool<Postgres>, user_id: &str, tokens: &UserTokens) -> Result<()> {
    let scopes = serde_json::to_string(&tokens.scopes)?;

    sqlx::query(
        r#"
        INSERT INTO user_tokens (
            user_id, access_token, refresh_token, token_uri,
            client_id, client_secret, scopes, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            token_uri = EXCLUDED.token_uri,
            client_id = EXCLUDED.client_id,
            client_secret = EXCLUDED.client_secret,
            scopes = EXCLUDED.scopes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(&tokens.token_uri)
    .bind(&tokens.client_id)
    .bind(&tokens.client_secret)
    .bind(scopes)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
