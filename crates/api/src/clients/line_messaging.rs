use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Serialize;
use slotpoll_core::services::GroupNotifier;

/// Pushes plain text messages to LINE group chats.
pub struct LineGroupNotifier {
    http: Client,
    base_url: String,
    channel_token: String,
}

impl LineGroupNotifier {
    pub fn new(http: Client, base_url: impl Into<String>, channel_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            channel_token: channel_token.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[async_trait]
impl GroupNotifier for LineGroupNotifier {
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<()> {
        let body = PushRequest {
            to: group_id,
            messages: [TextMessage { kind: "text", text }],
        };

        let response = self
            .http
            .post(format!("{}/message/push", self.base_url))
            .bearer_auth(&self.channel_token)
            .json(&body)
            .send()
            .await
            .wrap_err("Group push request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(eyre!("Messaging API error ({}): {}", status, error_text));
        }

        Ok(())
    }
}
