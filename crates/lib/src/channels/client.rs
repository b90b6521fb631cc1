//! LINE Messaging API client: reply and push text messages.

use crate::channels::events::{OutboundPush, OutboundReply};
use async_trait::async_trait;
use serde::Deserialize;

/// Outbound delivery failed. Never retried here; a reply token is gone once this happens.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("line request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("line api error: {status} {message}")]
    Api { status: u16, message: String },
}

/// Something that can deliver replies and pushes to the platform. Shared across concurrent dispatches.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Reply to an event with its reply token.
    async fn reply(&self, reply: &OutboundReply) -> Result<(), DeliveryError>;
    /// Push a message to a user.
    async fn push(&self, push: &OutboundPush) -> Result<(), DeliveryError>;
}

/// Error body returned by the API on non-2xx (`{"message": "...", "details": [...]}`).
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the LINE Messaging API authenticated with a channel access token.
#[derive(Clone)]
pub struct LineClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn text_messages(text: &str) -> serde_json::Value {
        serde_json::json!([{ "type": "text", "text": text }])
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), DeliveryError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let raw = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(raw);
            return Err(DeliveryError::Api { status, message });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for LineClient {
    /// POST /v2/bot/message/reply
    async fn reply(&self, reply: &OutboundReply) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "replyToken": reply.reply_token,
            "messages": Self::text_messages(&reply.text),
        });
        self.post("/v2/bot/message/reply", body).await
    }

    /// POST /v2/bot/message/push
    async fn push(&self, push: &OutboundPush) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "to": push.target_user_id,
            "messages": Self::text_messages(&push.text),
        });
        self.post("/v2/bot/message/push", body).await
    }
}
