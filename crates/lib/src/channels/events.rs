//! LINE webhook payload and outbound message types.

use serde::{Deserialize, Serialize};

/// Opaque LINE user id (e.g. "U4af4980629...").
pub type UserId = String;

/// Webhook POST body: `{ "destination", "events": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<WebhookEvent>,
}

/// One entry of `events`. An entry that does not decode as an [`InboundEvent`] is kept
/// as `Malformed` so the rest of the batch is still dispatched.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Parsed(InboundEvent),
    Malformed {
        /// `type` of the raw entry, when it has a string one.
        event_type: Option<String>,
        reason: String,
    },
}

impl<'de> Deserialize<'de> for WebhookEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let event_type = raw
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        Ok(match serde_json::from_value::<InboundEvent>(raw) {
            Ok(event) => WebhookEvent::Parsed(event),
            Err(e) => WebhookEvent::Malformed {
                event_type,
                reason: e.to_string(),
            },
        })
    }
}

impl WebhookEvent {
    pub fn parsed(&self) -> Option<&InboundEvent> {
        match self {
            WebhookEvent::Parsed(event) => Some(event),
            WebhookEvent::Malformed { .. } => None,
        }
    }
}

/// One webhook event. Common fields live here; the `type`-specific part is in `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub source: Option<EventSource>,
    /// Present on reply-eligible events; single use and short-lived.
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Unix ms.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event discriminant. Types this responder does not act on (postback, join, beacon, ...) decode as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Follow,
    Unfollow,
    Message { message: MessageContent },
    #[serde(other)]
    Other,
}

/// Message body of a `message` event. Only text is modelled; stickers, images, etc. are `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Where the event came from (user, group or room).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type", default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl InboundEvent {
    /// `source.userId` when present and non-empty.
    pub fn user_id(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Reply token when present and non-empty.
    pub fn reply_token(&self) -> Option<&str> {
        self.reply_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Wire name of the event type, for logs and per-event results.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::Message { .. } => "message",
            EventKind::Other => "other",
        }
    }
}

/// Reply to one event via its reply token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundReply {
    pub reply_token: String,
    pub text: String,
}

/// Push to a user at any time (fails if the user blocked the bot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPush {
    pub target_user_id: UserId,
    pub text: String,
}
