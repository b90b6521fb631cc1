//! Event dispatcher: maps one inbound event to at most one reply.
//!
//! [`plan`] is the pure mapping; [`Dispatcher`] carries it out against the platform
//! client and the user store. Nothing is cached between events, so any number of
//! dispatches may run concurrently for the same request.

use crate::channels::{
    DeliveryError, EventKind, InboundEvent, MessageContent, OutboundReply, PlatformClient, UserId,
    WebhookEvent,
};
use crate::store::UserStore;
use serde::Serialize;
use std::sync::Arc;

/// Reply sent to a user who follows (or re-follows) the bot.
pub const WELCOME_TEXT: &str =
    "Thanks for adding me as a friend! Send me a text message and I will echo it back.";

/// Reply text for a received text message; includes the text verbatim.
pub fn echo_text(text: &str) -> String {
    format!("you said: {}", text)
}

/// What to do for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Record the user as reachable, then send the welcome reply if the event carries a token.
    Welcome {
        user_id: UserId,
        reply: Option<OutboundReply>,
    },
    Echo(OutboundReply),
    /// Record the user as unreachable. No reply is possible.
    Unfollowed { user_id: UserId },
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoUserId,
    NonTextMessage,
    MissingReplyToken,
    Unhandled,
    /// Entry did not decode as an event.
    Malformed,
}

/// Decide the action for an event. Events without `source.userId` are never actionable.
pub fn plan(event: &InboundEvent) -> Action {
    let Some(user_id) = event.user_id() else {
        return Action::Skip(SkipReason::NoUserId);
    };
    match &event.kind {
        EventKind::Follow => Action::Welcome {
            user_id: user_id.to_string(),
            reply: event.reply_token().map(|token| OutboundReply {
                reply_token: token.to_string(),
                text: WELCOME_TEXT.to_string(),
            }),
        },
        EventKind::Message {
            message: MessageContent::Text { text, .. },
        } => match event.reply_token() {
            Some(token) => Action::Echo(OutboundReply {
                reply_token: token.to_string(),
                text: echo_text(text),
            }),
            None => Action::Skip(SkipReason::MissingReplyToken),
        },
        EventKind::Message {
            message: MessageContent::Other,
        } => Action::Skip(SkipReason::NonTextMessage),
        EventKind::Unfollow => Action::Unfollowed {
            user_id: user_id.to_string(),
        },
        EventKind::Other => Action::Skip(SkipReason::Unhandled),
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    Skipped,
}

/// Per-event entry in the webhook response, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventResult {
    Replied { event: String },
    Skipped { event: String },
    Failed { event: String, error: String },
}

/// Runs [`plan`] against the platform client and user store.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn PlatformClient>,
    store: Arc<dyn UserStore>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn PlatformClient>, store: Arc<dyn UserStore>) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }

    /// Dispatch one event. Only a failed reply call is an error; store failures are logged.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<Outcome, DeliveryError> {
        match plan(event) {
            Action::Welcome { user_id, reply } => {
                log::info!("follow: user {} is now reachable", user_id);
                if let Err(e) = self.store.put(&user_id).await {
                    log::warn!("user store put failed for {}: {}", user_id, e);
                }
                let Some(reply) = reply else {
                    log::debug!("follow from {} has no reply token, not replying", user_id);
                    return Ok(Outcome::Skipped);
                };
                self.client.reply(&reply).await?;
                Ok(Outcome::Replied)
            }
            Action::Echo(reply) => {
                self.client.reply(&reply).await?;
                Ok(Outcome::Replied)
            }
            Action::Unfollowed { user_id } => {
                log::info!("unfollow: user {} is no longer reachable by push", user_id);
                if let Err(e) = self.store.delete(&user_id).await {
                    log::warn!("user store delete failed for {}: {}", user_id, e);
                }
                Ok(Outcome::Skipped)
            }
            Action::Skip(reason) => {
                log::debug!("skipping {} event: {:?}", event.type_name(), reason);
                Ok(Outcome::Skipped)
            }
        }
    }

    /// Settle one entry of a webhook batch. Undecodable entries are skipped without any call.
    pub async fn settle_entry(&self, entry: &WebhookEvent) -> EventResult {
        match entry {
            WebhookEvent::Parsed(event) => self.settle(event).await,
            WebhookEvent::Malformed { event_type, reason } => {
                log::debug!(
                    "skipping event: {:?} ({})",
                    SkipReason::Malformed,
                    reason
                );
                EventResult::Skipped {
                    event: event_type.clone().unwrap_or_else(|| "unknown".to_string()),
                }
            }
        }
    }

    /// Dispatch and fold any failure into the result, so sibling events are unaffected.
    pub async fn settle(&self, event: &InboundEvent) -> EventResult {
        let name = event.type_name().to_string();
        match self.dispatch(event).await {
            Ok(Outcome::Replied) => EventResult::Replied { event: name },
            Ok(Outcome::Skipped) => EventResult::Skipped { event: name },
            Err(e) => {
                log::warn!("{} event delivery failed: {}", name, e);
                EventResult::Failed {
                    event: name,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::OutboundPush;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        replies: Mutex<Vec<OutboundReply>>,
        fail: bool,
    }

    #[async_trait]
    impl PlatformClient for RecordingClient {
        async fn reply(&self, reply: &OutboundReply) -> Result<(), DeliveryError> {
            self.replies.lock().unwrap().push(reply.clone());
            if self.fail {
                return Err(DeliveryError::Api {
                    status: 400,
                    message: "Invalid reply token".to_string(),
                });
            }
            Ok(())
        }

        async fn push(&self, _push: &OutboundPush) -> Result<(), DeliveryError> {
            panic!("dispatcher never pushes");
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        ops: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl UserStore for RecordingStore {
        async fn put(&self, user_id: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(("put".into(), user_id.into()));
            Ok(())
        }

        async fn delete(&self, user_id: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(("delete".into(), user_id.into()));
            anyhow::bail!("store offline")
        }
    }

    fn event(json: &str) -> InboundEvent {
        serde_json::from_str(json).unwrap()
    }

    fn setup(fail: bool) -> (Dispatcher, Arc<RecordingClient>, Arc<RecordingStore>) {
        let client = Arc::new(RecordingClient {
            fail,
            ..Default::default()
        });
        let store = Arc::new(RecordingStore::default());
        (Dispatcher::new(client.clone(), store.clone()), client, store)
    }

    #[test]
    fn plan_without_user_id_skips() {
        for json in [
            r#"{"type":"follow","replyToken":"r"}"#,
            r#"{"type":"message","replyToken":"r","source":{"type":"group","groupId":"G"},"message":{"type":"text","text":"x"}}"#,
            r#"{"type":"unfollow","source":{}}"#,
        ] {
            assert_eq!(plan(&event(json)), Action::Skip(SkipReason::NoUserId));
        }
    }

    #[test]
    fn plan_text_echoes_verbatim() {
        let ev = event(
            r#"{"type":"message","replyToken":"r1","source":{"userId":"U1"},"message":{"type":"text","text":"  héllo {x} "}}"#,
        );
        assert_eq!(
            plan(&ev),
            Action::Echo(OutboundReply {
                reply_token: "r1".to_string(),
                text: "you said:   héllo {x} ".to_string(),
            })
        );
    }

    #[test]
    fn plan_other_types_skip() {
        let sticker = event(
            r#"{"type":"message","replyToken":"r","source":{"userId":"U1"},"message":{"type":"sticker"}}"#,
        );
        assert_eq!(plan(&sticker), Action::Skip(SkipReason::NonTextMessage));
        let postback = event(r#"{"type":"postback","replyToken":"r","source":{"userId":"U1"}}"#);
        assert_eq!(plan(&postback), Action::Skip(SkipReason::Unhandled));
        let no_token = event(
            r#"{"type":"message","source":{"userId":"U1"},"message":{"type":"text","text":"x"}}"#,
        );
        assert_eq!(plan(&no_token), Action::Skip(SkipReason::MissingReplyToken));
    }

    #[tokio::test]
    async fn follow_replies_once_with_welcome() {
        let (d, client, store) = setup(false);
        let ev = event(r#"{"type":"follow","replyToken":"r1","source":{"userId":"U1"}}"#);
        assert_eq!(d.dispatch(&ev).await.unwrap(), Outcome::Replied);
        let replies = client.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_token, "r1");
        assert_eq!(replies[0].text, WELCOME_TEXT);
        assert_eq!(*store.ops.lock().unwrap(), vec![("put".to_string(), "U1".to_string())]);
    }

    #[tokio::test]
    async fn source_less_event_makes_no_calls() {
        let (d, client, store) = setup(false);
        let ev = event(r#"{"type":"message","replyToken":"r","message":{"type":"text","text":"x"}}"#);
        assert_eq!(d.dispatch(&ev).await.unwrap(), Outcome::Skipped);
        assert!(client.replies.lock().unwrap().is_empty());
        assert!(store.ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unfollow_never_replies_and_store_error_is_swallowed() {
        let (d, client, store) = setup(false);
        let ev = event(r#"{"type":"unfollow","source":{"userId":"U9"}}"#);
        assert_eq!(d.dispatch(&ev).await.unwrap(), Outcome::Skipped);
        assert!(client.replies.lock().unwrap().is_empty());
        assert_eq!(
            *store.ops.lock().unwrap(),
            vec![("delete".to_string(), "U9".to_string())]
        );
    }

    #[tokio::test]
    async fn non_text_message_makes_no_calls() {
        let (d, client, _) = setup(false);
        let ev = event(
            r#"{"type":"message","replyToken":"r","source":{"userId":"U1"},"message":{"type":"image","id":"1"}}"#,
        );
        assert_eq!(d.dispatch(&ev).await.unwrap(), Outcome::Skipped);
        assert!(client.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_reply_is_error_and_settles_as_failed() {
        let (d, client, _) = setup(true);
        let ev = event(
            r#"{"type":"message","replyToken":"r","source":{"userId":"U1"},"message":{"type":"text","text":"x"}}"#,
        );
        assert!(d.dispatch(&ev).await.is_err());
        match d.settle(&ev).await {
            EventResult::Failed { event, error } => {
                assert_eq!(event, "message");
                assert!(error.contains("Invalid reply token"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(client.replies.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_entry_is_skipped_without_calls() {
        let (d, client, store) = setup(false);
        let entry: WebhookEvent = serde_json::from_str(
            r#"{"type":"message","replyToken":"r","source":{"userId":"U1"},"message":{"type":"text"}}"#,
        )
        .unwrap();
        assert_eq!(
            d.settle_entry(&entry).await,
            EventResult::Skipped {
                event: "message".to_string()
            }
        );
        let untyped: WebhookEvent = serde_json::from_str(r#"{"replyToken":"r"}"#).unwrap();
        assert_eq!(
            d.settle_entry(&untyped).await,
            EventResult::Skipped {
                event: "unknown".to_string()
            }
        );
        assert!(client.replies.lock().unwrap().is_empty());
        assert!(store.ops.lock().unwrap().is_empty());
    }

    #[test]
    fn event_result_json_shape() {
        let ok = serde_json::to_value(EventResult::Replied {
            event: "follow".to_string(),
        })
        .unwrap();
        assert_eq!(ok, serde_json::json!({"status": "replied", "event": "follow"}));
        let failed = serde_json::to_value(EventResult::Failed {
            event: "message".to_string(),
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["error"], "boom");
    }
}
