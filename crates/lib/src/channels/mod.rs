//! LINE channel: webhook event types, signature check, and the outbound API client.
//!
//! Inbound requests are authenticated and parsed here, then handed to the dispatcher.

mod client;
mod events;
pub mod signature;

pub use client::{DeliveryError, LineClient, PlatformClient};
pub use events::{
    EventKind, EventSource, InboundEvent, MessageContent, OutboundPush, OutboundReply, UserId,
    WebhookEvent, WebhookPayload,
};
pub use signature::WebhookError;
