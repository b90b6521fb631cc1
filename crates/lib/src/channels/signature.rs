//! Webhook authentication and parsing: `x-line-signature` is base64(HMAC-SHA256(channel secret, raw body)).
//!
//! The signature is always checked against the raw bytes before the body is parsed.

use crate::channels::events::WebhookPayload;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Failure to authenticate or parse an inbound webhook request.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("{0}")]
    SignatureInvalid(String),
    #[error("{0}")]
    PayloadMalformed(String),
}

fn mac_over(secret: &str, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac
}

/// Signature the platform would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    STANDARD.encode(mac_over(secret, body).finalize().into_bytes())
}

/// Constant-time check of a base64 signature against `body`.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(provided) = STANDARD.decode(signature.trim().as_bytes()) else {
        return false;
    };
    mac_over(secret, body).verify_slice(&provided).is_ok()
}

/// Authenticate then parse a webhook body into its event list.
pub fn parse_webhook(
    secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<WebhookPayload, WebhookError> {
    let signature = signature
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| WebhookError::SignatureInvalid("no signature".to_string()))?;
    if !verify(secret, body, signature) {
        return Err(WebhookError::SignatureInvalid(
            "signature validation failed".to_string(),
        ));
    }
    serde_json::from_slice(body).map_err(|e| WebhookError::PayloadMalformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";

    #[test]
    fn sign_and_verify() {
        let body = br#"{"events":[]}"#;
        let sig = sign(SECRET, body);
        assert!(verify(SECRET, body, &sig));
        assert!(!verify("other-secret", body, &sig));
        assert!(!verify(SECRET, br#"{"events":[{}]}"#, &sig));
        assert!(!verify(SECRET, body, "not base64 !!"));
    }

    #[test]
    fn missing_signature_is_rejected() {
        let err = parse_webhook(SECRET, None, br#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureInvalid(ref m) if m == "no signature"));
        let err = parse_webhook(SECRET, Some("  "), br#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureInvalid(_)));
    }

    #[test]
    fn wrong_signature_is_rejected_before_parsing() {
        let body = b"not json at all";
        let sig = sign("other-secret", body);
        let err = parse_webhook(SECRET, Some(&sig), body).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureInvalid(_)));
    }

    #[test]
    fn signed_garbage_is_malformed() {
        let body = b"{\"events\": nope";
        let sig = sign(SECRET, body);
        let err = parse_webhook(SECRET, Some(&sig), body).unwrap_err();
        assert!(matches!(err, WebhookError::PayloadMalformed(_)));

        let body = br#"{"destination":"U0"}"#;
        let sig = sign(SECRET, body);
        let err = parse_webhook(SECRET, Some(&sig), body).unwrap_err();
        assert!(matches!(err, WebhookError::PayloadMalformed(_)));
    }

    #[test]
    fn signed_payload_parses() {
        let body = br#"{"destination":"U0","events":[{"type":"follow","replyToken":"r","source":{"userId":"U1"}}]}"#;
        let sig = sign(SECRET, body);
        let payload = parse_webhook(SECRET, Some(&sig), body).unwrap();
        assert_eq!(payload.events.len(), 1);
        assert_eq!(
            payload.events[0].parsed().and_then(|e| e.user_id()),
            Some("U1")
        );
    }

    #[test]
    fn one_bad_event_does_not_reject_the_batch() {
        let body = br#"{"events":[
            {"type":"follow","replyToken":"r1","source":{"userId":"U1"}},
            {"type":"message","replyToken":"r2","source":{"userId":"U2"}},
            {"type":"follow","replyToken":"r3","source":{"userId":"U3"}}
        ]}"#;
        let sig = sign(SECRET, body);
        let payload = parse_webhook(SECRET, Some(&sig), body).unwrap();
        assert_eq!(payload.events.len(), 3);
        assert!(payload.events[0].parsed().is_some());
        assert!(payload.events[1].parsed().is_none());
        assert!(payload.events[2].parsed().is_some());
    }
}
