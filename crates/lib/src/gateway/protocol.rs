//! JSON bodies for the `/send-message` trigger and error responses.

use serde::{Deserialize, Serialize};

/// `POST /send-message` body. Fields are optional here so absence is reported as a 400, not a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub message_text: Option<String>,
}

impl SendMessageRequest {
    /// Both fields, when present and non-empty.
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let target = self.target_user_id.as_deref().filter(|s| !s.is_empty())?;
        let text = self.message_text.as_deref().filter(|s| !s.is_empty())?;
        Some((target, text))
    }
}

/// `200 { "success": true, "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,
}

impl SendMessageResponse {
    pub fn sent() -> Self {
        Self {
            success: true,
            message: "Message sent successfully".to_string(),
        }
    }
}

/// `{ "error": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
