//! Terminal error handling for the HTTP surface.

use crate::channels::{DeliveryError, WebhookError};
use crate::gateway::protocol::ErrorBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Every failure a handler or extractor can surface, mapped to a status in [`IntoResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Webhook failed authentication (401, plain text).
    #[error("{0}")]
    SignatureInvalid(String),
    /// Webhook body is not an event list (400, plain text).
    #[error("{0}")]
    PayloadMalformed(String),
    /// Required request field absent or empty (400, JSON).
    #[error("{0}")]
    MissingField(String),
    /// Request body could not be read as JSON (400, JSON).
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
    /// Platform API call failed (500, JSON). Detail stays in the server log.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// Anything else, e.g. a webhook body that could not be read (500, generic text).
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::SignatureInvalid(m) => ApiError::SignatureInvalid(m),
            WebhookError::PayloadMalformed(m) => ApiError::PayloadMalformed(m),
        }
    }
}

fn json_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SignatureInvalid(m) => {
                log::debug!("rejecting webhook: {}", m);
                (StatusCode::UNAUTHORIZED, m).into_response()
            }
            ApiError::PayloadMalformed(m) => {
                log::debug!("rejecting webhook body: {}", m);
                (StatusCode::BAD_REQUEST, m).into_response()
            }
            ApiError::MissingField(m) => json_error(StatusCode::BAD_REQUEST, m),
            ApiError::InvalidRequest(_) => json_error(StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Delivery(e) => {
                log::error!("delivery failed: {}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to send message")
            }
            ApiError::Unknown(e) => {
                log::error!("unhandled error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
