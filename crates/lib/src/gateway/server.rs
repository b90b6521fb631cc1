//! Gateway HTTP server: LINE webhook receiver, push trigger, and health probe.

use crate::channels::signature::{self, SIGNATURE_HEADER};
use crate::channels::{LineClient, OutboundPush, WebhookPayload};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::gateway::error::ApiError;
use crate::gateway::protocol::{SendMessageRequest, SendMessageResponse};
use crate::store::LogOnlyStore;
use anyhow::{Context, Result};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Port reported by the health probe.
    pub port: u16,
    /// Channel secret for `x-line-signature` verification.
    pub channel_secret: Arc<str>,
    pub dispatcher: Dispatcher,
}

impl GatewayState {
    pub fn new(port: u16, channel_secret: impl Into<Arc<str>>, dispatcher: Dispatcher) -> Self {
        Self {
            port,
            channel_secret: channel_secret.into(),
            dispatcher,
        }
    }
}

/// Authenticated, parsed webhook body. Rejects with 401/400 (or 500 if the body cannot be read)
/// before any handler code runs.
pub struct LineWebhook(pub WebhookPayload);

#[async_trait]
impl FromRequest<GatewayState> for LineWebhook {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &GatewayState) -> Result<Self, Self::Rejection> {
        let provided = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // Failing to read the body (client reset, size limit) is not a parse error.
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| {
                ApiError::Unknown(anyhow::anyhow!("reading webhook body: {}", e.body_text()))
            })?;
        let payload = signature::parse_webhook(&state.channel_secret, provided.as_deref(), &body)?;
        Ok(Self(payload))
    }
}

/// Build the gateway router. Exposed so tests can serve it with their own client and store.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(webhook))
        .route("/send-message", post(send_message))
        .with_state(state)
}

/// Run the gateway; binds to config.server.bind and the resolved port (`port_override`, then PORT, then config).
/// Refuses to start without a channel secret and access token. Blocks until SIGINT/SIGTERM.
pub async fn run_gateway(config: Config, port_override: Option<u16>) -> Result<()> {
    let secret = config::resolve_channel_secret(&config).context(
        "channel secret not configured (set LINE_CHANNEL_SECRET or line.channelSecret)",
    )?;
    let token = config::resolve_channel_access_token(&config).context(
        "channel access token not configured (set LINE_CHANNEL_ACCESS_TOKEN or line.channelAccessToken)",
    )?;
    let port = port_override.unwrap_or_else(|| config::resolve_port(&config));
    let api_base = config::resolve_api_base_url(&config);
    log::debug!("line api base: {}", api_base);

    let client = Arc::new(LineClient::new(api_base, token));
    let dispatcher = Dispatcher::new(client, Arc::new(LogOnlyStore));
    let app = router(GatewayState::new(port, secret, dispatcher));

    let bind_addr = format!("{}:{}", config.server.bind.trim(), port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /webhook: dispatch every event concurrently and wait for all of them to settle.
async fn webhook(
    State(state): State<GatewayState>,
    LineWebhook(payload): LineWebhook,
) -> Response {
    log::info!("webhook: received {} event(s)", payload.events.len());
    let fan_out = join_all(
        payload
            .events
            .iter()
            .map(|entry| state.dispatcher.settle_entry(entry)),
    );
    match AssertUnwindSafe(fan_out).catch_unwind().await {
        Ok(results) => Json(results).into_response(),
        Err(_) => {
            log::error!("webhook: event fan-out panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /send-message: push `messageText` to `targetUserId`. Operator/test entry point.
async fn send_message(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let req: SendMessageRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let Some((target, text)) = req.required_fields() else {
        return Err(ApiError::MissingField(
            "targetUserId and messageText are required".to_string(),
        ));
    };
    let push = OutboundPush {
        target_user_id: target.to_string(),
        text: text.to_string(),
    };
    state.dispatcher.client().push(&push).await?;
    log::info!("pushed message to {}", push.target_user_id);
    Ok(Json(SendMessageResponse::sent()))
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
