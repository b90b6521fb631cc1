//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.linebot/config.json`) and environment.
//! Environment variables win over the file so the responder can run from env alone.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default LINE Messaging API base URL.
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// LINE channel credentials and API endpoint.
    #[serde(default)]
    pub line: LineConfig,
}

/// Server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Listen port (default 8080). Overridden by PORT env.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must be able to reach the webhook).
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// LINE channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Long-lived channel access token for reply/push calls. Overridden by LINE_CHANNEL_ACCESS_TOKEN env.
    pub channel_access_token: Option<String>,
    /// Channel secret used to verify `x-line-signature`. Overridden by LINE_CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// API base URL (default https://api.line.me). Overridden by LINE_API_BASE env.
    pub api_base_url: Option<String>,
}

/// Read an env var, trimmed; empty counts as unset.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| non_empty(&s))
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Env value first, then config value (both trimmed, empty ignored).
fn env_or_config(env_value: Option<String>, config_value: Option<&String>) -> Option<String> {
    env_value.or_else(|| config_value.and_then(|s| non_empty(s)))
}

/// Resolve the channel access token: env LINE_CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    env_or_config(
        env_non_empty("LINE_CHANNEL_ACCESS_TOKEN"),
        config.line.channel_access_token.as_ref(),
    )
}

/// Resolve the channel secret: env LINE_CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_or_config(
        env_non_empty("LINE_CHANNEL_SECRET"),
        config.line.channel_secret.as_ref(),
    )
}

/// Resolve the API base URL: env LINE_API_BASE, then config, then the public endpoint.
pub fn resolve_api_base_url(config: &Config) -> String {
    env_or_config(env_non_empty("LINE_API_BASE"), config.line.api_base_url.as_ref())
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_LINE_API_BASE.to_string())
}

fn port_override(env_value: Option<String>, fallback: u16) -> u16 {
    match env_value {
        Some(raw) => match raw.parse::<u16>() {
            Ok(p) => p,
            Err(_) => {
                log::warn!("ignoring invalid PORT value {:?}, using {}", raw, fallback);
                fallback
            }
        },
        None => fallback,
    }
}

/// Resolve the listen port: env PORT overrides config.
pub fn resolve_port(config: &Config) -> u16 {
    port_override(env_non_empty("PORT"), config.server.port)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, LINEBOT_CONFIG_PATH, or the default path. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
