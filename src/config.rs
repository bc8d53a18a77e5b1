//! Application Configuration
//!
//! Environment-sourced settings for the analysis-server connection and the
//! LLM provider. Invalid values fall back to defaults with a warning;
//! `validate()` catches the ones that cannot be defaulted away.

use reqtrace_llm::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::error::{AppError, AppResult};

/// Analysis-server endpoint, e.g. `ws://localhost:8080`
pub const ENV_WS_URL: &str = "REQTRACE_WS_URL";
/// Cap on automatic reconnect attempts
pub const ENV_WS_MAX_RECONNECT_ATTEMPTS: &str = "REQTRACE_WS_MAX_RECONNECT_ATTEMPTS";
/// Chat-completions endpoint override
pub const ENV_LLM_BASE_URL: &str = "REQTRACE_LLM_BASE_URL";
/// Chat-completions API key
pub const ENV_LLM_API_KEY: &str = "REQTRACE_LLM_API_KEY";
/// Chat-completions model identifier
pub const ENV_LLM_MODEL: &str = "REQTRACE_LLM_MODEL";

const DEFAULT_WS_URL: &str = "ws://localhost:8080";
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Settings for the WebSocket session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsConfig {
    /// Analysis-server endpoint
    pub url: String,
    /// After this many failed reconnects the client stops trying and the
    /// consumer must reconnect manually
    pub max_reconnect_attempts: u32,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl WsConfig {
    /// Load from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let url = std::env::var(ENV_WS_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());

        let max_reconnect_attempts = match std::env::var(ENV_WS_MAX_RECONNECT_ATTEMPTS) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring non-numeric {ENV_WS_MAX_RECONNECT_ATTEMPTS}");
                DEFAULT_MAX_RECONNECT_ATTEMPTS
            }),
            Err(_) => DEFAULT_MAX_RECONNECT_ATTEMPTS,
        };

        Self {
            url,
            max_reconnect_attempts,
        }
    }

    /// Check the endpoint is a ws:// or wss:// URL.
    pub fn validate(&self) -> AppResult<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| AppError::config(format!("invalid {ENV_WS_URL}: {e}")))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(AppError::config(format!(
                "{ENV_WS_URL} must use ws:// or wss://, got {}",
                parsed.scheme()
            )));
        }
        Ok(())
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub ws: WsConfig,
    pub llm: ProviderConfig,
}

impl AppConfig {
    /// Load everything from the environment.
    pub fn from_env() -> Self {
        let mut llm = ProviderConfig::default();
        if let Ok(base_url) = std::env::var(ENV_LLM_BASE_URL) {
            if !base_url.trim().is_empty() {
                llm.base_url = Some(base_url);
            }
        }
        if let Ok(api_key) = std::env::var(ENV_LLM_API_KEY) {
            if !api_key.trim().is_empty() {
                llm.api_key = Some(api_key);
            }
        }
        if let Ok(model) = std::env::var(ENV_LLM_MODEL) {
            if !model.trim().is_empty() {
                llm.model = model;
            }
        }

        Self {
            ws: WsConfig::from_env(),
            llm,
        }
    }

    /// Validate the pieces that have validation rules.
    pub fn validate(&self) -> AppResult<()> {
        self.ws.validate()
    }
}
