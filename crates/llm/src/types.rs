//! LLM Types
//!
//! Shared request/response types and the error taxonomy for LLM providers.

use reqtrace_core::protocol::ChatRole;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by LLM providers and flows.
#[derive(Error, Debug)]
pub enum LlmError {
    /// API key missing or rejected
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Provider rate limit hit
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Seconds to wait, when the provider says so
        retry_after: Option<u64>,
    },

    /// The configured model does not exist on this endpoint
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// The request was malformed or rejected by the provider
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Provider-side failure (5xx)
    #[error("Server error ({status:?}): {message}")]
    ServerError { message: String, status: Option<u16> },

    /// Transport-level failure reaching the provider
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// The provider returned a completion with no usable content
    #[error("Empty response from model")]
    EmptyResponse,

    /// The model's output did not match the expected shape
    #[error("Failed to parse model output: {message}")]
    ParseError { message: String },

    /// Anything else
    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError {
            message: msg.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other {
            message: msg.into(),
        }
    }
}

/// One chat message sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Connection settings for a chat-completions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Endpoint base URL; `None` uses the provider's default
    pub base_url: Option<String>,
    /// API key; most endpoints reject requests without one
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}
