//! Chat Model Trait
//!
//! Defines the common interface for all chat-completion providers consumed
//! by the analysis flows.

use async_trait::async_trait;

use super::types::{ChatMessage, LlmError, LlmResult};

/// Trait that all chat-completion providers must implement.
///
/// The analysis flows only ever need a full (non-streaming) completion, so
/// the surface is deliberately small: one `complete` call plus a health
/// probe.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send a conversation and get the complete assistant reply.
    ///
    /// # Arguments
    /// * `system` - Optional system prompt
    /// * `messages` - Conversation messages, oldest first
    async fn complete(
        &self,
        system: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> LlmResult<String>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers, this validates the API key and endpoint.
    async fn health_check(&self) -> LlmResult<()>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
