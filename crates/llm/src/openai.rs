//! OpenAI-Compatible Provider
//!
//! Implementation of the ChatModel trait against any chat-completions
//! endpoint speaking the OpenAI wire format (OpenAI itself, or a
//! self-hosted gateway configured via `base_url`).

use async_trait::async_trait;
use reqtrace_core::protocol::ChatRole;
use serde::Deserialize;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, ChatModel};
use super::types::{ChatMessage, LlmError, LlmResult, ProviderConfig};

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat-completions provider
pub struct OpenAiCompatModel {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false,
        });

        let mut wire_messages: Vec<serde_json::Value> = Vec::new();
        if let Some(sys) = system {
            wire_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        for msg in messages {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::System => "system",
            };
            wire_messages.push(serde_json::json!({
                "role": role,
                "content": msg.content
            }));
        }
        body["messages"] = serde_json::json!(wire_messages);

        body
    }

    async fn send(&self, body: serde_json::Value) -> LlmResult<CompletionResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse response: {}", e),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        system: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> LlmResult<String> {
        let body = self.build_request_body(&messages, system.as_deref());
        let response = self.send(body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn health_check(&self) -> LlmResult<()> {
        // A one-token completion doubles as key and endpoint validation.
        let mut body = self.build_request_body(&[ChatMessage::user("ping")], None);
        body["max_tokens"] = serde_json::json!(1);
        self.send(body).await.map(|_| ())
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
