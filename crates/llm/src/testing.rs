//! Test Support
//!
//! In-memory `ChatModel` implementations used by unit and integration tests.
//! Kept in the library (not behind `cfg(test)`) so downstream crates can
//! drive the flows without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::provider::ChatModel;
use crate::types::{ChatMessage, LlmError, LlmResult};

/// A model that replays a fixed script of replies and records every prompt
/// it was sent.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Create a scripted model that returns the given replies in order.
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt sent so far (system prompt and messages concatenated).
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-test-model"
    }

    async fn complete(
        &self,
        system: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> LlmResult<String> {
        let mut rendered = String::new();
        if let Some(sys) = system {
            rendered.push_str(&sys);
            rendered.push('\n');
        }
        for msg in &messages {
            rendered.push_str(&msg.content);
            rendered.push('\n');
        }
        self.requests.lock().unwrap().push(rendered);

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::other("scripted model ran out of replies"))
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
