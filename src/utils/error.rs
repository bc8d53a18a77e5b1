//! Error Handling
//!
//! Unified error types for the application layer.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Errors bubbled up from the core crate (protocol, parsing)
    #[error(transparent)]
    Core(#[from] reqtrace_core::CoreError),

    /// Errors bubbled up from LLM providers and flows
    #[error(transparent)]
    Llm(#[from] reqtrace_llm::LlmError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// WebSocket transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session client task is gone and cannot take commands
    #[error("Channel error: {0}")]
    Channel(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
