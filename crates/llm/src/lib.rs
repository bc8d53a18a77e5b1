//! ReqTrace LLM
//!
//! Provides the chat-model abstraction and the LLM-backed analysis flows:
//! - requirements summarization
//! - flowchart generation with the bounded generate-validate-refine loop
//! - test-case generation
//! - compliance-standards mapping
//!
//! Ships one concrete provider (`OpenAiCompatModel`, any OpenAI-compatible
//! chat-completions endpoint) plus an in-memory scripted model for tests.

pub mod flows;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod testing;
pub mod types;

// Re-export main types
pub use flows::{
    generate_interactive_flowchart, generate_test_cases, map_test_cases_to_standards,
    summarize_requirements, MAX_ATTEMPTS,
};
pub use http_client::build_http_client;
pub use openai::OpenAiCompatModel;
pub use provider::ChatModel;
pub use types::{ChatMessage, LlmError, LlmResult, ProviderConfig};
