//! ReqTrace - Analysis Client Library
//!
//! Application layer of the requirements-to-test-case pipeline:
//! - WebSocket session client and adapter for interactive analysis runs
//! - Request/response analysis actions composing the LLM flows
//! - Environment-sourced configuration

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use config::{AppConfig, WsConfig};
pub use models::session::{SessionView, StartOutcome};
pub use services::analysis::{generate_tests, generate_understanding, Understanding};
pub use services::session::{
    AnalysisSession, RejectReason, SessionAction, SessionClient, SessionEvent, SessionHandle,
};
pub use utils::error::{AppError, AppResult};
