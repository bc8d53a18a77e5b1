//! ReqTrace Core
//!
//! Foundational error types, the analysis wire protocol, and the flowchart
//! data model for the ReqTrace workspace. This crate has zero dependencies on
//! application-level code (transport, LLM providers, etc.).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `protocol` - Tagged JSON wire messages for the analysis session
//! - `flowchart` - Flowchart/test-case data model, sanitizing, validation
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **All wire tolerance rules live in one place** - `protocol` documents and owns them
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod flowchart;
pub mod protocol;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Wire Protocol ──────────────────────────────────────────────────────
pub use protocol::{
    AnalysisStage, AnswerPayload, ChatRole, ChatTurn, ConnectPayload, DisconnectPayload, Envelope,
    ErrorPayload, Message, ProgressPayload, ResultsPayload, StartAnalysisPayload,
};

// ── Flowchart Model & Validation ───────────────────────────────────────
pub use flowchart::{
    sanitize_json, validate_flowchart, FlowchartData, FlowchartEdge, FlowchartNode, TestCase,
    ValidationIssue,
};
