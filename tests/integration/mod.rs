//! Integration Tests Module
//!
//! End-to-end coverage for the session layer (real WebSocket transport
//! against an in-process server) and the analysis pipeline (scripted
//! model).

// Shared mock-server helpers
mod support;

// Session client: handshake, resume, dispatch, reconnect policy
mod session_client_test;

// Session adapter: view state, start queuing, run-id guard
mod session_adapter_test;

// Analysis actions over a scripted model
mod analysis_flow_test;
