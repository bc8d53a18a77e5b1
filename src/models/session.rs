//! Session Models
//!
//! Consumer-facing view of an analysis session, as maintained by the
//! session adapter.

use reqtrace_core::protocol::{ProgressPayload, ResultsPayload};
use serde::{Deserialize, Serialize};

/// The latest known state of an analysis session.
///
/// Every field is "last event wins": each progress update replaces the
/// previous snapshot, a new question replaces a pending one, and results
/// replace earlier results. No history is retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// True between transport-open and transport-close
    pub connected: bool,
    /// Server-assigned session identity, once acknowledged
    pub session_id: Option<String>,
    /// Latest progress snapshot for the current run
    pub progress: Option<ProgressPayload>,
    /// Terminal payload of the current run, if it finished
    pub results: Option<ResultsPayload>,
    /// Latest server-reported error message
    pub error: Option<String>,
    /// Pending clarifying question, if the server asked one
    pub question: Option<String>,
}

/// Outcome of a `start_analysis` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Sent immediately over an open, sessioned connection
    Sent {
        /// Run id stamped on the request; stale responses for other runs
        /// are discarded
        run_id: u64,
    },
    /// Buffered until the session handshake completes; an earlier queued
    /// requirement, if any, was overwritten
    Queued,
}
