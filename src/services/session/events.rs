//! Session Events & Commands
//!
//! The channel vocabulary between the session client actor, the adapter,
//! and the consumer. Using explicit event/command enums (rather than
//! registered callbacks) makes dispatch ordering visible and testable.

use reqtrace_core::protocol::{ConnectPayload, ErrorPayload, ProgressPayload, ResultsPayload};

/// Outbound actions a precondition failure can reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    StartAnalysis,
    AnswerQuestion,
}

impl std::fmt::Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionAction::StartAnalysis => write!(f, "start_analysis"),
            SessionAction::AnswerQuestion => write!(f, "answer_question"),
        }
    }
}

/// Why an outbound action was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No transport is open
    NotConnected,
    /// Transport is open but the server has not assigned a session id yet
    NoSession,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NotConnected => write!(f, "not connected"),
            RejectReason::NoSession => write!(f, "no session established"),
        }
    }
}

/// Events raised by the session client, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transport opened and the CONNECT frame went out
    Opened {
        /// True when a cached session id was presented for resumption
        resuming: bool,
    },
    /// Server acknowledged the connection; full payload attached
    ConnectAck(ConnectPayload),
    /// Latest progress snapshot
    Progress(ProgressPayload),
    /// The server asked a clarifying question
    Question { value: String },
    /// Terminal results for the run
    Results(ResultsPayload),
    /// Server-reported error; connection state is unaffected
    ServerError(ErrorPayload),
    /// Transport closed (either side)
    Closed {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// An outbound action was dropped because its preconditions failed
    Rejected {
        action: SessionAction,
        reason: RejectReason,
    },
    /// The automatic reconnect budget is spent; a manual `Connect` re-arms
    ReconnectsExhausted { attempts: u32 },
}

/// Commands accepted by the session client actor.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Open a transport if none is open or pending; no-op otherwise
    Connect,
    /// Request analysis of the given requirements text
    StartAnalysis {
        requirement: String,
        run_id: Option<u64>,
    },
    /// Answer the pending clarifying question
    AnswerQuestion { response: String },
    /// Close the connection and suppress automatic reconnects
    Disconnect { reason: Option<String> },
}
