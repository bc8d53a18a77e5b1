//! Session Adapter
//!
//! Bridges the session client's event stream into consumer-readable state
//! and handles the race between "consumer wants to start analysis" and
//! "session handshake not yet complete" with a one-slot pending buffer.
//!
//! The adapter is the sole mutator of its view; events are applied in
//! arrival order on whatever task polls `next_event`, so the latest
//! progress/results always win without locking.

use tokio::sync::mpsc;
use tracing::debug;

use reqtrace_core::protocol::ProgressPayload;

use super::client::{SessionClient, SessionHandle};
use super::events::{RejectReason, SessionEvent};
use crate::config::WsConfig;
use crate::models::session::{SessionView, StartOutcome};

/// Consumer-facing wrapper around one analysis session.
pub struct AnalysisSession {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    view: SessionView,
    /// One-slot buffer for a requirement submitted before the handshake
    /// completed; a later submission overwrites an earlier one
    pending_requirement: Option<String>,
    /// Monotonically increasing run id; inbound progress/results/errors
    /// correlated to an older run are dropped
    current_run: u64,
}

impl AnalysisSession {
    /// Spawn a session client against the given endpoint and wrap it.
    pub fn connect(config: WsConfig) -> Self {
        let (handle, events) = SessionClient::spawn(config);
        Self::from_parts(handle, events)
    }

    fn from_parts(
        handle: SessionHandle,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self {
            handle,
            events,
            view: SessionView::default(),
            pending_requirement: None,
            current_run: 0,
        }
    }

    /// Await the next surfaced event, applying it to the view first.
    ///
    /// Events from superseded runs are dropped here and never surface.
    /// Returns `None` once the client has exited and the stream drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let event = self.events.recv().await?;
            if let Some(stale_run) = self.stale_run_id(&event) {
                debug!(
                    stale_run,
                    current_run = self.current_run,
                    "dropping event from superseded run"
                );
                continue;
            }
            self.apply(&event);
            return Some(event);
        }
    }

    /// Start a fresh analysis run.
    ///
    /// Always clears progress/results/error (fresh-run semantics) and bumps
    /// the run id. Forwards immediately over an open, sessioned connection;
    /// otherwise buffers the text until the next connect-acknowledgement.
    pub fn start_analysis(&mut self, requirement: &str) -> StartOutcome {
        self.view.progress = None;
        self.view.results = None;
        self.view.error = None;
        self.current_run += 1;

        if self.view.connected && self.view.session_id.is_some() {
            if self
                .handle
                .start_analysis(requirement.to_string(), Some(self.current_run))
                .is_ok()
            {
                return StartOutcome::Sent {
                    run_id: self.current_run,
                };
            }
        }
        self.pending_requirement = Some(requirement.to_string());
        StartOutcome::Queued
    }

    /// Answer the pending clarifying question. No queuing: a question can
    /// only have arrived over an open, sessioned connection, so a failed
    /// precondition is reported, not buffered.
    pub fn answer_question(&mut self, response: &str) -> Result<(), RejectReason> {
        if !self.view.connected {
            return Err(RejectReason::NotConnected);
        }
        if self.view.session_id.is_none() {
            return Err(RejectReason::NoSession);
        }
        self.handle
            .answer_question(response.to_string())
            .map_err(|_| RejectReason::NotConnected)
    }

    /// Close the connection and suppress automatic reconnects.
    pub fn disconnect(&mut self, reason: Option<&str>) {
        let _ = self.handle.disconnect(reason.map(str::to_string));
    }

    /// Re-open after a user disconnect or reconnect exhaustion.
    pub fn reconnect(&self) {
        let _ = self.handle.connect();
    }

    // ── View accessors ─────────────────────────────────────────────────

    /// The full current view.
    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// True between transport-open and transport-close.
    pub fn connected(&self) -> bool {
        self.view.connected
    }

    /// Server-assigned session identity, once acknowledged.
    pub fn session_id(&self) -> Option<&str> {
        self.view.session_id.as_deref()
    }

    /// Latest progress snapshot for the current run.
    pub fn progress(&self) -> Option<&ProgressPayload> {
        self.view.progress.as_ref()
    }

    /// Latest server-reported error message.
    pub fn error(&self) -> Option<&str> {
        self.view.error.as_deref()
    }

    /// Pending clarifying question text.
    pub fn question(&self) -> Option<&str> {
        self.view.question.as_deref()
    }

    /// Id of the current run (0 before the first `start_analysis`).
    pub fn current_run(&self) -> u64 {
        self.current_run
    }

    // ── Event application ──────────────────────────────────────────────

    /// The event's run id when it belongs to a superseded run.
    ///
    /// Events without a run id are accepted; servers that do not echo the
    /// id cannot be filtered.
    fn stale_run_id(&self, event: &SessionEvent) -> Option<u64> {
        let run_id = match event {
            SessionEvent::Progress(p) => p.run_id,
            SessionEvent::Results(p) => p.run_id,
            SessionEvent::ServerError(p) => p.run_id,
            _ => None,
        };
        run_id.filter(|id| *id != self.current_run)
    }

    fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Opened { .. } => {
                self.view.connected = true;
            }
            SessionEvent::ConnectAck(payload) => {
                if payload.session_id.is_some() {
                    self.view.session_id = payload.session_id.clone();
                }
                // Flush the one-slot buffer exactly once per handshake.
                if let Some(requirement) = self.pending_requirement.take() {
                    let _ = self
                        .handle
                        .start_analysis(requirement, Some(self.current_run));
                }
            }
            SessionEvent::Progress(payload) => {
                self.view.progress = Some(payload.clone());
            }
            SessionEvent::Question { value } => {
                self.view.question = Some(value.clone());
            }
            SessionEvent::Results(payload) => {
                self.view.results = Some(payload.clone());
                // Results clear any pending question unconditionally.
                self.view.question = None;
            }
            SessionEvent::ServerError(payload) => {
                self.view.error = Some(payload.message.clone());
            }
            SessionEvent::Closed { .. } => {
                self.view.connected = false;
            }
            SessionEvent::Rejected { .. } | SessionEvent::ReconnectsExhausted { .. } => {}
        }
    }
}
