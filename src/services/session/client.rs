//! Analysis Session Client
//!
//! Owns exactly one logical WebSocket connection to the analysis server and
//! presents a typed event interface. All connection state (cached session
//! id, reconnect counter, user-close flag) lives in one per-instance struct
//! driven by a single spawned task; construct one client per active
//! analysis session.
//!
//! Reconnection is automatic with exponential backoff (see `backoff`) and
//! stops after the configured attempt cap; a manual `Connect` command
//! re-arms it. A user-initiated disconnect suppresses reconnection
//! entirely.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use reqtrace_core::protocol::{
    question_text, AnswerPayload, ConnectPayload, DisconnectPayload, Envelope, Message,
    StartAnalysisPayload,
};

use super::backoff::reconnect_delay;
use super::events::{RejectReason, SessionAction, SessionCommand, SessionEvent};
use crate::config::WsConfig;
use crate::utils::error::{AppError, AppResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why one transport's lifetime ended.
enum Driven {
    /// The consumer asked for the close; do not reconnect
    UserClosed,
    /// The transport dropped on its own; reconnect policy applies
    TransportLost,
    /// Every command handle is gone; the actor should exit
    HandleDropped,
}

/// Handle for issuing commands to a running session client.
///
/// Cheap to clone; all clones feed the same actor. Commands fail only when
/// the actor has exited.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Ask the client to open a transport (no-op while one is open or
    /// pending). Also re-arms reconnection after exhaustion or a
    /// user-initiated disconnect.
    pub fn connect(&self) -> AppResult<()> {
        self.send(SessionCommand::Connect)
    }

    /// Request analysis of the given requirements text.
    pub fn start_analysis(&self, requirement: String, run_id: Option<u64>) -> AppResult<()> {
        self.send(SessionCommand::StartAnalysis {
            requirement,
            run_id,
        })
    }

    /// Answer the pending clarifying question.
    pub fn answer_question(&self, response: String) -> AppResult<()> {
        self.send(SessionCommand::AnswerQuestion { response })
    }

    /// Close the connection and suppress automatic reconnects.
    pub fn disconnect(&self, reason: Option<String>) -> AppResult<()> {
        self.send(SessionCommand::Disconnect { reason })
    }

    fn send(&self, command: SessionCommand) -> AppResult<()> {
        self.tx
            .send(command)
            .map_err(|_| AppError::channel("session client has exited"))
    }

    /// Build a handle around a bare channel, for adapter tests that play
    /// the client's role themselves.
    #[cfg(test)]
    pub(crate) fn test_only(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { tx }
    }
}

/// The session client actor.
///
/// Spawned onto the runtime by [`SessionClient::spawn`]; consumers interact
/// through the returned [`SessionHandle`] and event receiver, normally via
/// the adapter.
pub struct SessionClient {
    config: WsConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    /// Server-assigned identity, cached for the lifetime of the client and
    /// re-presented on every reconnect
    session_id: Option<String>,
    /// Reconnects scheduled since the last connect-acknowledgement
    reconnect_attempts: u32,
    /// Set by a consumer `Disconnect`; suppresses automatic reconnection
    closed_by_user: bool,
}

impl SessionClient {
    /// Spawn a client that immediately tries to connect.
    ///
    /// Returns the command handle and the event stream. Events are
    /// delivered in protocol arrival order.
    pub fn spawn(
        config: WsConfig,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = SessionClient {
            config,
            events: event_tx,
            commands: cmd_rx,
            session_id: None,
            reconnect_attempts: 0,
            closed_by_user: false,
        };
        tokio::spawn(client.run());
        (SessionHandle { tx: cmd_tx }, event_rx)
    }

    async fn run(mut self) {
        // Spawning implies the first connect; afterwards `want_connect`
        // tracks whether the actor should be holding a transport open.
        let mut want_connect = true;

        loop {
            if !want_connect {
                match self.commands.recv().await {
                    Some(SessionCommand::Connect) => {
                        self.closed_by_user = false;
                        self.reconnect_attempts = 0;
                        want_connect = true;
                    }
                    Some(SessionCommand::Disconnect { .. }) => {
                        // Already offline; nothing to close.
                    }
                    Some(SessionCommand::StartAnalysis { .. }) => {
                        self.emit(SessionEvent::Rejected {
                            action: SessionAction::StartAnalysis,
                            reason: RejectReason::NotConnected,
                        });
                    }
                    Some(SessionCommand::AnswerQuestion { .. }) => {
                        self.emit(SessionEvent::Rejected {
                            action: SessionAction::AnswerQuestion,
                            reason: RejectReason::NotConnected,
                        });
                    }
                    None => return,
                }
                continue;
            }

            let outcome = match connect_async(self.config.url.as_str()).await {
                Ok((ws, _response)) => self.drive(ws).await,
                Err(e) => {
                    warn!(url = %self.config.url, error = %e, "failed to reach analysis server");
                    self.emit(SessionEvent::Closed {
                        code: None,
                        reason: Some(e.to_string()),
                    });
                    Driven::TransportLost
                }
            };

            match outcome {
                Driven::HandleDropped => return,
                Driven::UserClosed => want_connect = false,
                Driven::TransportLost => {
                    if self.closed_by_user {
                        want_connect = false;
                        continue;
                    }
                    if self.reconnect_attempts >= self.config.max_reconnect_attempts {
                        debug!(
                            attempts = self.reconnect_attempts,
                            "reconnect budget spent"
                        );
                        self.emit(SessionEvent::ReconnectsExhausted {
                            attempts: self.reconnect_attempts,
                        });
                        want_connect = false;
                        continue;
                    }
                    let delay = reconnect_delay(self.reconnect_attempts);
                    self.reconnect_attempts += 1;
                    debug!(
                        attempt = self.reconnect_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "scheduling reconnect"
                    );
                    match self.backoff_pause(delay).await {
                        Pause::Elapsed => {}
                        Pause::UserClosed => want_connect = false,
                        Pause::HandleDropped => return,
                    }
                }
            }
        }
    }

    /// Drive one transport from open to close.
    async fn drive(&mut self, mut ws: WsStream) -> Driven {
        // Transport is open: immediately present our identity. A cached
        // session id means this is a resume.
        let resuming = self.session_id.is_some();
        let hello = Envelope::new(
            Message::Connect(ConnectPayload {
                client_id: None,
                session_id: self.session_id.clone(),
            }),
            None,
            now_millis(),
        );
        if let Err(e) = self.send_frame(&mut ws, &hello).await {
            warn!(error = %e, "failed to send connect frame");
            self.emit(SessionEvent::Closed {
                code: None,
                reason: Some(e.to_string()),
            });
            return Driven::TransportLost;
        }
        self.emit(SessionEvent::Opened { resuming });

        loop {
            tokio::select! {
                incoming = ws.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => self.handle_frame(&text),
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = ws.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(f) => (Some(u16::from(f.code)), Some(f.reason.to_string())),
                            None => (None, None),
                        };
                        self.emit(SessionEvent::Closed { code, reason });
                        return self.close_outcome();
                    }
                    Some(Ok(_)) => {
                        // Binary/pong frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        self.emit(SessionEvent::Closed {
                            code: None,
                            reason: Some(e.to_string()),
                        });
                        return self.close_outcome();
                    }
                    None => {
                        self.emit(SessionEvent::Closed { code: None, reason: None });
                        return self.close_outcome();
                    }
                },
                command = self.commands.recv() => match command {
                    Some(cmd) => {
                        if let Some(outcome) = self.handle_command(cmd, &mut ws).await {
                            return outcome;
                        }
                    }
                    None => {
                        // Every handle dropped: say goodbye and exit.
                        let _ = self.send_farewell(&mut ws, None).await;
                        let _ = ws.close(None).await;
                        return Driven::HandleDropped;
                    }
                },
            }
        }
    }

    /// Apply one inbound frame. Malformed JSON and unknown tags are
    /// logged and dropped; they never affect connection state.
    fn handle_frame(&mut self, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                debug!("ignoring frame with unknown tag");
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        let kind = envelope.message.kind();
        match envelope.message {
            Message::Connect(payload) => {
                // Session id precedence: nested payload field, then the
                // top-level envelope field, then whatever we already had.
                let resolved = payload
                    .session_id
                    .clone()
                    .or(envelope.session_id)
                    .or_else(|| self.session_id.take());
                self.session_id = resolved;
                self.reconnect_attempts = 0;
                self.emit(SessionEvent::ConnectAck(payload));
            }
            Message::ProgressUpdate(payload) => self.emit(SessionEvent::Progress(payload)),
            Message::UserInput(payload) => self.emit(SessionEvent::Question {
                value: question_text(&payload),
            }),
            Message::Results(payload) => self.emit(SessionEvent::Results(payload)),
            Message::Error(payload) => self.emit(SessionEvent::ServerError(payload)),
            Message::StartAnalysis(_) | Message::UserAnswer(_) | Message::Disconnect(_) => {
                debug!(kind, "ignoring client-bound tag");
            }
        }
    }

    /// Apply one command while a transport is open. Returns the transport
    /// outcome when the command ends its life.
    async fn handle_command(&mut self, command: SessionCommand, ws: &mut WsStream) -> Option<Driven> {
        match command {
            SessionCommand::Connect => {
                // Already open; connect() is a no-op.
                None
            }
            SessionCommand::StartAnalysis {
                requirement,
                run_id,
            } => {
                if self.session_id.is_none() {
                    self.emit(SessionEvent::Rejected {
                        action: SessionAction::StartAnalysis,
                        reason: RejectReason::NoSession,
                    });
                    return None;
                }
                let frame = Envelope::new(
                    Message::StartAnalysis(StartAnalysisPayload {
                        requirement,
                        run_id,
                    }),
                    self.session_id.clone(),
                    now_millis(),
                );
                if let Err(e) = self.send_frame(ws, &frame).await {
                    warn!(error = %e, "failed to send start_analysis");
                }
                None
            }
            SessionCommand::AnswerQuestion { response } => {
                if self.session_id.is_none() {
                    self.emit(SessionEvent::Rejected {
                        action: SessionAction::AnswerQuestion,
                        reason: RejectReason::NoSession,
                    });
                    return None;
                }
                let frame = Envelope::new(
                    Message::UserAnswer(AnswerPayload { response }),
                    self.session_id.clone(),
                    now_millis(),
                );
                if let Err(e) = self.send_frame(ws, &frame).await {
                    warn!(error = %e, "failed to send user_answer");
                }
                None
            }
            SessionCommand::Disconnect { reason } => {
                // Best-effort farewell; failures are swallowed because the
                // transport may already be half-dead.
                self.closed_by_user = true;
                let _ = self.send_farewell(ws, reason).await;
                let _ = ws.close(None).await;
                // The read side observes the close handshake and emits
                // `Closed` before the transport winds down.
                None
            }
        }
    }

    async fn send_frame(&self, ws: &mut WsStream, envelope: &Envelope) -> AppResult<()> {
        let text = envelope.encode()?;
        ws.send(WsMessage::Text(text))
            .await
            .map_err(|e| AppError::transport(e.to_string()))
    }

    async fn send_farewell(&self, ws: &mut WsStream, reason: Option<String>) -> AppResult<()> {
        let farewell = Envelope::new(
            Message::Disconnect(DisconnectPayload { reason }),
            self.session_id.clone(),
            now_millis(),
        );
        self.send_frame(ws, &farewell).await
    }

    fn close_outcome(&self) -> Driven {
        if self.closed_by_user {
            Driven::UserClosed
        } else {
            Driven::TransportLost
        }
    }

    /// Sleep out a reconnect delay while staying responsive to commands.
    async fn backoff_pause(&mut self, delay: std::time::Duration) -> Pause {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Pause::Elapsed,
                command = self.commands.recv() => match command {
                    None => return Pause::HandleDropped,
                    Some(SessionCommand::Connect) => {
                        // Manual connect: retry immediately.
                        return Pause::Elapsed;
                    }
                    Some(SessionCommand::Disconnect { .. }) => {
                        self.closed_by_user = true;
                        return Pause::UserClosed;
                    }
                    Some(SessionCommand::StartAnalysis { .. }) => {
                        self.emit(SessionEvent::Rejected {
                            action: SessionAction::StartAnalysis,
                            reason: RejectReason::NotConnected,
                        });
                    }
                    Some(SessionCommand::AnswerQuestion { .. }) => {
                        self.emit(SessionEvent::Rejected {
                            action: SessionAction::AnswerQuestion,
                            reason: RejectReason::NotConnected,
                        });
                    }
                },
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.events.send(event);
    }
}

/// Outcome of a backoff pause.
enum Pause {
    Elapsed,
    UserClosed,
    HandleDropped,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
