//! Session Client Integration Tests
//!
//! Exercise the client actor against a real in-process WebSocket server:
//! handshake and resume semantics, dispatch, reconnection policy, and
//! user-initiated shutdown.

use std::time::Duration;

use tokio::sync::mpsc;

use reqtrace_app::{SessionClient, SessionEvent};
use reqtrace_core::protocol::{ErrorPayload, Message, ProgressPayload};

use crate::support::{
    accept, bind_server, handshake, recv_envelope, send_message, send_raw, STEP_TIMEOUT,
};

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
}

#[tokio::test]
async fn fresh_connect_has_empty_payload_and_resume_carries_the_id() {
    let (listener, config) = bind_server(5).await;
    let (handle, mut events) = SessionClient::spawn(config);

    // First connection: no cached id.
    let mut ws = accept(&listener).await;
    let presented = handshake(&mut ws, "S1").await;
    assert_eq!(presented.session_id, None);

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Opened { resuming: false }
    );
    match next_event(&mut events).await {
        SessionEvent::ConnectAck(payload) => {
            assert_eq!(payload.session_id.as_deref(), Some("S1"))
        }
        other => panic!("expected ack, got {other:?}"),
    }

    // Kill the transport; the client must come back presenting S1.
    drop(ws);
    loop {
        if matches!(next_event(&mut events).await, SessionEvent::Closed { .. }) {
            break;
        }
    }

    let mut ws = accept(&listener).await;
    let presented = handshake(&mut ws, "S1").await;
    assert_eq!(presented.session_id.as_deref(), Some("S1"));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Opened { resuming: true }
    );

    drop(handle);
}

#[tokio::test]
async fn outbound_actions_carry_the_acknowledged_session_id() {
    let (listener, config) = bind_server(5).await;
    let (handle, mut events) = SessionClient::spawn(config);

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S1").await;
    next_event(&mut events).await; // Opened
    next_event(&mut events).await; // ConnectAck

    handle
        .start_analysis("track infusion rates".to_string(), Some(1))
        .unwrap();
    let frame = recv_envelope(&mut ws).await.unwrap();
    assert_eq!(frame.session_id.as_deref(), Some("S1"));
    match frame.message {
        Message::StartAnalysis(payload) => {
            assert_eq!(payload.requirement, "track infusion rates");
            assert_eq!(payload.run_id, Some(1));
        }
        other => panic!("expected start_analysis, got {other:?}"),
    }

    handle.answer_question("ml per hour".to_string()).unwrap();
    let frame = recv_envelope(&mut ws).await.unwrap();
    assert_eq!(frame.session_id.as_deref(), Some("S1"));
    match frame.message {
        Message::UserAnswer(payload) => assert_eq!(payload.response, "ml per hour"),
        other => panic!("expected user_answer, got {other:?}"),
    }
}

#[tokio::test]
async fn server_frames_become_typed_events() {
    let (listener, config) = bind_server(5).await;
    let (_handle, mut events) = SessionClient::spawn(config);

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S1").await;
    next_event(&mut events).await; // Opened
    next_event(&mut events).await; // ConnectAck

    // Noise the client must ignore: malformed JSON, unknown tags.
    send_raw(&mut ws, "{oops").await;
    send_raw(&mut ws, r#"{"type":"heartbeat","timestamp":1}"#).await;

    send_message(
        &mut ws,
        Message::ProgressUpdate(ProgressPayload {
            progress: 40,
            message: Some("reading requirements".into()),
            ..Default::default()
        }),
        Some("S1"),
    )
    .await;
    match next_event(&mut events).await {
        SessionEvent::Progress(p) => assert_eq!(p.progress, 40),
        other => panic!("expected progress, got {other:?}"),
    }

    // Question payloads are normalized (value takes precedence).
    send_raw(
        &mut ws,
        r#"{"type":"user_input","sessionId":"S1","timestamp":2,
            "payload":{"value":"Which units?","response":"ignored"}}"#,
    )
    .await;
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Question {
            value: "Which units?".into()
        }
    );

    // A server error is surfaced without touching the connection.
    send_message(
        &mut ws,
        Message::Error(ErrorPayload {
            code: "ANALYSIS_FAILED".into(),
            message: "model unavailable".into(),
            ..Default::default()
        }),
        Some("S1"),
    )
    .await;
    match next_event(&mut events).await {
        SessionEvent::ServerError(e) => assert_eq!(e.code, "ANALYSIS_FAILED"),
        other => panic!("expected server error, got {other:?}"),
    }

    // Still connected: another progress update arrives fine.
    send_message(
        &mut ws,
        Message::ProgressUpdate(ProgressPayload {
            progress: 80,
            ..Default::default()
        }),
        Some("S1"),
    )
    .await;
    match next_event(&mut events).await {
        SessionEvent::Progress(p) => assert_eq!(p.progress, 80),
        other => panic!("expected progress, got {other:?}"),
    }
}

#[tokio::test]
async fn start_analysis_without_session_is_rejected_not_sent() {
    let (listener, config) = bind_server(5).await;
    let (handle, mut events) = SessionClient::spawn(config);

    let mut ws = accept(&listener).await;
    // Handshake not acknowledged yet: read the hello but send no ack.
    let hello = recv_envelope(&mut ws).await.unwrap();
    assert!(matches!(hello.message, Message::Connect(_)));
    next_event(&mut events).await; // Opened

    handle.start_analysis("too early".to_string(), None).unwrap();
    match next_event(&mut events).await {
        SessionEvent::Rejected { action, reason } => {
            assert_eq!(action, reqtrace_app::SessionAction::StartAnalysis);
            assert_eq!(reason, reqtrace_app::RejectReason::NoSession);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn user_disconnect_sends_farewell_and_stops_reconnecting() {
    let (listener, config) = bind_server(5).await;
    let (handle, mut events) = SessionClient::spawn(config);

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S1").await;
    next_event(&mut events).await; // Opened
    next_event(&mut events).await; // ConnectAck

    handle.disconnect(Some("unmount".to_string())).unwrap();

    let farewell = recv_envelope(&mut ws).await.unwrap();
    assert_eq!(farewell.session_id.as_deref(), Some("S1"));
    match farewell.message {
        Message::Disconnect(payload) => assert_eq!(payload.reason.as_deref(), Some("unmount")),
        other => panic!("expected disconnect, got {other:?}"),
    }
    // Drain the close handshake so the client side completes.
    while recv_envelope(&mut ws).await.is_some() {}

    loop {
        if matches!(next_event(&mut events).await, SessionEvent::Closed { .. }) {
            break;
        }
    }

    // No automatic reconnect may follow a user-initiated close.
    let no_reconnect =
        tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(no_reconnect.is_err(), "client reconnected after disconnect");
}

#[tokio::test]
async fn exhausted_reconnects_stop_until_manual_connect() {
    // Zero budget: the first transport loss exhausts reconnection.
    let (listener, config) = bind_server(0).await;
    let (handle, mut events) = SessionClient::spawn(config);

    let ws = accept(&listener).await;
    drop(ws); // server vanishes before acknowledging

    loop {
        match next_event(&mut events).await {
            SessionEvent::ReconnectsExhausted { attempts } => {
                assert_eq!(attempts, 0);
                break;
            }
            SessionEvent::Opened { .. } | SessionEvent::Closed { .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
    }

    // No automatic attempt follows...
    let idle = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(idle.is_err(), "client reconnected past its budget");

    // ...but a manual connect re-arms the client.
    handle.connect().unwrap();
    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S2").await;
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Opened { resuming: false }
    );
}
