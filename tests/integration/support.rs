//! Test Support
//!
//! Helpers for scripting an in-process analysis server over
//! tokio-tungstenite, so session tests exercise the real transport.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};

use reqtrace_app::WsConfig;
use reqtrace_core::protocol::{ConnectPayload, Envelope, Message};

pub type ServerWs = WebSocketStream<TcpStream>;

/// How long any single test step may wait before the test fails.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a listener on an ephemeral port and build the client config
/// pointing at it.
pub async fn bind_server(max_reconnect_attempts: u32) -> (TcpListener, WsConfig) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let config = WsConfig {
        url: format!("ws://{addr}"),
        max_reconnect_attempts,
    };
    (listener, config)
}

/// Accept one WebSocket connection.
pub async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("timed out waiting for a connection")
        .expect("accept");
    accept_async(stream).await.expect("websocket handshake")
}

/// Read frames until the next protocol envelope; `None` once the
/// connection is closed.
pub async fn recv_envelope(ws: &mut ServerWs) -> Option<Envelope> {
    loop {
        let frame = tokio::time::timeout(STEP_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")?;
        match frame {
            Ok(WsMessage::Text(text)) => {
                return Some(
                    Envelope::decode(&text)
                        .expect("client sent malformed frame")
                        .expect("client sent unknown tag"),
                );
            }
            Ok(WsMessage::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Send one protocol message to the client.
pub async fn send_message(ws: &mut ServerWs, message: Message, session_id: Option<&str>) {
    let envelope = Envelope::new(message, session_id.map(str::to_string), 1_700_000_000_000);
    let text = envelope.encode().expect("encode test frame");
    ws.send(WsMessage::Text(text)).await.expect("send frame");
}

/// Send a raw text frame (for malformed/unknown input tests).
pub async fn send_raw(ws: &mut ServerWs, text: &str) {
    ws.send(WsMessage::Text(text.to_string()))
        .await
        .expect("send raw frame");
}

/// A standard connect acknowledgement assigning the given session id.
pub fn ack_message(session_id: &str) -> Message {
    Message::Connect(ConnectPayload {
        client_id: None,
        session_id: Some(session_id.to_string()),
    })
}

/// Perform the server side of the handshake: read the client's connect
/// frame and acknowledge with the given session id. Returns the connect
/// payload the client presented.
pub async fn handshake(ws: &mut ServerWs, session_id: &str) -> ConnectPayload {
    let hello = recv_envelope(ws).await.expect("client connect frame");
    let payload = match hello.message {
        Message::Connect(payload) => payload,
        other => panic!("expected connect, got {other:?}"),
    };
    send_message(ws, ack_message(session_id), None).await;
    payload
}
