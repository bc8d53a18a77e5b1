//! Analysis Wire Protocol
//!
//! Tagged JSON messages exchanged with the analysis server over a persistent
//! duplex WebSocket. Every frame is an envelope
//! `{ "type", "sessionId"?, "timestamp", "payload"? }` where `type` comes
//! from a closed tag set and the payload shape is tag-specific.
//!
//! Tolerance rules, in one place:
//! - unknown tags decode to `None` (callers drop them silently)
//! - unknown payload fields are ignored
//! - a missing `payload` is treated as an empty object
//! - malformed JSON is a `CoreError::Protocol`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

// ============================================================================
// Payloads
// ============================================================================

/// Payload of a `connect` frame, in either direction.
///
/// The client's very first connect carries an empty payload; reconnects carry
/// the cached `sessionId`. The server's acknowledgement carries the assigned
/// `sessionId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Payload of a client `start_analysis` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartAnalysisPayload {
    /// The raw requirements text to analyze
    pub requirement: String,
    /// Run correlation id; stale responses carrying a different id are
    /// discarded by the session adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
}

/// Payload of a client `user_answer` frame (free-text answer to a
/// clarifying question).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerPayload {
    pub response: String,
}

/// Pipeline stage reported in `progress_update` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Initialization,
    Understanding,
    Completion,
}

impl Default for AnalysisStage {
    fn default() -> Self {
        AnalysisStage::Initialization
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStage::Initialization => write!(f, "initialization"),
            AnalysisStage::Understanding => write!(f, "understanding"),
            AnalysisStage::Completion => write!(f, "completion"),
        }
    }
}

/// Payload of a server `progress_update` frame. Each update replaces the
/// previous snapshot; no history is kept anywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressPayload {
    pub stage: AnalysisStage,
    /// Percent complete, 0-100
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
}

/// Speaker role in the recorded conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of the analysis conversation, as replayed in results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Terminal payload of a server `results` frame. A session produces at most
/// one of these per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultsPayload {
    pub insights: Vec<String>,
    pub conversation_history: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visited_urls: Option<Vec<String>>,
    /// Serialized flowchart JSON; may contain control characters that must
    /// be stripped before parsing (see `flowchart::sanitize_json`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_chart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
}

/// Payload of a server `error` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
}

/// Payload of a `disconnect` farewell frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisconnectPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// Messages
// ============================================================================

/// A decoded protocol message: the closed tag set plus its typed payload.
///
/// `user_input` is the one deliberately loose variant: servers have been
/// observed to put the question text under `value`, under `response`, or as
/// the bare payload, so the raw JSON is carried and normalized once by
/// [`question_text`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Connect(ConnectPayload),
    StartAnalysis(StartAnalysisPayload),
    UserInput(Value),
    UserAnswer(AnswerPayload),
    ProgressUpdate(ProgressPayload),
    Results(ResultsPayload),
    Error(ErrorPayload),
    Disconnect(DisconnectPayload),
}

impl Message {
    /// The wire tag for this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Connect(_) => "connect",
            Message::StartAnalysis(_) => "start_analysis",
            Message::UserInput(_) => "user_input",
            Message::UserAnswer(_) => "user_answer",
            Message::ProgressUpdate(_) => "progress_update",
            Message::Results(_) => "results",
            Message::Error(_) => "error",
            Message::Disconnect(_) => "disconnect",
        }
    }
}

/// One wire frame: a message plus the envelope metadata shared by all tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    /// Absent only on the very first connect of a fresh session
    pub session_id: Option<String>,
    /// Epoch milliseconds, set by the sender
    pub timestamp: i64,
}

/// Serialized envelope shape. Kept private so all tolerance handling goes
/// through `Envelope::decode` / `Envelope::encode`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default)]
    timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl Envelope {
    /// Build an envelope ready for encoding.
    pub fn new(message: Message, session_id: Option<String>, timestamp: i64) -> Self {
        Self {
            message,
            session_id,
            timestamp,
        }
    }

    /// Decode one wire frame.
    ///
    /// Returns `Ok(None)` for frames with an unrecognized tag, which the
    /// protocol requires consumers to drop silently. A missing payload is
    /// decoded as an empty object.
    pub fn decode(text: &str) -> CoreResult<Option<Envelope>> {
        let raw: RawEnvelope = serde_json::from_str(text)
            .map_err(|e| CoreError::protocol(format!("malformed envelope: {e}")))?;
        let payload = raw
            .payload
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let message = match raw.kind.as_str() {
            "connect" => Message::Connect(decode_payload(raw.kind.as_str(), payload)?),
            "start_analysis" => Message::StartAnalysis(decode_payload(raw.kind.as_str(), payload)?),
            "user_input" => Message::UserInput(payload),
            "user_answer" => Message::UserAnswer(decode_payload(raw.kind.as_str(), payload)?),
            "progress_update" => {
                Message::ProgressUpdate(decode_payload(raw.kind.as_str(), payload)?)
            }
            "results" => Message::Results(decode_payload(raw.kind.as_str(), payload)?),
            "error" => Message::Error(decode_payload(raw.kind.as_str(), payload)?),
            "disconnect" => Message::Disconnect(decode_payload(raw.kind.as_str(), payload)?),
            _ => return Ok(None),
        };

        Ok(Some(Envelope {
            message,
            session_id: raw.session_id,
            timestamp: raw.timestamp,
        }))
    }

    /// Encode this frame as compact JSON.
    ///
    /// The payload is always written, as an empty object when the message
    /// carries no data, so receivers never see a bare tag.
    pub fn encode(&self) -> CoreResult<String> {
        let payload = match &self.message {
            Message::Connect(p) => serde_json::to_value(p)?,
            Message::StartAnalysis(p) => serde_json::to_value(p)?,
            Message::UserInput(v) => v.clone(),
            Message::UserAnswer(p) => serde_json::to_value(p)?,
            Message::ProgressUpdate(p) => serde_json::to_value(p)?,
            Message::Results(p) => serde_json::to_value(p)?,
            Message::Error(p) => serde_json::to_value(p)?,
            Message::Disconnect(p) => serde_json::to_value(p)?,
        };

        let raw = RawEnvelope {
            kind: self.message.kind().to_string(),
            session_id: self.session_id.clone(),
            timestamp: self.timestamp,
            payload: Some(payload),
        };
        Ok(serde_json::to_string(&raw)?)
    }
}

fn decode_payload<T: DeserializeOwned>(kind: &str, payload: Value) -> CoreResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| CoreError::protocol(format!("bad `{kind}` payload: {e}")))
}

/// Extract the question text from a `user_input` payload.
///
/// Precedence, documented here once: the `value` field, then the `response`
/// field, then the whole payload rendered as a string. String fields are
/// taken verbatim; anything else is rendered as JSON.
pub fn question_text(payload: &Value) -> String {
    match payload.get("value").or_else(|| payload.get("response")) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => match payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}
