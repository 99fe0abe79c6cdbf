//! Data shared between the transport, the controller and the view.

use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Placeholder shown for elapsed time and latency when there is nothing to show.
pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    System,
    Sent,
    Received,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub text: String,
    pub category: Category,
    pub at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connecting,
    Connected,
    Disconnected,
}

/// Which affordances the user may trigger right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions {
    pub connect: bool,
    pub disconnect: bool,
    pub ping: bool,
    pub test: bool,
    pub send: bool,
    pub input: bool,
}

impl Actions {
    pub fn new(connected: bool, connecting: bool) -> Self {
        Self {
            connect: !connected && !connecting,
            disconnect: connected,
            ping: connected,
            test: connected,
            send: connected,
            input: connected,
        }
    }
}

/// Everything the terminal renders. The controller is the only writer.
#[derive(Debug, Clone)]
pub struct View {
    pub status: Status,
    pub status_label: String,
    pub actions: Actions,
    pub log: Vec<LogEntry>,
    pub message_count: usize,
    pub elapsed: String,
    pub last_ping: Option<Duration>,
    pub input: String,
}

impl Default for View {
    fn default() -> Self {
        Self {
            status: Status::Disconnected,
            status_label: "❌ Disconnected".to_string(),
            actions: Actions::new(false, false),
            log: Vec::new(),
            message_count: 0,
            elapsed: PLACEHOLDER.to_string(),
            last_ping: None,
            input: String::new(),
        }
    }
}

impl View {
    pub fn count_text(&self) -> String {
        self.message_count.to_string()
    }

    pub fn ping_text(&self) -> String {
        match self.last_ping {
            Some(rtt) => rtt.as_millis().to_string(),
            None => PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundKind {
    Connection,
    Pong,
    Echo,
    Broadcast,
    Periodic,
    Text,
    Message,
    #[serde(other)]
    Other,
}

impl Default for InboundKind {
    fn default() -> Self {
        InboundKind::Other
    }
}

/// A decoded server frame. Any JSON object decodes; anything else is raw text.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: InboundKind,
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub sender: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Unknown, missing or non-string tags all land on `Other`.
fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<InboundKind, D::Error> {
    let tag = Option::<Value>::deserialize(deserializer)?;
    Ok(match tag {
        Some(tag @ Value::String(_)) => serde_json::from_value(tag).unwrap_or_default(),
        _ => InboundKind::Other,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl InboundMessage {
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// The `message` field as display text.
    pub fn text(&self) -> String {
        display(&self.message)
    }

    pub fn sender(&self) -> Option<String> {
        self.sender.as_ref().map(display)
    }

    pub fn timestamp(&self) -> Option<String> {
        self.timestamp.as_ref().map(display)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundKind {
    Ping,
    Echo,
    Broadcast,
}

impl OutboundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKind::Ping => "ping",
            OutboundKind::Echo => "echo",
            OutboundKind::Broadcast => "broadcast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    pub message: String,
    pub timestamp: String,
}

impl OutboundMessage {
    pub fn new(kind: OutboundKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: iso8601(at),
        }
    }
}

/// What `send` accepts: a tagged record or plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Structured(OutboundMessage),
}

impl Payload {
    pub fn encode(&self) -> Result<String, ClientError> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Structured(msg) => Ok(serde_json::to_string(msg)?),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Structured(msg) => format!("{}: {}", msg.kind.as_str(), msg.message),
        }
    }
}

/// UTC with millisecond precision and a `Z` suffix, e.g. `2024-05-01T12:00:00.000Z`.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Coarsest non-zero leading unit: `45s`, `2m 5s`, `1h 2m`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
