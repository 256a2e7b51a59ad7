//! WebSocket wire format
//!
//! Every frame is a JSON object `{"type": ..., "data": ...}`.

use super::directory::{ClientEntry, Registration};
use crate::analytics::{AnalyticsSummary, HealthSnapshot};
use crate::error::InputError;
use crate::monitor::{AgentMetrics, ApiSummary, SecurityMetrics, SystemMetrics};
use serde::{Deserialize, Serialize};

/// Merged view of every monitor pushed on each broadcast tick
#[derive(Debug, Clone, Serialize)]
pub struct CompositeState {
    pub timestamp_ms: i64,
    pub uptime_seconds: u64,
    pub connected_clients: usize,
    pub system: SystemMetrics,
    pub api: ApiSummary,
    pub agents: AgentMetrics,
    pub security: SecurityMetrics,
    pub health: Option<HealthSnapshot>,
    pub analytics: AnalyticsSummary,
}

/// Free-form message relayed between clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub author: String,
    /// Connection that submitted the message, absent for HTTP submissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSubmission {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorFrame {
    pub code: String,
    pub message: String,
}

impl From<&InputError> for ErrorFrame {
    fn from(err: &InputError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Server to client frames
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "state_update")]
    StateUpdate(Box<CompositeState>),
    #[serde(rename = "new_message")]
    NewMessage(ChatMessage),
    #[serde(rename = "client_update")]
    ClientUpdate(Vec<ClientEntry>),
    #[serde(rename = "error")]
    Error(ErrorFrame),
}

/// Client to server frames
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "register")]
    Register(Registration),
    #[serde(rename = "message")]
    Message(MessageSubmission),
    #[serde(rename = "heartbeat")]
    Heartbeat,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register(_) => "register",
            ClientMessage::Message(_) => "message",
            ClientMessage::Heartbeat => "heartbeat",
        }
    }
}

const CLIENT_KINDS: [&str; 3] = ["register", "message", "heartbeat"];

/// Parse a client text frame, separating unknown kinds from bad payloads
pub fn parse_client_message(text: &str) -> Result<ClientMessage, InputError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| InputError::Malformed(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| InputError::Malformed("missing \"type\" field".to_string()))?;

    if !CLIENT_KINDS.contains(&kind) {
        return Err(InputError::UnknownKind(kind.to_string()));
    }

    serde_json::from_value(value).map_err(|e| InputError::Malformed(e.to_string()))
}
