//! Dashboard wire protocol: JSON text frames over a WebSocket.
//!
//! Every frame is an envelope `{"type": "...", "data": {...}}`. Outbound frames
//! always use `data`; inbound frames may carry the body under `payload`
//! instead, which older servers still emit.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::models::{Alert, AlertStatus, CongestionNode, Feed, FeedPatch, KpiSnapshot};

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close frame without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without any close frame. Never sent on the wire.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Closes the client treats as intentional; everything else is retried.
pub fn is_clean_close(code: u16) -> bool {
    matches!(code, CLOSE_NORMAL | CLOSE_NO_STATUS)
}

/// The raw envelope, before the body is interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "payload")]
    pub data: Value,
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }
}

// --- Inbound ---

/// Body of `initial_data`: the bulk snapshot sent right after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InitialData {
    #[serde(deserialize_with = "null_as_default")]
    pub feeds: Vec<Feed>,
    #[serde(deserialize_with = "null_as_default")]
    pub alerts: Vec<AlertUpdate>,
    #[serde(deserialize_with = "null_as_default")]
    pub kpis: KpiSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<CongestionNode>>,
}

/// Body of `alert_update`: a full alert plus an optional status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertUpdate {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
}

/// Body of `alert_status_update`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertStatusChange {
    #[serde(alias = "alertId")]
    pub alert_id: String,
    pub status: AlertStatus,
}

/// `alert_update` either carries a whole alert, or just `{id, status}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AlertUpdateBody {
    Full(AlertUpdate),
    StatusOnly { id: String, status: AlertStatus },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NodesBody {
    Bare(Vec<CongestionNode>),
    Wrapped { nodes: Vec<CongestionNode> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Text(String),
    Detail { message: String },
}

/// Every message the server may push. `Unknown` keeps dispatch working when
/// the server grows a type this client predates.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    InitialData(InitialData),
    FeedUpdate(FeedPatch),
    KpiUpdate(KpiSnapshot),
    AlertUpdate(AlertUpdate),
    AlertStatusUpdate(AlertStatusChange),
    NodeCongestionUpdate(Vec<CongestionNode>),
    Error { message: String },
    Ping,
    Unknown { kind: String },
}

impl ServerMessage {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Self::from_frame(Frame::parse(text)?)
    }

    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let Frame { kind, mut data } = frame;
        // Bodies that are objects may be left out entirely.
        if data.is_null() && matches!(kind.as_str(), "initial_data" | "kpi_update") {
            data = Value::Object(Map::new());
        }
        let message = match kind.as_str() {
            "initial_data" => ServerMessage::InitialData(decode(&kind, data)?),
            "feed_update" => ServerMessage::FeedUpdate(decode(&kind, data)?),
            "kpi_update" => ServerMessage::KpiUpdate(decode(&kind, data)?),
            "alert_update" => match decode::<AlertUpdateBody>(&kind, data)? {
                AlertUpdateBody::Full(update) => ServerMessage::AlertUpdate(update),
                AlertUpdateBody::StatusOnly { id, status } => {
                    ServerMessage::AlertStatusUpdate(AlertStatusChange {
                        alert_id: id,
                        status,
                    })
                }
            },
            "alert_status_update" => ServerMessage::AlertStatusUpdate(decode(&kind, data)?),
            "node_congestion_update" => {
                let nodes = match decode::<NodesBody>(&kind, data)? {
                    NodesBody::Bare(nodes) | NodesBody::Wrapped { nodes } => nodes,
                };
                ServerMessage::NodeCongestionUpdate(nodes)
            }
            "error" => {
                let message = match decode::<ErrorBody>(&kind, data)? {
                    ErrorBody::Text(message) | ErrorBody::Detail { message } => message,
                };
                ServerMessage::Error { message }
            }
            "ping" => ServerMessage::Ping,
            other => ServerMessage::Unknown {
                kind: other.to_string(),
            },
        };
        Ok(message)
    }

    /// The wire name of this message.
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::InitialData(_) => "initial_data",
            ServerMessage::FeedUpdate(_) => "feed_update",
            ServerMessage::KpiUpdate(_) => "kpi_update",
            ServerMessage::AlertUpdate(_) => "alert_update",
            ServerMessage::AlertStatusUpdate(_) => "alert_status_update",
            ServerMessage::NodeCongestionUpdate(_) => "node_congestion_update",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Ping => "ping",
            ServerMessage::Unknown { kind } => kind,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::payload(kind, e))
}

// --- Outbound ---

/// Typed client commands. Serializes to the same envelope as [`OutboundFrame`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    StartFeed { feed_id: String },
    StopFeed { feed_id: String },
    Pong {},
}

impl ClientCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::StartFeed { .. } => "start_feed",
            ClientCommand::StopFeed { .. } => "stop_feed",
            ClientCommand::Pong {} => "pong",
        }
    }
}

/// Generic outbound envelope for command types without a typed variant.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub data: &'a Value,
}

impl OutboundFrame<'_> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
