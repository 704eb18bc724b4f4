//! Device channel wire protocol.
//!
//! Every WebSocket text frame carries one JSON envelope:
//!
//! ```text
//! inbound:  { "event": "<name>", "data": <payload>, "ack": <u64, optional> }
//! outbound: { "event": "<name>", "data": <payload> }
//! ```
//!
//! Inbound events: `device-info`, `update-clipboard`, `delete-clipboard`,
//! `kick-device` (acknowledged). Outbound events: `init-clipboards`,
//! `clipboard-updated`, `devices-updated`, `kicked`, `ack`.

use crate::models::{metadata_from_json, ContentEntry, EndpointSession, Metadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason sent to a device whose address is denied at admission.
pub const REJECTED_BANNED_REASON: &str = "Your IP is banned, please wait for the ban to be lifted";

/// Reason sent to a device removed by a targeted kick.
pub const KICKED_REASON: &str =
    "You were kicked by an administrator and cannot reconnect for 24 hours";

/// Reason sent to devices closed by an administrative ban.
#[must_use]
pub fn admin_ban_reason(hours: f64) -> String {
    format!("Your IP has been banned by an administrator for {hours} hours")
}

/// Events pushed from the hub to a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full clipboard list, sent once to a newly admitted device.
    InitClipboards(Vec<ContentEntry>),
    /// Full clipboard list after a mutation.
    ClipboardUpdated(Vec<ContentEntry>),
    /// Full device list after a registry change.
    DevicesUpdated(Vec<EndpointSession>),
    /// Sent right before the hub force-closes the channel.
    Kicked(KickNotice),
    /// Reply to an inbound event that carried an `ack` id.
    Ack(AckPayload),
}

impl ServerEvent {
    /// Event name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::InitClipboards(_) => "init-clipboards",
            ServerEvent::ClipboardUpdated(_) => "clipboard-updated",
            ServerEvent::DevicesUpdated(_) => "devices-updated",
            ServerEvent::Kicked(_) => "kicked",
            ServerEvent::Ack(_) => "ack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickNotice {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckPayload {
    pub id: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of `update-clipboard`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClipboardUpdate {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Events a device may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    DeviceInfo(Metadata),
    UpdateClipboard(ClipboardUpdate),
    DeleteClipboard(String),
    KickDevice(String),
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub event: ClientEvent,
    pub ack: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    ack: Option<u64>,
}

impl InboundFrame {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] for invalid JSON, an unknown event name or
    /// a payload of the wrong shape.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let invalid = |reason: String| ProtocolError::InvalidPayload {
            event: raw.event.clone(),
            reason,
        };

        let event = match raw.event.as_str() {
            "device-info" => match raw.data {
                serde_json::Value::Object(object) => {
                    ClientEvent::DeviceInfo(metadata_from_json(object))
                }
                serde_json::Value::Null => ClientEvent::DeviceInfo(Metadata::new()),
                _ => return Err(invalid("expected an object".to_string())),
            },
            "update-clipboard" => ClientEvent::UpdateClipboard(
                serde_json::from_value(raw.data).map_err(|e| invalid(e.to_string()))?,
            ),
            "delete-clipboard" => ClientEvent::DeleteClipboard(
                serde_json::from_value(raw.data).map_err(|e| invalid(e.to_string()))?,
            ),
            "kick-device" => ClientEvent::KickDevice(
                serde_json::from_value(raw.data).map_err(|e| invalid(e.to_string()))?,
            ),
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };

        Ok(Self {
            event,
            ack: raw.ack,
        })
    }
}
