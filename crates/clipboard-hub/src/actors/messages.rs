//! Message types for actor communication.
//!
//! All communication with the hub uses strongly-typed message passing via
//! `tokio::sync::mpsc`. Request-reply uses `tokio::sync::oneshot`. Outbound
//! traffic to a device goes through the device's unbounded queue so the hub
//! never waits on a slow client.

use crate::errors::HubError;
use crate::models::{ContentEntry, DenialView, EndpointSession, Metadata};
use crate::protocol::{KickNotice, ServerEvent};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// Messages sent to the `HubActor`.
#[derive(Debug)]
pub enum HubMessage {
    /// A new channel asks to be admitted.
    Admit {
        channel: ChannelHandle,
        respond_to: oneshot::Sender<Admission>,
    },

    /// A device submitted its metadata (`device-info`).
    AttachMetadata {
        session_id: String,
        metadata: Metadata,
    },

    /// A channel closed.
    Disconnected { session_id: String },

    /// Insert or update a clipboard entry.
    UpsertContent {
        id: String,
        content: String,
        name: Option<String>,
        respond_to: oneshot::Sender<()>,
    },

    /// Remove a clipboard entry.
    RemoveContent {
        id: String,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },

    /// Snapshot of the clipboard entries.
    ListContent {
        respond_to: oneshot::Sender<Vec<ContentEntry>>,
    },

    /// Snapshot of the connected devices.
    ListSessions {
        respond_to: oneshot::Sender<Vec<EndpointSession>>,
    },

    /// Close one device and deny its address for 24 hours.
    Kick {
        session_id: String,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },

    /// Deny an address and close every device connected from it.
    ///
    /// Replies with the number of channels closed.
    Ban {
        ip: String,
        hours: f64,
        respond_to: oneshot::Sender<Result<usize, HubError>>,
    },

    /// Lift the denial on an address.
    Unban {
        ip: String,
        respond_to: oneshot::Sender<Result<(), HubError>>,
    },

    /// Snapshot of the denylist with remaining hours.
    ListDenials {
        respond_to: oneshot::Sender<Vec<DenialView>>,
    },

    /// Counters for health and debugging.
    GetStatus {
        respond_to: oneshot::Sender<HubStatus>,
    },
}

/// Outcome of an admission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Registered; the initial sync is already queued on the channel.
    Accepted,
    /// Denied; the channel must send the notice and close.
    Rejected(KickNotice),
}

/// Items queued for delivery on one device channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and send.
    Event(ServerEvent),
    /// Send `kicked` with this notice, then close immediately.
    Kick(KickNotice),
}

/// Counters reported by the hub, served as the `/ready` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    pub content_entries: usize,
    pub sessions: usize,
    pub channels: usize,
    pub denials: usize,
    pub messages_processed: u64,
}

/// The hub's end of one device channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    session_id: String,
    ip: String,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ChannelHandle {
    /// Create a handle and the receiver the channel task drains.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        ip: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                session_id: session_id.into(),
                ip: ip.into(),
                sender,
            },
            receiver,
        )
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Queue an event. Returns false if the channel task is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(Outbound::Event(event)).is_ok()
    }

    /// Queue the kick notice that ends the channel.
    pub fn kick(&self, notice: KickNotice) -> bool {
        self.sender.send(Outbound::Kick(notice)).is_ok()
    }
}
