//! Per-device channel task.
//!
//! Each channel:
//! - asks the hub for admission before anything else
//! - forwards decoded inbound events to the hub
//! - writes every queued [`Outbound`] item to the socket, in order
//!
//! # Lifecycle
//!
//! 1. Rejected at admission: send `kicked`, close, never registered.
//! 2. Admitted: runs until the device closes, the hub queues a kick, or the
//!    hub shuts down.
//! 3. On exit the hub is told the channel is gone.

use crate::errors::HubError;
use crate::protocol::{AckPayload, ClientEvent, InboundFrame, KickNotice, ServerEvent};

use super::hub::HubHandle;
use super::messages::{Admission, ChannelHandle, Outbound};

use axum::extract::ws::{Message, WebSocket};
use tracing::{debug, info, instrument, warn};

/// Inbound side of one admitted device.
#[derive(Debug, Clone)]
pub struct ChannelSession {
    session_id: String,
    hub: HubHandle,
}

impl ChannelSession {
    #[must_use]
    pub fn new(session_id: impl Into<String>, hub: HubHandle) -> Self {
        Self {
            session_id: session_id.into(),
            hub,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Handle one inbound text frame.
    ///
    /// Returns the `ack` reply when the frame asked for one. Frames that
    /// fail to decode are logged and dropped.
    pub async fn handle_text(&self, text: &str) -> Option<ServerEvent> {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    target: "hub.actor.connection",
                    session_id = %self.session_id,
                    error = %e,
                    "Dropping undecodable frame"
                );
                return None;
            }
        };

        let result = self.dispatch(frame.event).await;

        frame.ack.map(|id| {
            ServerEvent::Ack(AckPayload {
                id,
                success: result.is_ok(),
                error: result.err().map(|e| e.client_message()),
            })
        })
    }

    async fn dispatch(&self, event: ClientEvent) -> Result<(), HubError> {
        match event {
            ClientEvent::DeviceInfo(metadata) => {
                self.hub
                    .attach_metadata(self.session_id.clone(), metadata)
                    .await
            }
            ClientEvent::UpdateClipboard(update) => {
                self.hub
                    .upsert_content(update.id, update.content, update.name)
                    .await
            }
            ClientEvent::DeleteClipboard(id) => {
                let result = self.hub.remove_content(id).await;
                if let Err(HubError::Forbidden(ref reason)) = result {
                    debug!(
                        target: "hub.actor.connection",
                        session_id = %self.session_id,
                        reason = %reason,
                        "Ignored protected delete"
                    );
                }
                result
            }
            ClientEvent::KickDevice(target) => {
                let result = self.hub.kick(target.clone()).await;
                info!(
                    target: "hub.actor.connection",
                    session_id = %self.session_id,
                    kick_target = %target,
                    success = result.is_ok(),
                    "Kick requested by device"
                );
                result
            }
        }
    }
}

/// Drive one WebSocket from admission to close.
#[instrument(skip_all, name = "hub.actor.connection", fields(session_id = %session_id, ip = %ip))]
pub async fn serve_channel(mut socket: WebSocket, hub: HubHandle, session_id: String, ip: String) {
    let (handle, mut outbound) = ChannelHandle::new(session_id.clone(), ip.clone());

    match hub.admit(handle).await {
        Ok(Admission::Accepted) => {}
        Ok(Admission::Rejected(notice)) => {
            info!(
                target: "hub.actor.connection",
                session_id = %session_id,
                ip = %ip,
                "Channel rejected at admission"
            );
            send_kick(&mut socket, notice).await;
            return;
        }
        Err(e) => {
            warn!(
                target: "hub.actor.connection",
                session_id = %session_id,
                error = %e,
                "Hub unavailable, closing channel"
            );
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    let session = ChannelSession::new(session_id.clone(), hub.clone());
    let cancel_token = hub.child_token();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!(target: "hub.actor.connection", session_id = %session_id, "Hub shutting down");
                let _ = socket.send(Message::Close(None)).await;
                break;
            }

            item = outbound.recv() => {
                match item {
                    Some(Outbound::Event(event)) => {
                        if let Err(e) = send_event(&mut socket, &event).await {
                            debug!(
                                target: "hub.actor.connection",
                                session_id = %session_id,
                                error = %e,
                                "Send failed, closing channel"
                            );
                            break;
                        }
                    }
                    Some(Outbound::Kick(notice)) => {
                        send_kick(&mut socket, notice).await;
                        break;
                    }
                    None => break,
                }
            }

            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.handle_text(&text).await {
                            if let Err(e) = send_event(&mut socket, &reply).await {
                                debug!(
                                    target: "hub.actor.connection",
                                    session_id = %session_id,
                                    error = %e,
                                    "Ack send failed, closing channel"
                                );
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(
                            target: "hub.actor.connection",
                            session_id = %session_id,
                            error = %e,
                            "Socket error"
                        );
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = hub.disconnected(session_id.clone()).await {
        debug!(
            target: "hub.actor.connection",
            session_id = %session_id,
            error = %e,
            "Hub gone before disconnect"
        );
    }

    info!(target: "hub.actor.connection", session_id = %session_id, "Channel closed");
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), HubError> {
    let text = serde_json::to_string(event)
        .map_err(|e| HubError::Internal(format!("event encoding failed: {e}")))?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| HubError::Internal(format!("socket send failed: {e}")))
}

/// Send `kicked` and close the socket.
async fn send_kick(socket: &mut WebSocket, notice: KickNotice) {
    if let Err(e) = send_event(socket, &ServerEvent::Kicked(notice)).await {
        debug!(target: "hub.actor.connection", error = %e, "Kick notice not delivered");
    }
    let _ = socket.send(Message::Close(None)).await;
}
