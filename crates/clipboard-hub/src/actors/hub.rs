//! `HubActor` - the single writer for all shared state.
//!
//! The hub owns:
//! - the [`ContentStore`] (named clipboard entries)
//! - the [`SessionRegistry`] (connected devices)
//! - the [`AccessGuard`] (IP denylist)
//! - one [`ChannelHandle`] per admitted device
//!
//! Every mutation and the broadcast that follows it run inside one
//! `handle_message` call, so devices observe mutations in the order the
//! hub applied them and every broadcast carries a complete snapshot.
//!
//! # Admission
//!
//! A new channel is checked against the denylist before anything else. A
//! denied channel gets a `kicked` notice and is never registered. An
//! admitted channel is registered, receives `init-clipboards`, and every
//! device (the new one included) receives `devices-updated`.
//!
//! # Forced closes
//!
//! Kick and admin ban queue [`Outbound::Kick`] on the affected channels,
//! drop the hub's handle, and unregister the session right away. The
//! `Disconnected` message that follows from the channel task is then a
//! no-op and does not broadcast a second time.

use crate::errors::HubError;
use crate::models::{ContentEntry, DenialView, EndpointSession, Metadata};
use crate::observability::metrics;
use crate::protocol::{admin_ban_reason, KickNotice, ServerEvent, KICKED_REASON, REJECTED_BANNED_REASON};
use crate::store::guard::{validate_ban_hours, KICK_BAN_HOURS};
use crate::store::{AccessGuard, ContentStore, SessionRegistry};

use super::messages::{Admission, ChannelHandle, HubMessage, HubStatus};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the hub mailbox.
const HUB_CHANNEL_BUFFER: usize = 1000;

/// Message returned to a device whose kick target is not connected.
pub const KICK_NOT_FOUND_MESSAGE: &str = "Device not found or already disconnected";

/// Source of the current time. Injected so expiry can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Handle to the `HubActor`.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubMessage>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("closed", &self.sender.is_closed())
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl HubHandle {
    /// Ask the hub to admit a new channel.
    pub async fn admit(&self, channel: ChannelHandle) -> Result<Admission, HubError> {
        self.request(|respond_to| HubMessage::Admit {
            channel,
            respond_to,
        })
        .await
    }

    /// Attach device metadata to a session.
    pub async fn attach_metadata(
        &self,
        session_id: String,
        metadata: Metadata,
    ) -> Result<(), HubError> {
        self.notify(HubMessage::AttachMetadata {
            session_id,
            metadata,
        })
        .await
    }

    /// Report that a channel closed.
    pub async fn disconnected(&self, session_id: String) -> Result<(), HubError> {
        self.notify(HubMessage::Disconnected { session_id }).await
    }

    /// Insert or update a clipboard entry and broadcast the result.
    pub async fn upsert_content(
        &self,
        id: String,
        content: String,
        name: Option<String>,
    ) -> Result<(), HubError> {
        self.request(|respond_to| HubMessage::UpsertContent {
            id,
            content,
            name,
            respond_to,
        })
        .await
    }

    /// Remove a clipboard entry and broadcast the result.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Forbidden`] for the default entry.
    pub async fn remove_content(&self, id: String) -> Result<(), HubError> {
        self.request(|respond_to| HubMessage::RemoveContent { id, respond_to })
            .await?
    }

    pub async fn list_content(&self) -> Result<Vec<ContentEntry>, HubError> {
        self.request(|respond_to| HubMessage::ListContent { respond_to })
            .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<EndpointSession>, HubError> {
        self.request(|respond_to| HubMessage::ListSessions { respond_to })
            .await
    }

    /// Close one device and deny its address for 24 hours.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if no live channel has this id.
    pub async fn kick(&self, session_id: String) -> Result<(), HubError> {
        self.request(|respond_to| HubMessage::Kick {
            session_id,
            respond_to,
        })
        .await?
    }

    /// Deny `ip` for `hours` and close every device connected from it.
    ///
    /// Returns how many channels were closed.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for a duration outside 1..=720 hours.
    pub async fn ban(&self, ip: String, hours: f64) -> Result<usize, HubError> {
        self.request(|respond_to| HubMessage::Ban {
            ip,
            hours,
            respond_to,
        })
        .await?
    }

    /// Lift the denial on `ip`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the address is not denied.
    pub async fn unban(&self, ip: String) -> Result<(), HubError> {
        self.request(|respond_to| HubMessage::Unban { ip, respond_to })
            .await?
    }

    pub async fn list_denials(&self) -> Result<Vec<DenialView>, HubError> {
        self.request(|respond_to| HubMessage::ListDenials { respond_to })
            .await
    }

    pub async fn status(&self) -> Result<HubStatus, HubError> {
        self.request(|respond_to| HubMessage::GetStatus { respond_to })
            .await
    }

    /// Child token for tasks that should stop with the hub.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Stop the hub.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubMessage,
    ) -> Result<T, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| HubError::Internal(format!("response receive failed: {e}")))
    }

    async fn notify(&self, message: HubMessage) -> Result<(), HubError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| HubError::Internal(format!("channel send failed: {e}")))
    }
}

/// The hub actor. See the module docs.
pub struct HubActor {
    receiver: mpsc::Receiver<HubMessage>,
    cancel_token: CancellationToken,
    content: ContentStore,
    sessions: SessionRegistry,
    guard: AccessGuard,
    channels: HashMap<String, ChannelHandle>,
    clock: Clock,
    messages_processed: u64,
}

impl HubActor {
    /// Spawn the hub on the wall clock.
    pub fn spawn(cancel_token: CancellationToken) -> (HubHandle, JoinHandle<()>) {
        Self::spawn_with_clock(cancel_token, system_clock())
    }

    /// Spawn the hub with an injected clock.
    pub fn spawn_with_clock(
        cancel_token: CancellationToken,
        clock: Clock,
    ) -> (HubHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(HUB_CHANNEL_BUFFER);

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            content: ContentStore::new(),
            sessions: SessionRegistry::new(),
            guard: AccessGuard::new(),
            channels: HashMap::new(),
            clock,
            messages_processed: 0,
        };

        let task_handle = tokio::spawn(actor.run());

        (
            HubHandle {
                sender,
                cancel_token,
            },
            task_handle,
        )
    }

    #[instrument(skip_all, name = "hub.actor.hub")]
    async fn run(mut self) {
        info!(target: "hub.actor.hub", "HubActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "hub.actor.hub",
                        "HubActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.messages_processed += 1;
                        }
                        None => {
                            info!(
                                target: "hub.actor.hub",
                                "HubActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        // Dropping the handles ends every channel task's outbound stream.
        self.channels.clear();

        info!(
            target: "hub.actor.hub",
            sessions = self.sessions.len(),
            messages_processed = self.messages_processed,
            "HubActor stopped"
        );
    }

    fn handle_message(&mut self, message: HubMessage) {
        match message {
            HubMessage::Admit {
                channel,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_admit(channel));
            }

            HubMessage::AttachMetadata {
                session_id,
                metadata,
            } => self.handle_attach_metadata(&session_id, metadata),

            HubMessage::Disconnected { session_id } => self.handle_disconnected(&session_id),

            HubMessage::UpsertContent {
                id,
                content,
                name,
                respond_to,
            } => {
                self.content.upsert(id, content, name);
                metrics::record_content_mutation("upsert");
                self.broadcast(&ServerEvent::ClipboardUpdated(self.content.snapshot()));
                let _ = respond_to.send(());
            }

            HubMessage::RemoveContent { id, respond_to } => {
                let result = self.content.remove(&id).map(|_| ());
                if result.is_ok() {
                    metrics::record_content_mutation("remove");
                    self.broadcast(&ServerEvent::ClipboardUpdated(self.content.snapshot()));
                }
                let _ = respond_to.send(result);
            }

            HubMessage::ListContent { respond_to } => {
                let _ = respond_to.send(self.content.snapshot());
            }

            HubMessage::ListSessions { respond_to } => {
                let _ = respond_to.send(self.sessions.snapshot());
            }

            HubMessage::Kick {
                session_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_kick(&session_id));
            }

            HubMessage::Ban {
                ip,
                hours,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_ban(&ip, hours));
            }

            HubMessage::Unban { ip, respond_to } => {
                let result = self.guard.unban(&ip);
                if result.is_ok() {
                    info!(target: "hub.actor.hub", ip = %ip, "Address unbanned");
                    metrics::set_denylist_entries(self.guard.len());
                }
                let _ = respond_to.send(result);
            }

            HubMessage::ListDenials { respond_to } => {
                let _ = respond_to.send(self.guard.list_active(self.now()));
            }

            HubMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(HubStatus {
                    content_entries: self.content.list().len(),
                    sessions: self.sessions.len(),
                    channels: self.channels.len(),
                    denials: self.guard.len(),
                    messages_processed: self.messages_processed,
                });
            }
        }
    }

    fn handle_admit(&mut self, channel: ChannelHandle) -> Admission {
        let now = self.now();

        if self.guard.is_blocked(channel.ip(), now) {
            info!(
                target: "hub.actor.hub",
                session_id = %channel.session_id(),
                ip = %channel.ip(),
                "Admission rejected, address is banned"
            );
            metrics::record_admission("rejected");
            return Admission::Rejected(KickNotice {
                reason: REJECTED_BANNED_REASON.to_string(),
            });
        }

        let session_id = channel.session_id().to_string();
        self.sessions.register(&session_id, channel.ip(), now);
        channel.send(ServerEvent::InitClipboards(self.content.snapshot()));
        self.channels.insert(session_id.clone(), channel);

        info!(
            target: "hub.actor.hub",
            session_id = %session_id,
            sessions = self.sessions.len(),
            "Device admitted"
        );
        metrics::record_admission("accepted");
        metrics::set_connected_sessions(self.sessions.len());

        self.broadcast_sessions();
        Admission::Accepted
    }

    fn handle_attach_metadata(&mut self, session_id: &str, metadata: Metadata) {
        let Some(ip) = self.channels.get(session_id).map(|c| c.ip().to_string()) else {
            // Metadata from a channel the hub already closed.
            debug!(
                target: "hub.actor.hub",
                session_id = %session_id,
                "Ignoring metadata for unknown session"
            );
            return;
        };

        let now = self.now();
        self.sessions.attach_metadata(session_id, &ip, metadata, now);
        metrics::set_connected_sessions(self.sessions.len());
        self.broadcast_sessions();
    }

    fn handle_disconnected(&mut self, session_id: &str) {
        self.channels.remove(session_id);

        if self.sessions.unregister(session_id) {
            info!(
                target: "hub.actor.hub",
                session_id = %session_id,
                sessions = self.sessions.len(),
                "Device disconnected"
            );
            metrics::set_connected_sessions(self.sessions.len());
            self.broadcast_sessions();
        }
    }

    fn handle_kick(&mut self, session_id: &str) -> Result<(), HubError> {
        let Some(channel) = self.channels.remove(session_id) else {
            metrics::record_kick("not_found");
            return Err(HubError::NotFound(KICK_NOT_FOUND_MESSAGE.to_string()));
        };

        let now = self.now();
        self.guard.ban(channel.ip(), KICK_BAN_HOURS, now)?;
        metrics::record_ban("kick", "applied");
        metrics::set_denylist_entries(self.guard.len());

        channel.kick(KickNotice {
            reason: KICKED_REASON.to_string(),
        });
        metrics::record_kick("success");
        metrics::record_forced_closes(1);

        info!(
            target: "hub.actor.hub",
            session_id = %session_id,
            ip = %channel.ip(),
            "Device kicked, address banned for 24 hours"
        );

        self.sessions.unregister(session_id);
        metrics::set_connected_sessions(self.sessions.len());
        self.broadcast_sessions();
        Ok(())
    }

    fn handle_ban(&mut self, ip: &str, hours: f64) -> Result<usize, HubError> {
        let hours = match validate_ban_hours(hours) {
            Ok(hours) => hours,
            Err(e) => {
                metrics::record_ban("admin", "invalid");
                return Err(e);
            }
        };

        let now = self.now();
        self.guard.ban(ip, hours, now)?;
        metrics::record_ban("admin", "applied");
        metrics::set_denylist_entries(self.guard.len());

        let reason = admin_ban_reason(hours);
        let mut closed = 0;
        let mut registry_changed = false;
        for session_id in self.sessions.ids_for_ip(ip) {
            if let Some(channel) = self.channels.remove(&session_id) {
                channel.kick(KickNotice {
                    reason: reason.clone(),
                });
                closed += 1;
            }
            registry_changed |= self.sessions.unregister(&session_id);
        }

        info!(
            target: "hub.actor.hub",
            ip = %ip,
            hours = hours,
            closed = closed,
            "Address banned"
        );

        if closed > 0 {
            metrics::record_forced_closes(closed);
        }
        if registry_changed {
            metrics::set_connected_sessions(self.sessions.len());
            self.broadcast_sessions();
        }
        Ok(closed)
    }

    fn broadcast_sessions(&mut self) {
        let event = ServerEvent::DevicesUpdated(self.sessions.snapshot());
        self.broadcast(&event);
    }

    /// Queue `event` on every registered channel.
    fn broadcast(&mut self, event: &ServerEvent) {
        let mut delivered = 0;
        let mut gone = Vec::new();

        for session in self.sessions.list() {
            match self.channels.get(&session.session_id) {
                Some(channel) if channel.send(event.clone()) => delivered += 1,
                Some(_) => gone.push(session.session_id.clone()),
                None => {}
            }
        }

        for session_id in gone {
            // The channel task ended; its Disconnected message will follow.
            warn!(
                target: "hub.actor.hub",
                session_id = %session_id,
                event = event.name(),
                "Dropping event for closed channel"
            );
            self.channels.remove(&session_id);
        }

        metrics::record_broadcast(event.name(), delivered);
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
