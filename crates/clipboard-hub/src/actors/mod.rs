//! Actor model for the hub.
//!
//! - [`HubActor`]: single writer for clipboard entries, sessions and the denylist
//! - [`serve_channel`]: one task per device channel
//!
//! Handles communicate with actors via `tokio::sync::mpsc`; request-reply
//! uses `oneshot`. Cancellation flows from the hub's token to every channel.

pub mod connection;
pub mod hub;
pub mod messages;

pub use connection::{serve_channel, ChannelSession};
pub use hub::{system_clock, Clock, HubActor, HubHandle, KICK_NOT_FOUND_MESSAGE};
pub use messages::{Admission, ChannelHandle, HubMessage, HubStatus, Outbound};
