//! In-memory state owned by the hub actor.
//!
//! Each collection is a plain, synchronous service type. None of them is
//! shared directly: the [`crate::actors::HubActor`] owns all three and is the
//! only writer.
//!
//! - [`content::ContentStore`] - ordered clipboard entries
//! - [`sessions::SessionRegistry`] - connected devices
//! - [`guard::AccessGuard`] - IP denylist with lazy expiry

pub mod content;
pub mod guard;
pub mod sessions;

pub use content::ContentStore;
pub use guard::AccessGuard;
pub use sessions::SessionRegistry;
