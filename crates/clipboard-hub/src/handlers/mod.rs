//! HTTP request handlers for Clipboard Hub.

pub mod admin;
pub mod content;
pub mod ws;

pub use admin::{add_to_blacklist, list_blacklist, list_devices, remove_from_blacklist};
pub use content::{delete_clipboard, list_clipboards, upsert_clipboard};
pub use ws::{resolve_client_ip, ws_upgrade};
