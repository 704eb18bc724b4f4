//! Clipboard Hub Library
//!
//! A real-time shared clipboard: devices connect over WebSocket, edit a
//! small set of named clipboard entries, and receive the full state after
//! every change. Administrators can kick devices and ban addresses.
//!
//! # Architecture
//!
//! All shared state lives in one actor; handlers and device channels talk
//! to it through a handle:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> actors::HubHandle -> actors::HubActor -> store/*.rs
//!                   handlers/ws.rs -> actors::serve_channel ----^
//! ```
//!
//! # Modules
//!
//! - `actors` - Hub actor and per-device channel tasks
//! - `config` - Service configuration from environment and command line
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Basic auth for `/admin`
//! - `models` - Data models
//! - `observability` - Health probes and metrics
//! - `protocol` - Device channel wire format
//! - `routes` - Axum router setup
//! - `store` - Content store, session registry and IP denylist

pub mod actors;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod protocol;
pub mod routes;
pub mod store;
