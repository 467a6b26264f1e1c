//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams network events in real time,
//! filtered by per-connection member subscriptions.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
