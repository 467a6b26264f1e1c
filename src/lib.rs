//! # referral-gateway
//!
//! REST API and WebSocket gateway for a multi-level referral network engine.
//!
//! This crate tracks a referral forest of members, aggregates each member's
//! team across seven levels with geometric completion targets, and drives
//! reward claims through a guarded lifecycle. HTTP handlers expose the
//! member dashboard, the admin graph and claim surfaces, and a WebSocket
//! endpoint streams network events.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── NetworkService / ClaimService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── MemberDirectory / ClaimLedger (domain/)
//!     ├── AdjacencyIndex + level aggregation (domain/)
//!     │
//!     └── PostgreSQL Persistence (optional write-through)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
