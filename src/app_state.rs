//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::NetworkService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Network service for enrollment, dashboards, and claim access.
    pub network_service: Arc<NetworkService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
