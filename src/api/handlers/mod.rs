//! REST endpoint handlers organized by resource.

pub mod claims;
pub mod members;
pub mod network;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(members::routes())
        .merge(network::routes())
        .merge(claims::routes())
}
