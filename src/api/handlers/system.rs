//! System endpoints: health check and reward-level catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::{REWARDED_LEVELS, level_target};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Reward level info.
#[derive(Debug, Serialize, ToSchema)]
struct RewardLevelInfo {
    level: u32,
    target: u64,
    rewarded: bool,
}

/// `GET /config/levels` — The seven levels and their targets.
#[utoipa::path(
    get,
    path = "/config/levels",
    tag = "System",
    summary = "List network levels",
    description = "Returns each level's completion target and whether completing it carries a reward.",
    responses(
        (status = 200, description = "Level catalog", body = Vec<RewardLevelInfo>),
    )
)]
pub async fn levels_handler() -> impl IntoResponse {
    let levels: Vec<RewardLevelInfo> = (1..=7)
        .map(|level| RewardLevelInfo {
            level,
            target: level_target(level),
            rewarded: REWARDED_LEVELS.contains(&level),
        })
        .collect();
    (StatusCode::OK, Json(levels))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/levels", get(levels_handler))
}
