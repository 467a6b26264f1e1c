//! Network read handlers: member dashboard and admin graph.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{DashboardResponse, GraphNodeDto};
use crate::app_state::AppState;
use crate::domain::MemberId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /network/dashboard/{member_id}` — A member's own network stats.
///
/// # Errors
///
/// Returns [`GatewayError::MemberNotFound`] if the member does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/network/dashboard/{member_id}",
    tag = "Network",
    summary = "Member dashboard",
    description = "Returns the seven-level stat table, total team size, and direct referrals for a member. A data-integrity anomaly in the subtree is served as a partial, cycle-free result.",
    params(
        ("member_id" = uuid::Uuid, Path, description = "Member UUID"),
    ),
    responses(
        (status = 200, description = "Dashboard payload", body = DashboardResponse),
        (status = 404, description = "Member not found", body = ErrorResponse),
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(member_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let dashboard = state
        .network_service
        .member_dashboard(MemberId::from_uuid(member_id))
        .await?;
    Ok(Json(DashboardResponse::from(dashboard)))
}

/// `GET /network/graph/{member_id}` — Recursive visualization payload.
///
/// # Errors
///
/// Returns [`GatewayError::MemberNotFound`] if the root does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/network/graph/{member_id}",
    tag = "Network",
    summary = "Network graph",
    description = "Returns the node/edge payload for an admin-selected root, hard-capped at seven levels to bound response size.",
    params(
        ("member_id" = uuid::Uuid, Path, description = "Root member UUID"),
    ),
    responses(
        (status = 200, description = "Graph payload", body = GraphNodeDto),
        (status = 404, description = "Member not found", body = ErrorResponse),
    )
)]
pub async fn get_graph(
    State(state): State<AppState>,
    Path(member_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let graph = state
        .network_service
        .network_graph(MemberId::from_uuid(member_id))
        .await?;
    Ok(Json(GraphNodeDto::from(graph)))
}

/// Network read routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/network/dashboard/{member_id}", get(get_dashboard))
        .route("/network/graph/{member_id}", get(get_graph))
}
