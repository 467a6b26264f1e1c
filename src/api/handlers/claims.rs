//! Admin claim handlers: list and transition.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    ClaimDetailDto, ClaimDto, ClaimListParams, ClaimListResponse, PaginationMeta,
    TransitionClaimRequest,
};
use crate::app_state::AppState;
use crate::domain::ClaimStatus;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /admin/claims` — Paginated claim list with member info.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an unknown status filter.
#[utoipa::path(
    get,
    path = "/api/v1/admin/claims",
    tag = "Claims",
    summary = "List reward claims",
    description = "Returns claims newest first, optionally filtered by status, with member name and referral code joined in.",
    params(ClaimListParams),
    responses(
        (status = 200, description = "Paginated claim list", body = ClaimListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
    )
)]
pub async fn list_claims(
    State(state): State<AppState>,
    Query(params): Query<ClaimListParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let params = params.clamped();
    let status_filter = params
        .status
        .as_deref()
        .map(str::parse::<ClaimStatus>)
        .transpose()
        .map_err(GatewayError::InvalidRequest)?;

    let details = state
        .network_service
        .claim_service()
        .list_claims(status_filter)
        .await;

    let page = params.page;
    let per_page = params.per_page;
    let total = details.len() as u32;
    let total_pages = if total == 0 {
        0
    } else {
        total.div_ceil(per_page)
    };

    // Offset math in u64: a crafted page near u32::MAX must yield an
    // empty page, not an overflow panic.
    let start = usize::try_from(u64::from(page - 1) * u64::from(per_page)).unwrap_or(usize::MAX);
    let data: Vec<ClaimDetailDto> = details
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .map(ClaimDetailDto::from)
        .collect();

    Ok(Json(ClaimListResponse {
        data,
        pagination: PaginationMeta {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// `PUT /admin/claims` — Transition a claim.
///
/// # Errors
///
/// Returns [`GatewayError::ClaimNotFound`] if the claim is absent,
/// [`GatewayError::InvalidTransition`] for an illegal move, or
/// [`GatewayError::ConcurrencyConflict`] after the automatic retry.
#[utoipa::path(
    put,
    path = "/api/v1/admin/claims",
    tag = "Claims",
    summary = "Transition a reward claim",
    description = "Drives the claim lifecycle: pending → approved (with an optional note) → delivered. Any other move is rejected with a typed error.",
    request_body = TransitionClaimRequest,
    responses(
        (status = 200, description = "Claim transitioned", body = ClaimDto),
        (status = 404, description = "Claim not found", body = ErrorResponse),
        (status = 409, description = "Illegal transition or concurrent update", body = ErrorResponse),
    )
)]
pub async fn transition_claim(
    State(state): State<AppState>,
    Json(req): Json<TransitionClaimRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let target: ClaimStatus = req
        .status
        .parse()
        .map_err(GatewayError::InvalidRequest)?;

    let claim_service = state.network_service.claim_service();
    let updated = match target {
        ClaimStatus::Approved => claim_service.approve(req.claim_id, req.note).await?,
        ClaimStatus::Delivered => claim_service.mark_delivered(req.claim_id).await?,
        ClaimStatus::Pending => {
            let current = claim_service.get_claim(req.claim_id).await?;
            return Err(GatewayError::InvalidTransition {
                from: current.status.to_string(),
                to: ClaimStatus::Pending.to_string(),
            });
        }
    };

    Ok(Json(ClaimDto::from(updated)))
}

/// Admin claim routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/claims", get(list_claims).put(transition_claim))
}
