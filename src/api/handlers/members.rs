//! Membership write handlers: enrollment and qualification.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ClaimDto, EnrollMemberRequest, EnrollMemberResponse, QualifyResponse};
use crate::app_state::AppState;
use crate::domain::MemberId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /members` — Enroll a new member.
///
/// # Errors
///
/// Returns [`GatewayError`] on an empty name or unknown sponsor code.
#[utoipa::path(
    post,
    path = "/api/v1/members",
    tag = "Members",
    summary = "Enroll a member",
    description = "Creates a member, issues a referral code, and attaches the sponsor link when a sponsor code is given. The sponsor link is refused if it would violate the referral forest.",
    request_body = EnrollMemberRequest,
    responses(
        (status = 201, description = "Member enrolled", body = EnrollMemberResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Sponsor code not recognized", body = ErrorResponse),
    )
)]
pub async fn enroll_member(
    State(state): State<AppState>,
    Json(req): Json<EnrollMemberRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let member = state
        .network_service
        .enroll_member(&req.full_name, req.sponsor_code.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(EnrollMemberResponse::from(member))))
}

/// `POST /members/{id}/qualify` — Record a qualifying purchase.
///
/// External purchase webhook: flags the member as a qualifying network
/// member and re-evaluates reward claims up the sponsor chain.
///
/// # Errors
///
/// Returns [`GatewayError::MemberNotFound`] if the member does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/members/{id}/qualify",
    tag = "Members",
    summary = "Mark a member as qualifying",
    description = "Idempotent: repeating the call qualifies nothing new and creates no duplicate claims. Returns the claims created across the member and its ancestors.",
    params(
        ("id" = uuid::Uuid, Path, description = "Member UUID"),
    ),
    responses(
        (status = 200, description = "Qualification recorded", body = QualifyResponse),
        (status = 404, description = "Member not found", body = ErrorResponse),
    )
)]
pub async fn qualify_member(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let member_id = MemberId::from_uuid(id);
    let created = state.network_service.record_qualification(member_id).await?;
    Ok(Json(QualifyResponse {
        member_id,
        claims_created: created.into_iter().map(ClaimDto::from).collect(),
    }))
}

/// Membership write routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/members", post(enroll_member))
        .route("/members/{id}/qualify", post(qualify_member))
}
