//! Reward-claim DTOs for the admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{ClaimId, ClaimStatus, MemberId, RewardClaim};
use crate::service::ClaimDetails;

/// A reward claim as exposed over the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimDto {
    /// Claim identifier.
    #[schema(value_type = uuid::Uuid)]
    pub claim_id: ClaimId,
    /// Owning member.
    #[schema(value_type = uuid::Uuid)]
    pub member_id: MemberId,
    /// Rewarded level (1, 3, 5, or 7).
    pub level: u32,
    /// Current lifecycle state.
    #[schema(value_type = String, example = "pending")]
    pub status: ClaimStatus,
    /// Admin note, when set.
    pub note: Option<String>,
    /// Creation timestamp.
    pub claimed_at: DateTime<Utc>,
    /// Last admin-transition timestamp.
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<RewardClaim> for ClaimDto {
    fn from(claim: RewardClaim) -> Self {
        Self {
            claim_id: claim.id,
            member_id: claim.member_id,
            level: claim.level,
            status: claim.status,
            note: claim.note,
            claimed_at: claim.claimed_at,
            processed_at: claim.processed_at,
        }
    }
}

/// A claim joined with member contact info for the admin list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimDetailDto {
    /// The claim.
    #[serde(flatten)]
    pub claim: ClaimDto,
    /// Owner's display name, when the member is still known.
    pub member_name: Option<String>,
    /// Owner's referral code, when the member is still known.
    pub referral_code: Option<String>,
}

impl From<ClaimDetails> for ClaimDetailDto {
    fn from(details: ClaimDetails) -> Self {
        Self {
            claim: details.claim.into(),
            member_name: details.member_name,
            referral_code: details.referral_code,
        }
    }
}

/// Query parameters for `GET /admin/claims`.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct ClaimListParams {
    /// Filter by status (`pending`, `approved`, `delivered`).
    #[serde(default)]
    pub status: Option<String>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl ClaimListParams {
    /// Clamps `page` to at least 1 and `per_page` to 1..=100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            status: self.status.clone(),
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }
}

/// Paginated list response for `GET /admin/claims`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimListResponse {
    /// Claim rows with member info joined in.
    pub data: Vec<ClaimDetailDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `PUT /admin/claims`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionClaimRequest {
    /// Claim to transition.
    #[schema(value_type = uuid::Uuid)]
    pub claim_id: ClaimId,
    /// Target status (`approved` or `delivered`).
    pub status: String,
    /// Optional admin note, recorded on approval.
    #[serde(default)]
    pub note: Option<String>,
}
