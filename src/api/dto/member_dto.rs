//! Enrollment and qualification DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claim_dto::ClaimDto;
use crate::domain::{Member, MemberId};

/// Request body for `POST /members`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollMemberRequest {
    /// Display name of the new member.
    pub full_name: String,
    /// Referral code of the sponsoring member, if any.
    #[serde(default)]
    pub sponsor_code: Option<String>,
}

/// Response body for `POST /members` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollMemberResponse {
    /// New member identifier.
    #[schema(value_type = uuid::Uuid)]
    pub member_id: MemberId,
    /// Display name echoed from the request.
    pub full_name: String,
    /// Referral code issued to the member.
    pub referral_code: String,
    /// Sponsor resolved from the request code, if any.
    #[schema(value_type = Option<uuid::Uuid>)]
    pub sponsor_id: Option<MemberId>,
    /// Enrollment timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<Member> for EnrollMemberResponse {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.id,
            full_name: member.full_name,
            referral_code: member.referral_code,
            sponsor_id: member.sponsor_id,
            joined_at: member.joined_at,
        }
    }
}

/// Response body for `POST /members/{id}/qualify`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QualifyResponse {
    /// The member that qualified.
    #[schema(value_type = uuid::Uuid)]
    pub member_id: MemberId,
    /// Claims created across the member and its ancestors by this
    /// qualification (empty when nothing newly completed).
    pub claims_created: Vec<ClaimDto>,
}
