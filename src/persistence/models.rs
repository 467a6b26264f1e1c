//! Database models for members, claims, and the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ClaimId, Member, MemberId, RewardClaim};
use crate::error::GatewayError;

/// A member row from the `members` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRow {
    /// Member UUID.
    pub id: Uuid,
    /// Display name.
    pub full_name: String,
    /// Unique referral code.
    pub referral_code: String,
    /// Sponsor UUID; `None` for forest roots.
    pub sponsor_id: Option<Uuid>,
    /// Qualifying-member flag.
    pub is_network_member: bool,
    /// Enrollment timestamp.
    pub joined_at: DateTime<Utc>,
    /// First qualification timestamp.
    pub qualified_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: MemberId::from_uuid(row.id),
            full_name: row.full_name,
            referral_code: row.referral_code,
            sponsor_id: row.sponsor_id.map(MemberId::from_uuid),
            is_network_member: row.is_network_member,
            joined_at: row.joined_at,
            qualified_at: row.qualified_at,
        }
    }
}

/// A reward-claim row from the `reward_claims` table.
///
/// The table carries a unique constraint on `(member_id, level)`; the
/// conditional insert in the store leans on it for exactly-once creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRow {
    /// Claim UUID.
    pub id: Uuid,
    /// Owning member UUID.
    pub member_id: Uuid,
    /// Rewarded level (1, 3, 5, or 7).
    pub level: i32,
    /// Status string (`pending`, `approved`, `delivered`).
    pub status: String,
    /// Optional admin note.
    pub note: Option<String>,
    /// Claim creation timestamp.
    pub claimed_at: DateTime<Utc>,
    /// Last admin-transition timestamp.
    pub processed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version.
    pub version: i64,
}

impl TryFrom<ClaimRow> for RewardClaim {
    type Error = GatewayError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(GatewayError::DataIntegrity)?;
        let level = u32::try_from(row.level).map_err(|_| {
            GatewayError::DataIntegrity(format!("claim {} has negative level", row.id))
        })?;
        Ok(Self {
            id: ClaimId::from_uuid(row.id),
            member_id: MemberId::from_uuid(row.member_id),
            level,
            status,
            note: row.note,
            claimed_at: row.claimed_at,
            processed_at: row.processed_at,
            version: row.version,
        })
    }
}

/// A stored event row from the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Member the event concerns.
    pub member_id: Uuid,
    /// Event type discriminator (e.g. `"claim_created"`).
    pub event_type: String,
    /// JSONB payload with event-specific data.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
