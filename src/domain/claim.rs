//! Reward claims and their state machine.
//!
//! A claim is born `Pending` the first time a rewarded level completes for
//! a member, moves to `Approved` and then `Delivered` by admin action only,
//! and is immutable once delivered. The legal edges are encoded in
//! [`ClaimStatus::can_transition_to`]; everything else is rejected.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::member::MemberId;

/// Unique identifier for a reward claim.
///
/// Wraps a UUID v4, generated at claim creation and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(uuid::Uuid);

impl ClaimId {
    /// Creates a new random `ClaimId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ClaimId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a reward claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Created automatically on level completion; awaiting admin review.
    Pending,
    /// Admin approved the claim; reward is being arranged.
    Approved,
    /// Reward handed over. Terminal.
    Delivered,
}

impl ClaimStatus {
    /// Returns `true` if the state machine permits moving to `next`.
    ///
    /// The only legal edges are `Pending → Approved` and
    /// `Approved → Delivered`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Approved, Self::Delivered)
        )
    }

    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "delivered" => Ok(Self::Delivered),
            other => Err(format!("unknown claim status: {other}")),
        }
    }
}

/// A levelled reward moving through the claim lifecycle.
///
/// At most one claim exists per `(member_id, level)` pair; the ledger
/// enforces this at creation. `version` is the optimistic-concurrency
/// counter bumped on every status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    /// Unique claim identifier.
    pub id: ClaimId,
    /// Owning member (immutable).
    pub member_id: MemberId,
    /// The rewarded level (1, 3, 5, or 7) that triggered eligibility.
    pub level: u32,
    /// Current lifecycle state.
    pub status: ClaimStatus,
    /// Optional admin note, set on approval.
    pub note: Option<String>,
    /// When the claim was created.
    pub claimed_at: DateTime<Utc>,
    /// When the claim was last moved by an admin.
    pub processed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version, bumped on every transition.
    pub version: i64,
}

impl RewardClaim {
    /// Creates a fresh `Pending` claim for a member and level.
    #[must_use]
    pub fn pending(member_id: MemberId, level: u32) -> Self {
        Self {
            id: ClaimId::new(),
            member_id,
            level,
            status: ClaimStatus::Pending,
            note: None,
            claimed_at: Utc::now(),
            processed_at: None,
            version: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_only() {
        use ClaimStatus::{Approved, Delivered, Pending};

        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Approved));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Approved));
        assert!(!Delivered.can_transition_to(Delivered));
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ClaimStatus::Pending,
            ClaimStatus::Approved,
            ClaimStatus::Delivered,
        ] {
            let parsed: Result<ClaimStatus, _> = status.as_str().parse();
            assert_eq!(parsed.ok(), Some(status));
        }
        assert!("refunded".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn pending_claim_starts_unprocessed() {
        let claim = RewardClaim::pending(MemberId::new(), 3);
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.level, 3);
        assert!(claim.note.is_none());
        assert!(claim.processed_at.is_none());
        assert_eq!(claim.version, 0);
    }

    #[test]
    fn claim_serializes_snake_case_status() {
        let claim = RewardClaim::pending(MemberId::new(), 1);
        let json = serde_json::to_string(&claim).unwrap_or_default();
        assert!(json.contains("\"pending\""));
    }
}
