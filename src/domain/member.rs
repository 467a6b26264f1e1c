//! Member identity and membership facts.
//!
//! [`MemberId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that member identifiers cannot be confused with other
//! UUIDs. [`Member`] carries the persisted membership facts the network
//! engine reads: the sponsor link, the qualifying-member flag, and the
//! referral code used to attribute new signups.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a member.
///
/// Wraps a UUID v4. Generated once at enrollment and immutable thereafter.
/// Used as the dictionary key in [`super::MemberDirectory`], as the
/// adjacency-index key, and as the WebSocket subscription target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(uuid::Uuid);

impl MemberId {
    /// Creates a new random `MemberId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `MemberId` from an existing [`uuid::Uuid`].
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

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for MemberId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<MemberId> for uuid::Uuid {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

/// Length of a generated referral code.
const REFERRAL_CODE_LEN: usize = 8;

/// Generates a unique, immutable referral code for a new member.
///
/// Derived from a fresh UUID v4: the first eight hex characters, uppercased.
/// Uniqueness is enforced by the directory on insert; a collision on
/// 32 random bits is treated like any other duplicate-code rejection.
#[must_use]
pub fn generate_referral_code() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(REFERRAL_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Persisted membership facts for one member.
///
/// The sponsor link is a weak reference: removing a member never cascades
/// to its sponsees. `referral_code` and `joined_at` are immutable after
/// enrollment; `is_network_member` flips to `true` exactly once, on the
/// first qualifying purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique member identifier (immutable after enrollment).
    pub id: MemberId,

    /// Display name supplied at enrollment.
    pub full_name: String,

    /// Unique referral code used to attribute new signups to this member.
    pub referral_code: String,

    /// The member who referred this one; `None` for forest roots.
    pub sponsor_id: Option<MemberId>,

    /// `true` once the member has made a qualifying purchase. Only
    /// qualifying members are counted in level aggregation.
    pub is_network_member: bool,

    /// Enrollment timestamp (immutable).
    pub joined_at: DateTime<Utc>,

    /// When the member first became a qualifying network member.
    pub qualified_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Creates a new, unsponsored, not-yet-qualifying member.
    #[must_use]
    pub fn new(full_name: String) -> Self {
        Self {
            id: MemberId::new(),
            full_name,
            referral_code: generate_referral_code(),
            sponsor_id: None,
            is_network_member: false,
            joined_at: Utc::now(),
            qualified_at: None,
        }
    }
}

/// Lightweight member projection for list and graph payloads.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    /// Member identifier.
    pub id: MemberId,
    /// Display name.
    pub full_name: String,
    /// Whether the member is a qualifying network member.
    pub is_network_member: bool,
    /// Enrollment timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            full_name: member.full_name.clone(),
            is_network_member: member.is_network_member,
            joined_at: member.joined_at,
        }
    }
}
