//! Claim store with atomic per-`(member, level)` uniqueness.
//!
//! [`ClaimLedger`] is the in-memory claim store. Creation is keyed on
//! `(member_id, level)` and runs check-then-insert under one write lock,
//! so concurrent evaluations of the same member produce exactly one claim.
//! Status transitions are guarded by both the current status and an
//! optimistic version counter.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::claim::{ClaimId, ClaimStatus, RewardClaim};
use super::member::MemberId;
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct LedgerInner {
    by_member_level: HashMap<(MemberId, u32), RewardClaim>,
    by_id: HashMap<ClaimId, (MemberId, u32)>,
}

/// Central store for all reward claims.
#[derive(Debug, Default)]
pub struct ClaimLedger {
    inner: RwLock<LedgerInner>,
}

impl ClaimLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `Pending` claim for `(member_id, level)` unless one
    /// already exists.
    ///
    /// Returns the new claim, or `None` when the pair is already claimed.
    /// The existence check and the insert are one atomic step under the
    /// write lock, which is what makes claim creation idempotent and safe
    /// under concurrent evaluation.
    pub async fn create_if_absent(&self, member_id: MemberId, level: u32) -> Option<RewardClaim> {
        let mut inner = self.inner.write().await;
        let key = (member_id, level);
        if inner.by_member_level.contains_key(&key) {
            return None;
        }
        let claim = RewardClaim::pending(member_id, level);
        inner.by_id.insert(claim.id, key);
        inner.by_member_level.insert(key, claim.clone());
        Some(claim)
    }

    /// Returns a copy of the claim with the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClaimNotFound`] if no such claim exists.
    pub async fn get(&self, claim_id: ClaimId) -> Result<RewardClaim, GatewayError> {
        let inner = self.inner.read().await;
        inner
            .by_id
            .get(&claim_id)
            .and_then(|key| inner.by_member_level.get(key))
            .cloned()
            .ok_or(GatewayError::ClaimNotFound(*claim_id.as_uuid()))
    }

    /// Inserts an existing claim record as-is.
    ///
    /// Startup rehydration only; normal creation goes through
    /// [`ClaimLedger::create_if_absent`]. Returns `false` (and leaves the
    /// ledger unchanged) when the `(member, level)` pair is already present.
    pub async fn restore(&self, claim: RewardClaim) -> bool {
        let mut inner = self.inner.write().await;
        let key = (claim.member_id, claim.level);
        if inner.by_member_level.contains_key(&key) {
            return false;
        }
        inner.by_id.insert(claim.id, key);
        inner.by_member_level.insert(key, claim);
        true
    }

    /// Applies a status- and version-guarded transition to a claim.
    ///
    /// The note, if given, is recorded on the claim (admin free text set
    /// at approval). `processed_at` is stamped on every transition.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ClaimNotFound`] if the claim does not exist.
    /// - [`GatewayError::ConcurrencyConflict`] if `expected_version` no
    ///   longer matches (a concurrent admin action won the race).
    /// - [`GatewayError::InvalidTransition`] if the state machine forbids
    ///   the move.
    pub async fn transition(
        &self,
        claim_id: ClaimId,
        expected_version: i64,
        next: ClaimStatus,
        note: Option<String>,
    ) -> Result<RewardClaim, GatewayError> {
        let mut inner = self.inner.write().await;
        let key = *inner
            .by_id
            .get(&claim_id)
            .ok_or(GatewayError::ClaimNotFound(*claim_id.as_uuid()))?;
        let claim = inner
            .by_member_level
            .get_mut(&key)
            .ok_or(GatewayError::ClaimNotFound(*claim_id.as_uuid()))?;

        if claim.version != expected_version {
            return Err(GatewayError::ConcurrencyConflict(format!(
                "claim {claim_id} is at version {}, caller expected {expected_version}",
                claim.version
            )));
        }
        if !claim.status.can_transition_to(next) {
            return Err(GatewayError::InvalidTransition {
                from: claim.status.to_string(),
                to: next.to_string(),
            });
        }

        claim.status = next;
        claim.processed_at = Some(Utc::now());
        if note.is_some() {
            claim.note = note;
        }
        claim.version += 1;
        Ok(claim.clone())
    }

    /// Returns claims, optionally filtered by status, newest first.
    pub async fn list(&self, status_filter: Option<ClaimStatus>) -> Vec<RewardClaim> {
        let inner = self.inner.read().await;
        let mut claims: Vec<RewardClaim> = inner
            .by_member_level
            .values()
            .filter(|c| status_filter.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
        claims
    }

    /// Returns the number of claims in the ledger.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_member_level.len()
    }

    /// Returns `true` if the ledger holds no claims.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_member_level.is_empty()
    }
}
