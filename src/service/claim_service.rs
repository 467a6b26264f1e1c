//! Claim service: eligibility evaluation and the admin lifecycle.
//!
//! Owns the reward-claim state machine end to end: re-evaluates a member's
//! levels after qualifying writes, creates `Pending` claims exactly once
//! per `(member, level)`, and drives the admin transitions with an
//! optimistic-concurrency retry.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::levels::{REWARDED_LEVELS, aggregate};
use crate::domain::{
    AdjacencyIndex, ClaimId, ClaimLedger, ClaimStatus, EventBus, MAX_NETWORK_DEPTH, Member,
    MemberDirectory, MemberId, NetworkEvent, RewardClaim,
};
use crate::error::GatewayError;
use crate::persistence::PostgresStore;

/// A claim joined with its owner's contact fields for the admin surface.
#[derive(Debug, Clone)]
pub struct ClaimDetails {
    /// The claim record.
    pub claim: RewardClaim,
    /// Owner's display name, when the member is still known.
    pub member_name: Option<String>,
    /// Owner's referral code, when the member is still known.
    pub referral_code: Option<String>,
}

/// Orchestration layer for reward-claim operations.
///
/// Every mutation follows the pattern: aggregate or read → guarded ledger
/// write → mirror to the store → emit events → return result.
#[derive(Debug, Clone)]
pub struct ClaimService {
    directory: Arc<MemberDirectory>,
    ledger: Arc<ClaimLedger>,
    event_bus: EventBus,
    store: Option<Arc<PostgresStore>>,
    node_budget: usize,
}

impl ClaimService {
    /// Creates a new `ClaimService`.
    #[must_use]
    pub fn new(
        directory: Arc<MemberDirectory>,
        ledger: Arc<ClaimLedger>,
        event_bus: EventBus,
        store: Option<Arc<PostgresStore>>,
        node_budget: usize,
    ) -> Self {
        Self {
            directory,
            ledger,
            event_bus,
            store,
            node_budget,
        }
    }

    /// Returns a reference to the inner [`ClaimLedger`].
    #[must_use]
    pub fn ledger(&self) -> &Arc<ClaimLedger> {
        &self.ledger
    }

    /// Re-evaluates a member's levels and creates any newly earned claims.
    ///
    /// For each rewarded level (1, 3, 5, 7) that is completed and has no
    /// claim yet, a `Pending` claim is created. Idempotent: re-running
    /// after the claims exist creates nothing. Returns only the claims
    /// actually created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] for an unknown member, or
    /// a persistence error if the durable claim insert fails.
    pub async fn evaluate_and_create_claims(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<RewardClaim>, GatewayError> {
        let snapshot = self.directory.snapshot().await;
        let index = AdjacencyIndex::build(snapshot);
        let traversal = index.subtree(member_id, MAX_NETWORK_DEPTH, self.node_budget)?;
        if traversal.cycle_detected {
            tracing::error!(%member_id, "cycle detected during claim evaluation; using clean prefix");
        }
        let stats = aggregate(&traversal, &index);

        let mut created = Vec::new();
        for level in REWARDED_LEVELS {
            let Some(stat) = stats.levels.iter().find(|s| s.level == level) else {
                continue;
            };
            if !stat.is_completed {
                continue;
            }
            let Some(claim) = self.ledger.create_if_absent(member_id, level).await else {
                continue;
            };

            if let Some(store) = &self.store {
                // The unique index makes the insert a no-op when another
                // process already claimed the pair.
                let inserted = store.insert_claim(&claim).await?;
                if !inserted {
                    tracing::warn!(%member_id, level, "claim already persisted elsewhere");
                }
            }

            self.event_bus.publish(NetworkEvent::LevelCompleted {
                member_id,
                level,
                count: stat.count,
                timestamp: Utc::now(),
            });
            self.event_bus.publish(NetworkEvent::ClaimCreated {
                member_id,
                claim_id: claim.id,
                level,
                timestamp: Utc::now(),
            });
            self.log_event(&NetworkEvent::ClaimCreated {
                member_id,
                claim_id: claim.id,
                level,
                timestamp: Utc::now(),
            })
            .await;

            tracing::info!(%member_id, level, claim_id = %claim.id, "reward claim created");
            created.push(claim);
        }

        Ok(created)
    }

    /// Approves a pending claim, recording the optional admin note.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClaimNotFound`] if the claim is absent,
    /// [`GatewayError::InvalidTransition`] if it is not `Pending`, or
    /// [`GatewayError::ConcurrencyConflict`] if a concurrent admin action
    /// wins the race twice in a row.
    pub async fn approve(
        &self,
        claim_id: ClaimId,
        note: Option<String>,
    ) -> Result<RewardClaim, GatewayError> {
        let updated = self
            .transition_with_retry(claim_id, ClaimStatus::Approved, note)
            .await?;
        self.event_bus.publish(NetworkEvent::ClaimApproved {
            member_id: updated.member_id,
            claim_id,
            timestamp: Utc::now(),
        });
        self.log_event(&NetworkEvent::ClaimApproved {
            member_id: updated.member_id,
            claim_id,
            timestamp: Utc::now(),
        })
        .await;
        tracing::info!(%claim_id, member_id = %updated.member_id, "claim approved");
        Ok(updated)
    }

    /// Marks an approved claim's reward as delivered (terminal).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClaimNotFound`] if the claim is absent,
    /// [`GatewayError::InvalidTransition`] if it is not `Approved`, or
    /// [`GatewayError::ConcurrencyConflict`] after the retry is exhausted.
    pub async fn mark_delivered(&self, claim_id: ClaimId) -> Result<RewardClaim, GatewayError> {
        let updated = self
            .transition_with_retry(claim_id, ClaimStatus::Delivered, None)
            .await?;
        self.event_bus.publish(NetworkEvent::ClaimDelivered {
            member_id: updated.member_id,
            claim_id,
            timestamp: Utc::now(),
        });
        self.log_event(&NetworkEvent::ClaimDelivered {
            member_id: updated.member_id,
            claim_id,
            timestamp: Utc::now(),
        })
        .await;
        tracing::info!(%claim_id, member_id = %updated.member_id, "claim delivered");
        Ok(updated)
    }

    /// Returns a single claim by ID.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClaimNotFound`] if no such claim exists.
    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<RewardClaim, GatewayError> {
        self.ledger.get(claim_id).await
    }

    /// Lists claims joined with member contact info, newest first.
    pub async fn list_claims(&self, status_filter: Option<ClaimStatus>) -> Vec<ClaimDetails> {
        let claims = self.ledger.list(status_filter).await;
        let mut details = Vec::with_capacity(claims.len());
        for claim in claims {
            let member: Option<Member> = self.directory.get(claim.member_id).await.ok();
            details.push(ClaimDetails {
                member_name: member.as_ref().map(|m| m.full_name.clone()),
                referral_code: member.map(|m| m.referral_code),
                claim,
            });
        }
        details
    }

    /// Read → guarded transition, retried once on a version conflict.
    async fn transition_with_retry(
        &self,
        claim_id: ClaimId,
        next: ClaimStatus,
        note: Option<String>,
    ) -> Result<RewardClaim, GatewayError> {
        let mut attempts = 0;
        loop {
            let current = self.ledger.get(claim_id).await?;
            let result = self
                .ledger
                .transition(claim_id, current.version, next, note.clone())
                .await;
            match result {
                Ok(updated) => {
                    self.mirror_transition(&current, &updated).await?;
                    return Ok(updated);
                }
                Err(GatewayError::ConcurrencyConflict(reason)) if attempts == 0 => {
                    attempts += 1;
                    tracing::warn!(%claim_id, %reason, "claim transition conflict; retrying once");
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Mirrors a successful transition to the durable store.
    async fn mirror_transition(
        &self,
        previous: &RewardClaim,
        updated: &RewardClaim,
    ) -> Result<(), GatewayError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let landed = store
            .update_claim_status(updated, previous.status.as_str(), previous.version)
            .await?;
        if !landed {
            // The in-memory ledger already serialized this transition; a
            // missed row means the durable copy drifted.
            tracing::error!(claim_id = %updated.id, "durable claim row did not match expected status/version");
        }
        Ok(())
    }

    /// Appends the event to the durable log when persistence is enabled.
    async fn log_event(&self, event: &NetworkEvent) {
        let Some(store) = &self.store else {
            return;
        };
        let payload = serde_json::to_value(event).unwrap_or_default();
        if let Err(e) = store
            .save_event(*event.member_id().as_uuid(), event.event_type_str(), &payload)
            .await
        {
            tracing::warn!(error = %e, "failed to append event to log");
        }
    }
}
