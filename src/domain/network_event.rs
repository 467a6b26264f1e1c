//! Domain events reflecting network and claim state mutations.
//!
//! Every state change emits a [`NetworkEvent`] through the [`EventBus`].
//! Events are broadcast to WebSocket subscribers and optionally persisted
//! to the PostgreSQL event log. Claim evaluation is itself event-driven:
//! the write that changes a member's qualifying status publishes the event
//! and triggers re-evaluation of the affected ancestors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use super::claim::ClaimId;
use super::member::MemberId;

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum NetworkEvent {
    /// A new member enrolled.
    MemberEnrolled {
        /// The new member.
        member_id: MemberId,
        /// Referral code issued to the member.
        referral_code: String,
        /// Enrollment timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A sponsor link was attached to a member.
    SponsorAssigned {
        /// The sponsored member.
        member_id: MemberId,
        /// The sponsoring member.
        sponsor_id: MemberId,
        /// Assignment timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A member became a qualifying network member.
    MemberQualified {
        /// The qualifying member.
        member_id: MemberId,
        /// Qualification timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A level reached its target count for a member.
    LevelCompleted {
        /// The member whose level completed.
        member_id: MemberId,
        /// Completed level (1–7).
        level: u32,
        /// Qualifying member count at completion time.
        count: u64,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A reward claim was created in `Pending`.
    ClaimCreated {
        /// Owning member.
        member_id: MemberId,
        /// The new claim.
        claim_id: ClaimId,
        /// Rewarded level the claim is for.
        level: u32,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An admin approved a claim.
    ClaimApproved {
        /// Owning member.
        member_id: MemberId,
        /// The approved claim.
        claim_id: ClaimId,
        /// Approval timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An admin marked a claim's reward as delivered.
    ClaimDelivered {
        /// Owning member.
        member_id: MemberId,
        /// The delivered claim.
        claim_id: ClaimId,
        /// Delivery timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl NetworkEvent {
    /// Returns the member ID associated with this event.
    #[must_use]
    pub fn member_id(&self) -> MemberId {
        match self {
            Self::MemberEnrolled { member_id, .. }
            | Self::SponsorAssigned { member_id, .. }
            | Self::MemberQualified { member_id, .. }
            | Self::LevelCompleted { member_id, .. }
            | Self::ClaimCreated { member_id, .. }
            | Self::ClaimApproved { member_id, .. }
            | Self::ClaimDelivered { member_id, .. } => *member_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::MemberEnrolled { .. } => "member_enrolled",
            Self::SponsorAssigned { .. } => "sponsor_assigned",
            Self::MemberQualified { .. } => "member_qualified",
            Self::LevelCompleted { .. } => "level_completed",
            Self::ClaimCreated { .. } => "claim_created",
            Self::ClaimApproved { .. } => "claim_approved",
            Self::ClaimDelivered { .. } => "claim_delivered",
        }
    }
}

/// Broadcast bus for [`NetworkEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest events are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NetworkEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: NetworkEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_event(member_id: MemberId) -> NetworkEvent {
        NetworkEvent::MemberQualified {
            member_id,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        let count = bus.publish(make_event(MemberId::new()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let id = MemberId::new();
        bus.publish(make_event(id));

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected to receive event");
        };
        assert_eq!(event.member_id(), id);
        assert_eq!(event.event_type_str(), "member_qualified");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = MemberId::new();
        let count = bus.publish(make_event(id));
        assert_eq!(count, 2);

        let e1 = rx1.recv().await;
        let e2 = rx2.recv().await;
        let Ok(e1) = e1 else {
            panic!("rx1 failed");
        };
        let Ok(e2) = e2 else {
            panic!("rx2 failed");
        };
        assert_eq!(e1.member_id(), e2.member_id());
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = NetworkEvent::ClaimCreated {
            member_id: MemberId::new(),
            claim_id: ClaimId::new(),
            level: 7,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("claim_created"));
        assert!(json.contains("\"level\":7"));
    }
}
