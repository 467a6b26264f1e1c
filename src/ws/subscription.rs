//! Per-connection subscription manager.
//!
//! Tracks which member IDs a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::MemberId;

/// Manages the set of member subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed member IDs. If `subscribe_all` is true, this set is ignored.
    member_ids: HashSet<MemberId>,
    /// Whether the client subscribes to all members (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds member IDs to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe(&mut self, ids: &[MemberId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        for id in ids {
            self.member_ids.insert(*id);
        }
    }

    /// Removes member IDs from the subscription set.
    pub fn unsubscribe(&mut self, ids: &[MemberId]) {
        for id in ids {
            self.member_ids.remove(id);
        }
    }

    /// Returns `true` if the given member ID matches the subscription filter.
    #[must_use]
    pub fn matches(&self, member_id: MemberId) -> bool {
        self.subscribe_all || self.member_ids.contains(&member_id)
    }

    /// Returns the number of explicitly subscribed member IDs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.member_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
