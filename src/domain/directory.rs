//! Concurrent member storage with write-time forest enforcement.
//!
//! [`MemberDirectory`] stores all known members in a `HashMap` behind a
//! [`tokio::sync::RwLock`]. Members are small value types, so reads clone
//! the record out rather than handing out per-entry locks. All sponsor-link
//! writes run under the single write lock, which makes the cycle check and
//! the assignment one atomic step.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::member::{Member, MemberId};
use crate::error::GatewayError;

/// Central store for all members, keyed by [`MemberId`].
///
/// The sponsor relation over the stored members must form a forest: no
/// cycles, at most one parent per member. [`MemberDirectory::assign_sponsor`]
/// refuses any write that would violate this before it is applied.
#[derive(Debug, Default)]
pub struct MemberDirectory {
    members: RwLock<HashMap<MemberId, Member>>,
}

impl MemberDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new member record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the member ID or the
    /// referral code is already taken.
    pub async fn insert(&self, member: Member) -> Result<MemberId, GatewayError> {
        let member_id = member.id;
        let mut map = self.members.write().await;
        if map.contains_key(&member_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "member {member_id} already exists"
            )));
        }
        if map
            .values()
            .any(|m| m.referral_code == member.referral_code)
        {
            return Err(GatewayError::InvalidRequest(format!(
                "referral code {} already issued",
                member.referral_code
            )));
        }
        map.insert(member_id, member);
        Ok(member_id)
    }

    /// Returns a copy of the member record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] if no member with the given
    /// ID exists.
    pub async fn get(&self, member_id: MemberId) -> Result<Member, GatewayError> {
        let map = self.members.read().await;
        map.get(&member_id)
            .cloned()
            .ok_or(GatewayError::MemberNotFound(*member_id.as_uuid()))
    }

    /// Looks up a member by referral code (signup attribution).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ReferralCodeNotFound`] if no member carries
    /// the code.
    pub async fn find_by_code(&self, code: &str) -> Result<Member, GatewayError> {
        let map = self.members.read().await;
        map.values()
            .find(|m| m.referral_code == code)
            .cloned()
            .ok_or_else(|| GatewayError::ReferralCodeNotFound(code.to_string()))
    }

    /// Assigns a sponsor to a member, enforcing the forest invariant.
    ///
    /// The check and the write run under one write lock: a member may not
    /// sponsor itself, may not gain a second parent, and may not become its
    /// own sponsor directly or transitively.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MemberNotFound`] if either end of the link is
    ///   unknown.
    /// - [`GatewayError::SponsorAlreadySet`] if the member already has a
    ///   sponsor.
    /// - [`GatewayError::SponsorCycle`] if the assignment would create a
    ///   cycle.
    /// - [`GatewayError::DataIntegrity`] if the existing sponsor chain is
    ///   already malformed (should not happen; the write path forbids it).
    pub async fn assign_sponsor(
        &self,
        member_id: MemberId,
        sponsor_id: MemberId,
    ) -> Result<(), GatewayError> {
        if member_id == sponsor_id {
            return Err(GatewayError::SponsorCycle(*member_id.as_uuid()));
        }

        let mut map = self.members.write().await;
        if !map.contains_key(&sponsor_id) {
            return Err(GatewayError::MemberNotFound(*sponsor_id.as_uuid()));
        }
        let current = map
            .get(&member_id)
            .ok_or(GatewayError::MemberNotFound(*member_id.as_uuid()))?;
        if current.sponsor_id.is_some() {
            return Err(GatewayError::SponsorAlreadySet(*member_id.as_uuid()));
        }

        // Walk the ancestor chain from the proposed sponsor. Reaching the
        // member means the link would close a cycle. The hop limit bounds
        // the walk even if the stored chain is already corrupt.
        let mut cursor = Some(sponsor_id);
        let mut hops = 0usize;
        let hop_limit = map.len();
        while let Some(ancestor) = cursor {
            if ancestor == member_id {
                return Err(GatewayError::SponsorCycle(*member_id.as_uuid()));
            }
            hops += 1;
            if hops > hop_limit {
                return Err(GatewayError::DataIntegrity(format!(
                    "sponsor chain from {sponsor_id} exceeds member count"
                )));
            }
            cursor = map.get(&ancestor).and_then(|m| m.sponsor_id);
        }

        if let Some(member) = map.get_mut(&member_id) {
            member.sponsor_id = Some(sponsor_id);
        }
        Ok(())
    }

    /// Marks a member as a qualifying network member.
    ///
    /// Idempotent: a member that already qualifies keeps its original
    /// `qualified_at`. Returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] if the member is unknown.
    pub async fn mark_network_member(&self, member_id: MemberId) -> Result<Member, GatewayError> {
        let mut map = self.members.write().await;
        let member = map
            .get_mut(&member_id)
            .ok_or(GatewayError::MemberNotFound(*member_id.as_uuid()))?;
        if !member.is_network_member {
            member.is_network_member = true;
            member.qualified_at = Some(Utc::now());
        }
        Ok(member.clone())
    }

    /// Returns a consistent copy of every member record.
    ///
    /// Used to build the adjacency index once per query batch.
    pub async fn snapshot(&self) -> Vec<Member> {
        self.members.read().await.values().cloned().collect()
    }

    /// Returns the number of members in the directory.
    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    /// Returns `true` if the directory contains no members.
    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn insert_member(dir: &MemberDirectory, name: &str) -> MemberId {
        let member = Member::new(name.to_string());
        let Ok(id) = dir.insert(member).await else {
            panic!("insert failed");
        };
        id
    }

    #[tokio::test]
    async fn insert_and_get() {
        let dir = MemberDirectory::new();
        let id = insert_member(&dir, "Ada").await;

        let fetched = dir.get(id).await;
        let Ok(member) = fetched else {
            panic!("member not found");
        };
        assert_eq!(member.full_name, "Ada");
    }

    #[tokio::test]
    async fn get_nonexistent_returns_error() {
        let dir = MemberDirectory::new();
        let result = dir.get(MemberId::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let dir = MemberDirectory::new();
        let member = Member::new("Ada".to_string());
        let dup = member.clone();
        let _ = dir.insert(member).await;
        assert!(dir.insert(dup).await.is_err());
    }

    #[tokio::test]
    async fn find_by_code_matches() {
        let dir = MemberDirectory::new();
        let member = Member::new("Ada".to_string());
        let code = member.referral_code.clone();
        let id = member.id;
        let _ = dir.insert(member).await;

        let found = dir.find_by_code(&code).await;
        let Ok(found) = found else {
            panic!("code lookup failed");
        };
        assert_eq!(found.id, id);

        assert!(dir.find_by_code("NOSUCH00").await.is_err());
    }

    #[tokio::test]
    async fn assign_sponsor_links_member() {
        let dir = MemberDirectory::new();
        let sponsor = insert_member(&dir, "Ada").await;
        let child = insert_member(&dir, "Grace").await;

        let result = dir.assign_sponsor(child, sponsor).await;
        assert!(result.is_ok());

        let Ok(member) = dir.get(child).await else {
            panic!("member not found");
        };
        assert_eq!(member.sponsor_id, Some(sponsor));
    }

    #[tokio::test]
    async fn self_sponsorship_rejected() {
        let dir = MemberDirectory::new();
        let id = insert_member(&dir, "Ada").await;

        let result = dir.assign_sponsor(id, id).await;
        assert!(matches!(result, Err(GatewayError::SponsorCycle(_))));
    }

    #[tokio::test]
    async fn second_parent_rejected() {
        let dir = MemberDirectory::new();
        let a = insert_member(&dir, "Ada").await;
        let b = insert_member(&dir, "Grace").await;
        let c = insert_member(&dir, "Edsger").await;

        let _ = dir.assign_sponsor(c, a).await;
        let result = dir.assign_sponsor(c, b).await;
        assert!(matches!(result, Err(GatewayError::SponsorAlreadySet(_))));
    }

    #[tokio::test]
    async fn transitive_cycle_rejected() {
        let dir = MemberDirectory::new();
        let a = insert_member(&dir, "Ada").await;
        let b = insert_member(&dir, "Grace").await;
        let c = insert_member(&dir, "Edsger").await;

        // a ← b ← c, then a under c would close the loop
        let _ = dir.assign_sponsor(b, a).await;
        let _ = dir.assign_sponsor(c, b).await;
        let result = dir.assign_sponsor(a, c).await;
        assert!(matches!(result, Err(GatewayError::SponsorCycle(_))));

        // The refused link must not have been written
        let Ok(member) = dir.get(a).await else {
            panic!("member not found");
        };
        assert!(member.sponsor_id.is_none());
    }

    #[tokio::test]
    async fn mark_network_member_is_idempotent() {
        let dir = MemberDirectory::new();
        let id = insert_member(&dir, "Ada").await;

        let Ok(first) = dir.mark_network_member(id).await else {
            panic!("qualify failed");
        };
        assert!(first.is_network_member);
        let first_at = first.qualified_at;

        let Ok(second) = dir.mark_network_member(id).await else {
            panic!("qualify failed");
        };
        assert_eq!(second.qualified_at, first_at);
    }

    #[tokio::test]
    async fn snapshot_and_len() {
        let dir = MemberDirectory::new();
        assert!(dir.is_empty().await);

        let _ = insert_member(&dir, "Ada").await;
        let _ = insert_member(&dir, "Grace").await;
        assert_eq!(dir.len().await, 2);
        assert_eq!(dir.snapshot().await.len(), 2);
    }
}
