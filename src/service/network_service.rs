//! Network service: enrollment, qualification, and the read-side facade.
//!
//! Composes the directory, the adjacency index, and the level aggregator
//! into the two public read payloads (member dashboard, admin graph) and
//! the write paths that feed them. Qualifying writes trigger claim
//! evaluation for the member and every ancestor within seven levels, so
//! claim creation stays close to the write that caused it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::domain::levels::aggregate;
use crate::domain::member::MemberSummary;
use crate::domain::{
    AdjacencyIndex, EventBus, MAX_NETWORK_DEPTH, Member, MemberDirectory, MemberId, NetworkEvent,
    NetworkStats, RewardClaim,
};
use crate::error::GatewayError;
use crate::persistence::PostgresStore;
use crate::service::ClaimService;

/// Read-side payload backing a member's own dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDashboard {
    /// Display name.
    pub full_name: String,
    /// The member's referral code.
    pub referral_code: String,
    /// Whether the member is a qualifying network member.
    pub is_member: bool,
    /// Aggregated level table and team size.
    pub stats: NetworkStats,
    /// Direct sponsees, ordered by enrollment time.
    pub direct_referrals: Vec<MemberSummary>,
}

/// One node of the admin visualization payload.
///
/// Depth-capped at seven levels below the requested root; `team_size` is
/// the count of qualifying descendants within the materialized subtree.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Member identifier.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Depth below the requested root (root itself is 0).
    pub level: u32,
    /// `"qualified"` or `"guest"`.
    pub status: &'static str,
    /// Qualifying descendants within the depth cap.
    pub team_size: u64,
    /// Direct sponsees, recursively.
    pub children: Vec<GraphNode>,
}

/// Orchestration layer for network reads and membership writes.
#[derive(Debug, Clone)]
pub struct NetworkService {
    directory: Arc<MemberDirectory>,
    claim_service: ClaimService,
    event_bus: EventBus,
    store: Option<Arc<PostgresStore>>,
    node_budget: usize,
}

impl NetworkService {
    /// Creates a new `NetworkService`.
    #[must_use]
    pub fn new(
        directory: Arc<MemberDirectory>,
        claim_service: ClaimService,
        event_bus: EventBus,
        store: Option<Arc<PostgresStore>>,
        node_budget: usize,
    ) -> Self {
        Self {
            directory,
            claim_service,
            event_bus,
            store,
            node_budget,
        }
    }

    /// Returns a reference to the inner [`MemberDirectory`].
    #[must_use]
    pub fn directory(&self) -> &Arc<MemberDirectory> {
        &self.directory
    }

    /// Returns a reference to the inner [`ClaimService`].
    #[must_use]
    pub fn claim_service(&self) -> &ClaimService {
        &self.claim_service
    }

    /// Enrolls a new member, optionally attributed to a sponsor by
    /// referral code.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty name,
    /// [`GatewayError::ReferralCodeNotFound`] for an unknown sponsor code,
    /// or a persistence error if the durable write fails.
    pub async fn enroll_member(
        &self,
        full_name: &str,
        sponsor_code: Option<&str>,
    ) -> Result<Member, GatewayError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "full_name must not be empty".to_string(),
            ));
        }

        let sponsor = match sponsor_code {
            Some(code) => Some(self.directory.find_by_code(code).await?),
            None => None,
        };

        let member = Member::new(full_name.to_string());
        let member_id = self.directory.insert(member).await?;

        if let Some(sponsor) = &sponsor {
            // A fresh member has no descendants, so this cannot cycle;
            // the directory still verifies.
            self.directory.assign_sponsor(member_id, sponsor.id).await?;
        }

        let member = self.directory.get(member_id).await?;
        if let Some(store) = &self.store {
            store.save_member(&member).await?;
        }

        self.event_bus.publish(NetworkEvent::MemberEnrolled {
            member_id,
            referral_code: member.referral_code.clone(),
            timestamp: Utc::now(),
        });
        if let Some(sponsor) = sponsor {
            self.event_bus.publish(NetworkEvent::SponsorAssigned {
                member_id,
                sponsor_id: sponsor.id,
                timestamp: Utc::now(),
            });
        }

        tracing::info!(%member_id, "member enrolled");
        Ok(member)
    }

    /// Records a qualifying purchase: flags the member and re-evaluates
    /// claims for the member and every ancestor within seven levels.
    ///
    /// Returns all claims created across the chain. Idempotent: repeating
    /// the call qualifies nothing new and creates no duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] for an unknown member, or
    /// a persistence error if the durable write fails.
    pub async fn record_qualification(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<RewardClaim>, GatewayError> {
        let member = self.directory.mark_network_member(member_id).await?;
        if let Some(store) = &self.store {
            store.save_member(&member).await?;
        }
        self.event_bus.publish(NetworkEvent::MemberQualified {
            member_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%member_id, "member qualified");

        // The new qualifying node can complete a level for itself or for
        // any ancestor whose subtree it sits in, never deeper than the cap.
        let mut created = Vec::new();
        for target in self.ancestor_chain(member_id).await {
            let mut claims = self.claim_service.evaluate_and_create_claims(target).await?;
            created.append(&mut claims);
        }
        Ok(created)
    }

    /// Builds the dashboard payload for a member.
    ///
    /// A data-integrity anomaly in the subtree is logged server-side and
    /// served as the correct, cycle-free partial tree.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] for an unknown member.
    pub async fn member_dashboard(
        &self,
        member_id: MemberId,
    ) -> Result<MemberDashboard, GatewayError> {
        let member = self.directory.get(member_id).await?;
        let snapshot = self.directory.snapshot().await;
        let index = AdjacencyIndex::build(snapshot);
        let traversal = index.subtree(member_id, MAX_NETWORK_DEPTH, self.node_budget)?;
        if traversal.cycle_detected {
            tracing::error!(%member_id, "cycle detected in referral data; serving partial dashboard");
        }
        if traversal.truncated {
            tracing::warn!(%member_id, budget = self.node_budget, "dashboard traversal truncated");
        }
        let stats = aggregate(&traversal, &index);

        let direct_referrals = index
            .children_of(member_id)
            .iter()
            .filter_map(|id| index.member(*id))
            .map(MemberSummary::from)
            .collect();

        Ok(MemberDashboard {
            full_name: member.full_name,
            referral_code: member.referral_code,
            is_member: member.is_network_member,
            stats,
            direct_referrals,
        })
    }

    /// Builds the recursive visualization payload for an admin-selected
    /// root, hard-capped at seven levels.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] for an unknown root.
    pub async fn network_graph(&self, root_id: MemberId) -> Result<GraphNode, GatewayError> {
        let snapshot = self.directory.snapshot().await;
        let index = AdjacencyIndex::build(snapshot);
        let root = index
            .member(root_id)
            .ok_or(GatewayError::MemberNotFound(*root_id.as_uuid()))?
            .clone();

        let mut visited = HashSet::new();
        visited.insert(root_id);
        let mut budget = self.node_budget;
        let mut cycle_detected = false;
        let children = build_children(
            &index,
            root_id,
            1,
            &mut visited,
            &mut budget,
            &mut cycle_detected,
        );
        if cycle_detected {
            tracing::error!(%root_id, "cycle detected in referral data; serving partial graph");
        }

        Ok(GraphNode {
            id: root.id,
            name: root.full_name.clone(),
            level: 0,
            status: membership_status(&root),
            team_size: subtree_team_size(&children),
            children,
        })
    }

    /// The member plus its ancestors, nearest first, at most seven hops.
    async fn ancestor_chain(&self, member_id: MemberId) -> Vec<MemberId> {
        let mut chain = vec![member_id];
        let mut cursor = member_id;
        for _ in 0..MAX_NETWORK_DEPTH {
            let Ok(member) = self.directory.get(cursor).await else {
                break;
            };
            let Some(sponsor_id) = member.sponsor_id else {
                break;
            };
            if chain.contains(&sponsor_id) {
                tracing::error!(%member_id, "cycle detected in sponsor chain; stopping walk");
                break;
            }
            chain.push(sponsor_id);
            cursor = sponsor_id;
        }
        chain
    }
}

/// Recursively materializes children below `parent`, depth-capped and
/// budget-capped, cutting any branch that revisits a node.
fn build_children(
    index: &AdjacencyIndex,
    parent: MemberId,
    depth: u32,
    visited: &mut HashSet<MemberId>,
    budget: &mut usize,
    cycle_detected: &mut bool,
) -> Vec<GraphNode> {
    if depth > MAX_NETWORK_DEPTH {
        return Vec::new();
    }
    let mut nodes = Vec::new();
    for &child_id in index.children_of(parent) {
        if *budget == 0 {
            break;
        }
        if !visited.insert(child_id) {
            *cycle_detected = true;
            continue;
        }
        let Some(child) = index.member(child_id) else {
            continue;
        };
        *budget -= 1;
        let children = build_children(index, child_id, depth + 1, visited, budget, cycle_detected);
        nodes.push(GraphNode {
            id: child.id,
            name: child.full_name.clone(),
            level: depth,
            status: membership_status(child),
            team_size: subtree_team_size(&children),
            children,
        });
    }
    nodes
}

/// Qualifying descendants represented in a materialized child list.
fn subtree_team_size(children: &[GraphNode]) -> u64 {
    children
        .iter()
        .map(|c| c.team_size + u64::from(c.status == "qualified"))
        .sum()
}

const fn membership_status(member: &Member) -> &'static str {
    if member.is_network_member {
        "qualified"
    } else {
        "guest"
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ClaimLedger, ClaimStatus};

    fn make_service() -> NetworkService {
        let directory = Arc::new(MemberDirectory::new());
        let ledger = Arc::new(ClaimLedger::new());
        let event_bus = EventBus::new(1000);
        let claim_service = ClaimService::new(
            Arc::clone(&directory),
            ledger,
            event_bus.clone(),
            None,
            100_000,
        );
        NetworkService::new(directory, claim_service, event_bus, None, 100_000)
    }

    async fn enroll(service: &NetworkService, name: &str, code: Option<&str>) -> Member {
        let Ok(member) = service.enroll_member(name, code).await else {
            panic!("enroll failed");
        };
        member
    }

    #[tokio::test]
    async fn enroll_issues_referral_code() {
        let service = make_service();
        let member = enroll(&service, "Ada", None).await;
        assert_eq!(member.referral_code.len(), 8);
        assert!(member.sponsor_id.is_none());
    }

    #[tokio::test]
    async fn enroll_attributes_sponsor_by_code() {
        let service = make_service();
        let sponsor = enroll(&service, "Ada", None).await;
        let child = enroll(&service, "Grace", Some(&sponsor.referral_code)).await;
        assert_eq!(child.sponsor_id, Some(sponsor.id));
    }

    #[tokio::test]
    async fn enroll_with_unknown_code_fails() {
        let service = make_service();
        let result = service.enroll_member("Ada", Some("XXXXXXXX")).await;
        assert!(matches!(
            result,
            Err(GatewayError::ReferralCodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_name_rejected() {
        let service = make_service();
        let result = service.enroll_member("   ", None).await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn qualification_completes_sponsor_level() {
        let service = make_service();
        let sponsor = enroll(&service, "Ada", None).await;
        let _ = service.record_qualification(sponsor.id).await;

        let mut last_created = Vec::new();
        for i in 0..5 {
            let child = enroll(
                &service,
                &format!("child-{i}"),
                Some(&sponsor.referral_code),
            )
            .await;
            let Ok(created) = service.record_qualification(child.id).await else {
                panic!("qualification failed");
            };
            last_created = created;
        }

        // The fifth qualifying child completes the sponsor's level 1.
        assert_eq!(last_created.len(), 1);
        let Some(claim) = last_created.first() else {
            panic!("missing claim");
        };
        assert_eq!(claim.member_id, sponsor.id);
        assert_eq!(claim.level, 1);
        assert_eq!(claim.status, ClaimStatus::Pending);

        // Re-running the same webhook creates nothing new.
        let last_child = enroll(&service, "extra", Some(&sponsor.referral_code)).await;
        let Ok(created) = service.record_qualification(last_child.id).await else {
            panic!("qualification failed");
        };
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn dashboard_scenario_five_direct() {
        let service = make_service();
        let sponsor = enroll(&service, "Ada", None).await;
        let _ = service.record_qualification(sponsor.id).await;
        for i in 0..5 {
            let child = enroll(
                &service,
                &format!("child-{i}"),
                Some(&sponsor.referral_code),
            )
            .await;
            let _ = service.record_qualification(child.id).await;
        }

        let Ok(dashboard) = service.member_dashboard(sponsor.id).await else {
            panic!("dashboard failed");
        };
        assert!(dashboard.is_member);
        assert_eq!(dashboard.stats.total_team_size, 5);
        assert_eq!(dashboard.direct_referrals.len(), 5);

        let Some(level1) = dashboard.stats.levels.first() else {
            panic!("missing level 1");
        };
        assert_eq!(level1.count, 5);
        assert!(level1.is_completed);
        assert_eq!(level1.progress, 100.0);

        for stat in dashboard.stats.levels.iter().skip(1) {
            assert_eq!(stat.count, 0);
        }
    }

    #[tokio::test]
    async fn dashboard_scenario_four_direct() {
        let service = make_service();
        let sponsor = enroll(&service, "Ada", None).await;
        for i in 0..4 {
            let child = enroll(
                &service,
                &format!("child-{i}"),
                Some(&sponsor.referral_code),
            )
            .await;
            let _ = service.record_qualification(child.id).await;
        }

        let Ok(dashboard) = service.member_dashboard(sponsor.id).await else {
            panic!("dashboard failed");
        };
        let Some(level1) = dashboard.stats.levels.first() else {
            panic!("missing level 1");
        };
        assert_eq!(level1.count, 4);
        assert!(!level1.is_completed);
        assert_eq!(level1.progress, 80.0);
    }

    #[tokio::test]
    async fn dashboard_unknown_member_not_found() {
        let service = make_service();
        let result = service.member_dashboard(MemberId::new()).await;
        assert!(matches!(result, Err(GatewayError::MemberNotFound(_))));
    }

    #[tokio::test]
    async fn graph_payload_is_depth_capped() {
        let service = make_service();
        // A chain ten deep under the root.
        let root = enroll(&service, "root", None).await;
        let _ = service.record_qualification(root.id).await;
        let mut parent_code = root.referral_code.clone();
        for i in 0..10 {
            let child = enroll(&service, &format!("n-{i}"), Some(&parent_code)).await;
            let _ = service.record_qualification(child.id).await;
            parent_code = child.referral_code.clone();
        }

        let Ok(graph) = service.network_graph(root.id).await else {
            panic!("graph failed");
        };
        let mut depth = 0;
        let mut node = &graph;
        while let Some(child) = node.children.first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 7);
        assert_eq!(graph.team_size, 7);
        assert_eq!(graph.status, "qualified");
    }

    #[tokio::test]
    async fn graph_counts_only_qualifying_in_team_size() {
        let service = make_service();
        let root = enroll(&service, "root", None).await;
        let qualified = enroll(&service, "q", Some(&root.referral_code)).await;
        let _ = service.record_qualification(qualified.id).await;
        let _guest = enroll(&service, "g", Some(&root.referral_code)).await;

        let Ok(graph) = service.network_graph(root.id).await else {
            panic!("graph failed");
        };
        assert_eq!(graph.children.len(), 2);
        assert_eq!(graph.team_size, 1);
        assert!(
            graph
                .children
                .iter()
                .any(|c| c.status == "guest" && c.team_size == 0)
        );
    }
}
