//! Referral graph: adjacency index and bounded subtree traversal.
//!
//! The forest lives as flat sponsor pointers on [`Member`] records; this
//! module materializes a `sponsor_id -> [child ids]` index once per query
//! batch and runs breadth-first traversal over it. Traversal is capped by
//! depth and by a node budget, and carries its own visited set so that a
//! cycle in persisted data (which the write path forbids) terminates the
//! branch instead of looping.

use std::collections::{HashMap, HashSet, VecDeque};

use super::member::{Member, MemberId};
use crate::error::GatewayError;

/// Maximum depth of the referral network that any computation looks at.
///
/// The business rule only ever needs seven levels; nodes deeper than this
/// are never visited.
pub const MAX_NETWORK_DEPTH: u32 = 7;

/// One node yielded by a subtree traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitedNode {
    /// Member at this position.
    pub id: MemberId,
    /// Distance from the traversal root (root itself is depth 0 and is
    /// not included in the result).
    pub depth: u32,
}

/// Result of a bounded breadth-first subtree traversal.
///
/// `truncated` and `cycle_detected` are result qualifiers, not errors: the
/// node list is always the valid, cycle-free prefix that was collected.
#[derive(Debug, Clone)]
pub struct Traversal {
    /// Descendants visited, in breadth-first order.
    pub nodes: Vec<VisitedNode>,
    /// The node budget ran out before the subtree was exhausted.
    pub truncated: bool,
    /// A node was reachable twice; the offending branch was cut.
    pub cycle_detected: bool,
}

/// Query-time adjacency index over a directory snapshot.
///
/// Built once per request batch (never per node) so traversal stays
/// O(subtree) instead of O(n²). Children are ordered by enrollment time
/// for stable output.
#[derive(Debug)]
pub struct AdjacencyIndex {
    children: HashMap<MemberId, Vec<MemberId>>,
    members: HashMap<MemberId, Member>,
}

impl AdjacencyIndex {
    /// Builds the index from a snapshot of member records.
    #[must_use]
    pub fn build(snapshot: Vec<Member>) -> Self {
        let mut children: HashMap<MemberId, Vec<MemberId>> = HashMap::new();
        let mut members = HashMap::with_capacity(snapshot.len());

        for member in snapshot {
            if let Some(sponsor_id) = member.sponsor_id {
                children.entry(sponsor_id).or_default().push(member.id);
            }
            members.insert(member.id, member);
        }

        for child_ids in children.values_mut() {
            child_ids.sort_by_key(|id| {
                members
                    .get(id)
                    .map(|m| m.joined_at)
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC)
            });
        }

        Self { children, members }
    }

    /// Returns the direct sponsees of a member (constant time).
    #[must_use]
    pub fn children_of(&self, member_id: MemberId) -> &[MemberId] {
        self.children
            .get(&member_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the member record behind an ID, if the snapshot contains it.
    #[must_use]
    pub fn member(&self, member_id: MemberId) -> Option<&Member> {
        self.members.get(&member_id)
    }

    /// Returns the number of members in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the index contains no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Breadth-first traversal of a member's subtree.
    ///
    /// Visits descendants down to `max_depth` (root is depth 0, excluded
    /// from the result) or until `node_budget` nodes have been collected.
    /// A per-call visited set cuts any branch that revisits a node, so a
    /// corrupt sponsor chain yields a partial, cycle-free result with
    /// `cycle_detected` set rather than a hang.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MemberNotFound`] if the root is not in the
    /// snapshot.
    pub fn subtree(
        &self,
        root: MemberId,
        max_depth: u32,
        node_budget: usize,
    ) -> Result<Traversal, GatewayError> {
        if !self.members.contains_key(&root) {
            return Err(GatewayError::MemberNotFound(*root.as_uuid()));
        }

        let mut nodes = Vec::new();
        let mut truncated = false;
        let mut cycle_detected = false;

        let mut visited: HashSet<MemberId> = HashSet::new();
        visited.insert(root);

        let mut queue: VecDeque<(MemberId, u32)> = VecDeque::new();
        queue.push_back((root, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for &child in self.children_of(current) {
                if !visited.insert(child) {
                    cycle_detected = true;
                    continue;
                }
                if nodes.len() >= node_budget {
                    truncated = true;
                    queue.clear();
                    break;
                }
                nodes.push(VisitedNode {
                    id: child,
                    depth: depth + 1,
                });
                queue.push_back((child, depth + 1));
            }
            if truncated {
                break;
            }
        }

        Ok(Traversal {
            nodes,
            truncated,
            cycle_detected,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::member::Member;

    /// Builds a member with an explicit sponsor link, bypassing the
    /// directory. Tests use this to assemble fixtures, including the
    /// malformed ones the write path would refuse.
    fn linked_member(name: &str, sponsor: Option<MemberId>, qualified: bool) -> Member {
        let mut member = Member::new(name.to_string());
        member.sponsor_id = sponsor;
        member.is_network_member = qualified;
        member
    }

    /// Root with `width` children, each with `width` children, `depth` deep.
    fn uniform_tree(width: usize, depth: u32) -> (Vec<Member>, MemberId) {
        let root = linked_member("root", None, true);
        let root_id = root.id;
        let mut all = vec![root];
        let mut frontier = vec![root_id];
        for level in 0..depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for i in 0..width {
                    let child =
                        linked_member(&format!("m-{level}-{i}"), Some(*parent), true);
                    next.push(child.id);
                    all.push(child);
                }
            }
            frontier = next;
        }
        (all, root_id)
    }

    #[test]
    fn unknown_root_is_not_found() {
        let index = AdjacencyIndex::build(vec![]);
        let result = index.subtree(MemberId::new(), MAX_NETWORK_DEPTH, 1000);
        assert!(matches!(result, Err(GatewayError::MemberNotFound(_))));
    }

    #[test]
    fn leaf_has_empty_subtree() {
        let member = linked_member("solo", None, true);
        let id = member.id;
        let index = AdjacencyIndex::build(vec![member]);

        let Ok(traversal) = index.subtree(id, MAX_NETWORK_DEPTH, 1000) else {
            panic!("traversal failed");
        };
        assert!(traversal.nodes.is_empty());
        assert!(!traversal.truncated);
        assert!(!traversal.cycle_detected);
    }

    #[test]
    fn visits_each_descendant_once_with_depth() {
        let (members, root) = uniform_tree(2, 3);
        let index = AdjacencyIndex::build(members);

        let Ok(traversal) = index.subtree(root, MAX_NETWORK_DEPTH, 1000) else {
            panic!("traversal failed");
        };
        // 2 + 4 + 8
        assert_eq!(traversal.nodes.len(), 14);
        assert_eq!(
            traversal.nodes.iter().filter(|n| n.depth == 1).count(),
            2
        );
        assert_eq!(
            traversal.nodes.iter().filter(|n| n.depth == 3).count(),
            8
        );
    }

    #[test]
    fn depth_cap_hides_deeper_nodes() {
        let (members, root) = uniform_tree(1, 10);
        let index = AdjacencyIndex::build(members);

        let Ok(traversal) = index.subtree(root, MAX_NETWORK_DEPTH, 1000) else {
            panic!("traversal failed");
        };
        assert_eq!(traversal.nodes.len(), 7);
        assert!(traversal.nodes.iter().all(|n| n.depth <= MAX_NETWORK_DEPTH));
        assert!(!traversal.truncated);
    }

    #[test]
    fn node_budget_truncates() {
        let (members, root) = uniform_tree(3, 3);
        let index = AdjacencyIndex::build(members);

        let Ok(traversal) = index.subtree(root, MAX_NETWORK_DEPTH, 5) else {
            panic!("traversal failed");
        };
        assert_eq!(traversal.nodes.len(), 5);
        assert!(traversal.truncated);
    }

    #[test]
    fn cycle_yields_partial_prefix() {
        // a → b → c, with c's child list corrupted to point back at a.
        let a = linked_member("a", None, true);
        let a_id = a.id;
        let b = linked_member("b", Some(a_id), true);
        let b_id = b.id;
        let c = linked_member("c", Some(b_id), true);
        let c_id = c.id;
        let stray = linked_member("stray", Some(a_id), true);
        let stray_id = stray.id;

        let mut index = AdjacencyIndex::build(vec![a, b, c, stray]);
        index.children.entry(c_id).or_default().push(a_id);

        let Ok(traversal) = index.subtree(a_id, MAX_NETWORK_DEPTH, 1000) else {
            panic!("traversal failed");
        };
        assert!(traversal.cycle_detected);
        let ids: Vec<MemberId> = traversal.nodes.iter().map(|n| n.id).collect();
        assert!(ids.contains(&b_id));
        assert!(ids.contains(&c_id));
        assert!(ids.contains(&stray_id));
        // The back edge to the root was cut, not followed.
        assert!(!ids.contains(&a_id));
    }

    #[test]
    fn children_ordered_by_enrollment() {
        let root = linked_member("root", None, true);
        let root_id = root.id;
        let mut older = linked_member("older", Some(root_id), true);
        older.joined_at = chrono::Utc::now() - chrono::Duration::days(10);
        let older_id = older.id;
        let newer = linked_member("newer", Some(root_id), true);

        let index = AdjacencyIndex::build(vec![root, newer, older]);
        let children = index.children_of(root_id);
        assert_eq!(children.first().copied(), Some(older_id));
    }
}
