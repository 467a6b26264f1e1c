//! Per-level team-size aggregation and completion math.
//!
//! Turns a rooted [`Traversal`] into the seven-entry level table: how many
//! qualifying members sit at each depth, how far each level is from its
//! exponential target, and which levels are complete. Aggregation is a
//! pure function of the traversal snapshot; running it twice with no
//! intervening writes yields identical output.

use serde::Serialize;

use super::graph::{AdjacencyIndex, MAX_NETWORK_DEPTH, Traversal};

/// Levels that carry a reward on completion.
pub const REWARDED_LEVELS: [u32; 4] = [1, 3, 5, 7];

/// Required member count per level: `5^level`.
///
/// Each member must sponsor five qualifying members to fill one level, and
/// the width compounds through the subtree.
#[must_use]
pub const fn level_target(level: u32) -> u64 {
    5u64.pow(level)
}

/// Derived statistics for a single level of a member's network.
///
/// Not persisted; recomputed per query from the graph snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelStat {
    /// Level number, 1 through 7.
    pub level: u32,
    /// Qualifying members at exactly this depth from the root.
    pub count: u64,
    /// Required count for completion (`5^level`).
    pub target: u64,
    /// `count >= target`.
    pub is_completed: bool,
    /// `min(100, 100 · count / target)`, rounded to two decimals.
    pub progress: f64,
}

impl LevelStat {
    fn compute(level: u32, count: u64) -> Self {
        let target = level_target(level);
        #[allow(clippy::cast_precision_loss)]
        let raw = 100.0 * count as f64 / target as f64;
        let progress = (raw.min(100.0) * 100.0).round() / 100.0;
        Self {
            level,
            count,
            target,
            is_completed: count >= target,
            progress,
        }
    }
}

/// Aggregated network statistics for one root member.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    /// One entry per level, 1 through 7, in order.
    pub levels: Vec<LevelStat>,
    /// Sum of qualifying descendants across all seven levels.
    pub total_team_size: u64,
    /// The traversal hit its node budget; counts are a lower bound.
    pub truncated: bool,
    /// A data-integrity anomaly was detected; counts cover the clean
    /// prefix of the subtree only.
    pub degraded: bool,
}

/// Buckets a traversal by depth and derives the level table.
///
/// Only qualifying (`is_network_member`) nodes are counted; the root
/// itself (depth 0) is excluded. Completion is evaluated per level
/// independently — a deep level may fill while a shallow one is still
/// short. Sequential "unlock" gating is presentation policy and lives in
/// the DTO layer, not here.
#[must_use]
pub fn aggregate(traversal: &Traversal, index: &AdjacencyIndex) -> NetworkStats {
    let mut counts = [0u64; MAX_NETWORK_DEPTH as usize];

    for node in &traversal.nodes {
        if node.depth == 0 || node.depth > MAX_NETWORK_DEPTH {
            continue;
        }
        let qualifying = index.member(node.id).is_some_and(|m| m.is_network_member);
        if qualifying
            && let Some(slot) = counts.get_mut((node.depth - 1) as usize)
        {
            *slot += 1;
        }
    }

    let levels: Vec<LevelStat> = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| LevelStat::compute(i as u32 + 1, count))
        .collect();
    let total_team_size = counts.iter().sum();

    NetworkStats {
        levels,
        total_team_size,
        truncated: traversal.truncated,
        degraded: traversal.cycle_detected,
    }
}
