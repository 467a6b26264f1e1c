//! Dashboard and graph DTOs for the network read endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{LevelStat, MemberId};
use crate::service::{GraphNode, MemberDashboard};

/// One level row in the dashboard response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LevelStatDto {
    /// Level number, 1 through 7.
    pub level: u32,
    /// Qualifying members at exactly this depth.
    pub count: u64,
    /// Required count for completion.
    pub target: u64,
    /// Whether the level is complete.
    pub is_completed: bool,
    /// Progress percentage, two decimals, capped at 100.
    pub progress: f64,
    /// Presentation-only flag: level 1, or the previous level completed.
    ///
    /// Derived here, not in the aggregator — the engine does not gate a
    /// level's counts on shallower levels.
    pub unlocked: bool,
}

/// A direct sponsee in the dashboard response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DirectReferralDto {
    /// Display name.
    pub name: String,
    /// Enrollment timestamp.
    pub joined_at: DateTime<Utc>,
    /// Whether the sponsee is a qualifying member.
    pub is_network_member: bool,
}

/// Response body for `GET /network/dashboard/{member_id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Display name.
    pub full_name: String,
    /// The member's referral code.
    pub referral_code: String,
    /// Whether the member is a qualifying network member.
    pub is_member: bool,
    /// Seven level rows, in order.
    pub levels: Vec<LevelStatDto>,
    /// Qualifying descendants across all seven levels.
    pub total_team_size: u64,
    /// Direct sponsees, ordered by enrollment time.
    pub direct_referrals: Vec<DirectReferralDto>,
}

impl From<MemberDashboard> for DashboardResponse {
    fn from(dashboard: MemberDashboard) -> Self {
        let levels = unlocked_levels(&dashboard.stats.levels);
        Self {
            full_name: dashboard.full_name,
            referral_code: dashboard.referral_code,
            is_member: dashboard.is_member,
            levels,
            total_team_size: dashboard.stats.total_team_size,
            direct_referrals: dashboard
                .direct_referrals
                .into_iter()
                .map(|m| DirectReferralDto {
                    name: m.full_name,
                    joined_at: m.joined_at,
                    is_network_member: m.is_network_member,
                })
                .collect(),
        }
    }
}

/// Derives the presentation `unlocked` flag for each level row.
fn unlocked_levels(stats: &[LevelStat]) -> Vec<LevelStatDto> {
    let mut previous_completed = true;
    stats
        .iter()
        .map(|stat| {
            let dto = LevelStatDto {
                level: stat.level,
                count: stat.count,
                target: stat.target,
                is_completed: stat.is_completed,
                progress: stat.progress,
                unlocked: previous_completed,
            };
            previous_completed = stat.is_completed;
            dto
        })
        .collect()
}

/// One node of the graph response for `GET /network/graph/{member_id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GraphNodeDto {
    /// Member identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Depth below the requested root.
    pub level: u32,
    /// `"qualified"` or `"guest"`.
    pub status: String,
    /// Qualifying descendants within the depth cap.
    pub team_size: u64,
    /// Direct sponsees, recursively.
    pub children: Vec<GraphNodeDto>,
}

impl From<GraphNode> for GraphNodeDto {
    fn from(node: GraphNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            level: node.level,
            status: node.status.to_string(),
            team_size: node.team_size,
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::level_target;

    fn stat(level: u32, count: u64) -> LevelStat {
        let target = level_target(level);
        LevelStat {
            level,
            count,
            target,
            is_completed: count >= target,
            progress: 0.0,
        }
    }

    #[test]
    fn level_one_is_always_unlocked() {
        let stats = vec![stat(1, 0), stat(2, 0)];
        let dtos = unlocked_levels(&stats);
        assert_eq!(
            dtos.iter().map(|d| d.unlocked).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn unlock_follows_previous_completion() {
        let stats = vec![stat(1, 5), stat(2, 3), stat(3, 0)];
        let dtos = unlocked_levels(&stats);
        assert_eq!(
            dtos.iter().map(|d| d.unlocked).collect::<Vec<_>>(),
            vec![true, true, false]
        );
    }

    #[test]
    fn unlock_is_not_gated_on_counts() {
        // Deep level counts are preserved even while locked.
        let stats = vec![stat(1, 2), stat(2, 30)];
        let dtos = unlocked_levels(&stats);
        let Some(level2) = dtos.get(1) else {
            panic!("missing level 2");
        };
        assert!(!level2.unlocked);
        assert_eq!(level2.count, 30);
        assert!(level2.is_completed);
    }
}
