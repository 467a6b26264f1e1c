//! Domain layer: member model, referral graph, level math, and claims.
//!
//! This module contains the server-side domain model: member identity and
//! the sponsor forest, the query-time adjacency index with bounded
//! traversal, per-level aggregation, the reward-claim state machine with
//! its uniqueness ledger, and the event bus that broadcasts state changes.

pub mod claim;
pub mod directory;
pub mod graph;
pub mod ledger;
pub mod levels;
pub mod member;
pub mod network_event;

pub use claim::{ClaimId, ClaimStatus, RewardClaim};
pub use directory::MemberDirectory;
pub use graph::{AdjacencyIndex, MAX_NETWORK_DEPTH, Traversal};
pub use ledger::ClaimLedger;
pub use levels::{LevelStat, NetworkStats, REWARDED_LEVELS, level_target};
pub use member::{Member, MemberId};
pub use network_event::{EventBus, NetworkEvent};
