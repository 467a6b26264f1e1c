//! Service layer: orchestration of network queries and claim lifecycle.

pub mod claim_service;
pub mod network_service;

pub use claim_service::{ClaimDetails, ClaimService};
pub use network_service::{GraphNode, MemberDashboard, NetworkService};
