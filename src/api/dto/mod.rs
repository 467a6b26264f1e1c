//! Data Transfer Objects for REST request/response serialization.

pub mod claim_dto;
pub mod common_dto;
pub mod member_dto;
pub mod network_dto;

pub use claim_dto::*;
pub use common_dto::*;
pub use member_dto::*;
pub use network_dto::*;
