//! Persistence layer: PostgreSQL member/claim mirror and event log.
//!
//! The in-memory directory and ledger serve requests; this layer keeps a
//! durable write-through copy and holds the unique `(member_id, level)`
//! constraint that makes claim creation exactly-once across processes.

pub mod models;
pub mod postgres;

pub use postgres::PostgresStore;
