//! PostgreSQL implementation of the persistence layer.
//!
//! Write-through mirror of the in-memory directory and ledger, plus an
//! append-only event log. The `reward_claims` table is where the
//! `(member_id, level)` uniqueness and the optimistic status check are
//! enforced durably: claim inserts are conditional and status updates are
//! guarded by the expected status and version.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{ClaimRow, MemberRow, StoredEvent};
use crate::config::GatewayConfig;
use crate::domain::{Member, RewardClaim};
use crate::error::GatewayError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL using the pool settings from config.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the pool cannot be
    /// established.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Upserts a member row.
    ///
    /// Identity fields are insert-only; the sponsor link and qualifying
    /// flag follow the in-memory record.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn save_member(&self, member: &Member) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO members (id, full_name, referral_code, sponsor_id, is_network_member, joined_at, qualified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
               sponsor_id = EXCLUDED.sponsor_id, \
               is_network_member = EXCLUDED.is_network_member, \
               qualified_at = EXCLUDED.qualified_at",
        )
        .bind(member.id.as_uuid())
        .bind(&member.full_name)
        .bind(&member.referral_code)
        .bind(member.sponsor_id.map(|id| *id.as_uuid()))
        .bind(member.is_network_member)
        .bind(member.joined_at)
        .bind(member.qualified_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Loads every member row, oldest enrollment first.
    ///
    /// Used once at startup to rehydrate the in-memory directory.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn load_members(&self) -> Result<Vec<MemberRow>, GatewayError> {
        type Row = (
            Uuid,
            String,
            String,
            Option<Uuid>,
            bool,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
        );

        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, full_name, referral_code, sponsor_id, is_network_member, joined_at, qualified_at \
             FROM members ORDER BY joined_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, full_name, referral_code, sponsor_id, is_network_member, joined_at, qualified_at)| {
                    MemberRow {
                        id,
                        full_name,
                        referral_code,
                        sponsor_id,
                        is_network_member,
                        joined_at,
                        qualified_at,
                    }
                },
            )
            .collect())
    }

    /// Conditionally inserts a claim row.
    ///
    /// Leans on the unique index on `(member_id, level)`: returns `true`
    /// when the row was inserted, `false` when a claim for the pair
    /// already existed (the insert was a no-op).
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn insert_claim(&self, claim: &RewardClaim) -> Result<bool, GatewayError> {
        let level = i32::try_from(claim.level)
            .map_err(|_| GatewayError::PersistenceError("level out of range".to_string()))?;

        let result = sqlx::query(
            "INSERT INTO reward_claims (id, member_id, level, status, note, claimed_at, processed_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (member_id, level) DO NOTHING",
        )
        .bind(claim.id.as_uuid())
        .bind(claim.member_id.as_uuid())
        .bind(level)
        .bind(claim.status.as_str())
        .bind(&claim.note)
        .bind(claim.claimed_at)
        .bind(claim.processed_at)
        .bind(claim.version)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Applies a status- and version-guarded claim update.
    ///
    /// The `WHERE` clause carries the status and version the caller read,
    /// so a lost-update race results in zero affected rows instead of an
    /// overwrite. Returns `true` when the update landed.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn update_claim_status(
        &self,
        claim: &RewardClaim,
        previous_status: &str,
        previous_version: i64,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE reward_claims SET status = $2, note = $3, processed_at = $4, version = $5 \
             WHERE id = $1 AND status = $6 AND version = $7",
        )
        .bind(claim.id.as_uuid())
        .bind(claim.status.as_str())
        .bind(&claim.note)
        .bind(claim.processed_at)
        .bind(claim.version)
        .bind(previous_status)
        .bind(previous_version)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Loads claims, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn load_claims(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<ClaimRow>, GatewayError> {
        type Row = (
            Uuid,
            Uuid,
            i32,
            String,
            Option<String>,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
            i64,
        );

        let rows = if let Some(status) = status_filter {
            sqlx::query_as::<_, Row>(
                "SELECT id, member_id, level, status, note, claimed_at, processed_at, version \
                 FROM reward_claims WHERE status = $1 ORDER BY claimed_at DESC",
            )
            .bind(status)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Row>(
                "SELECT id, member_id, level, status, note, claimed_at, processed_at, version \
                 FROM reward_claims ORDER BY claimed_at DESC",
            )
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, member_id, level, status, note, claimed_at, processed_at, version)| {
                    ClaimRow {
                        id,
                        member_id,
                        level,
                        status,
                        note,
                        claimed_at,
                        processed_at,
                        version,
                    }
                },
            )
            .collect())
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn save_event(
        &self,
        member_id: Uuid,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, GatewayError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (member_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(member_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Loads events after the given timestamp, optionally filtered by member.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn load_events_after(
        &self,
        after: DateTime<Utc>,
        member_id: Option<Uuid>,
    ) -> Result<Vec<StoredEvent>, GatewayError> {
        type Row = (i64, Uuid, String, serde_json::Value, DateTime<Utc>);

        let rows = if let Some(mid) = member_id {
            sqlx::query_as::<_, Row>(
                "SELECT id, member_id, event_type, payload, created_at FROM events \
                 WHERE created_at > $1 AND member_id = $2 ORDER BY created_at ASC",
            )
            .bind(after)
            .bind(mid)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Row>(
                "SELECT id, member_id, event_type, payload, created_at FROM events \
                 WHERE created_at > $1 ORDER BY created_at ASC",
            )
            .bind(after)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, member_id, event_type, payload, created_at)| StoredEvent {
                    id,
                    member_id,
                    event_type,
                    payload,
                    created_at,
                },
            )
            .collect())
    }
}
