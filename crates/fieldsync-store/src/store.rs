//! SQLite implementation of ILocalStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! local-store port defined in fieldsync-core. It handles all domain type
//! serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                  |
//! |------------------|----------|-------------------------------------------|
//! | RecordId         | TEXT     | String via `.as_str()` / `RecordId::new()`|
//! | EntityKind       | TEXT     | String via `.as_str()` / `EntityKind::new()` |
//! | Scope            | TEXT     | String via `.as_str()` / `Scope::new()`   |
//! | Fields           | TEXT     | serde_json serialization                  |
//! | MutationAction   | TEXT     | `as_str()` / `parse()`                    |
//! | MutationStatus   | TEXT     | `as_str()` / `parse()`                    |
//! | DateTime<Utc>    | TEXT     | ISO 8601 via `to_rfc3339()` / `parse_from_rfc3339()` |
//!
//! ## Write-path atomicity
//!
//! `put` and `delete` open one SQL transaction covering the record row and
//! the queue row(s). A crash between the two steps can therefore never leave
//! a dirty record without its queue entry or vice versa.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use fieldsync_core::domain::{
    record::Fields, CachedToken, EntityKind, Mutation, MutationAction, MutationStatus, Record,
    RecordDraft, RecordId, Scope,
};
use fieldsync_core::ports::{IClock, ILocalStore};

use crate::StoreError;

/// SQLite-based implementation of the local-store port
///
/// All operations go through a connection pool; the injected clock stamps
/// every write so tests control time.
pub struct SqliteLocalStore {
    pool: SqlitePool,
    clock: Arc<dyn IClock>,
}

impl SqliteLocalStore {
    /// Creates a new store instance with the given connection pool and clock
    pub fn new(pool: SqlitePool, clock: Arc<dyn IClock>) -> Self {
        Self { pool, clock }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Serialize a fields map for storage
fn fields_to_json(fields: &Fields) -> Result<String, StoreError> {
    serde_json::to_string(fields)
        .map_err(|e| StoreError::SerializationError(format!("Failed to serialize fields: {}", e)))
}

/// Deserialize a fields map from its stored form
fn fields_from_json(s: &str) -> Result<Fields, StoreError> {
    serde_json::from_str(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid fields JSON: {}", e)))
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a Record from a database row
fn record_from_row(row: &SqliteRow) -> Result<Record, StoreError> {
    let kind_str: String = row.get("kind");
    let id_str: String = row.get("id");
    let fields_str: String = row.get("fields");
    let last_modified_str: String = row.get("last_modified");
    let is_offline_created: bool = row.get("is_offline_created");
    let needs_sync: bool = row.get("needs_sync");

    let kind = EntityKind::new(kind_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityKind '{}': {}", kind_str, e))
    })?;
    let id = RecordId::from_str(&id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid RecordId '{}': {}", id_str, e))
    })?;

    Ok(Record {
        id,
        kind,
        fields: fields_from_json(&fields_str)?,
        last_modified: parse_datetime(&last_modified_str)?,
        is_offline_created,
        needs_sync,
    })
}

/// Reconstruct a Mutation from a database row
fn mutation_from_row(row: &SqliteRow) -> Result<Mutation, StoreError> {
    let id: i64 = row.get("id");
    let kind_str: String = row.get("kind");
    let action_str: String = row.get("action");
    let entity_id_str: String = row.get("entity_id");
    let payload_str: Option<String> = row.get("payload");
    let revision: i64 = row.get("revision");
    let status_str: String = row.get("status");
    let retry_count: i64 = row.get("retry_count");
    let enqueued_at_str: String = row.get("enqueued_at");
    let last_attempt_str: Option<String> = row.get("last_attempt");
    let last_error: Option<String> = row.get("last_error");
    let completed_at_str: Option<String> = row.get("completed_at");

    let kind = EntityKind::new(kind_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityKind '{}': {}", kind_str, e))
    })?;
    let entity_id = RecordId::from_str(&entity_id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid RecordId '{}': {}", entity_id_str, e))
    })?;
    let action = MutationAction::parse(&action_str)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;
    let status = MutationStatus::parse(&status_str)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;

    let payload = match payload_str {
        Some(ref s) if !s.is_empty() => Some(fields_from_json(s)?),
        _ => None,
    };

    Ok(Mutation {
        id,
        kind,
        action,
        entity_id,
        payload,
        revision,
        status,
        retry_count: retry_count as u32,
        enqueued_at: parse_datetime(&enqueued_at_str)?,
        last_attempt: parse_optional_datetime(last_attempt_str)?,
        last_error,
        completed_at: parse_optional_datetime(completed_at_str)?,
    })
}

/// Reconstruct a CachedToken from a database row
fn token_from_row(row: &SqliteRow) -> Result<CachedToken, StoreError> {
    let scope_str: String = row.get("scope");
    let access_token: String = row.get("access_token");
    let expires_at_str: String = row.get("expires_at");

    let scope = Scope::new(scope_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid Scope '{}': {}", scope_str, e))
    })?;

    Ok(CachedToken {
        scope,
        access_token,
        expires_at: parse_datetime(&expires_at_str)?,
    })
}

// ============================================================================
// ILocalStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalStore for SqliteLocalStore {
    // --- Record operations ---

    async fn get_all(&self, kind: &EntityKind) -> anyhow::Result<Vec<Record>> {
        let rows = sqlx::query("SELECT * FROM records WHERE kind = ? ORDER BY last_modified ASC")
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }

    async fn get(&self, kind: &EntityKind, id: &RecordId) -> anyhow::Result<Option<Record>> {
        let row = sqlx::query("SELECT * FROM records WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        kind: &EntityKind,
        draft: RecordDraft,
        from_server: bool,
    ) -> anyhow::Result<Record> {
        let now = self.clock.now();

        let id = match draft.id {
            Some(id) => id,
            None => RecordId::new_offline(now),
        };
        // A record is offline-created exactly while it carries a placeholder
        // id; the id-remap after a successful CREATE upload clears this.
        let is_offline_created = id.is_offline();
        let needs_sync = !from_server;

        let record = Record {
            id,
            kind: kind.clone(),
            fields: draft.fields,
            last_modified: now,
            is_offline_created,
            needs_sync,
        };

        let fields_json = fields_to_json(&record.fields)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO records \
             (kind, id, fields, last_modified, is_offline_created, needs_sync) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(kind.as_str())
        .bind(record.id.as_str())
        .bind(&fields_json)
        .bind(record.last_modified.to_rfc3339())
        .bind(record.is_offline_created)
        .bind(record.needs_sync)
        .execute(&mut *tx)
        .await?;

        if !from_server {
            // One pending entry per dirty record: a second local edit
            // refreshes the existing entry's snapshot instead of appending.
            // The entry's original action and queue position are kept, so an
            // edited-but-unconfirmed offline create still uploads as CREATE.
            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM mutations \
                 WHERE kind = ? AND entity_id = ? AND status = 'pending' \
                 ORDER BY id ASC LIMIT 1",
            )
            .bind(kind.as_str())
            .bind(record.id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(mutation_id) => {
                    // Bumping the revision is what keeps a concurrent drain
                    // from confirming this entry under its old snapshot.
                    sqlx::query(
                        "UPDATE mutations SET payload = ?, revision = revision + 1 \
                         WHERE id = ?",
                    )
                    .bind(&fields_json)
                    .bind(mutation_id)
                    .execute(&mut *tx)
                    .await?;
                    tracing::trace!(mutation_id, "Refreshed pending mutation payload");
                }
                None => {
                    let action = if record.id.is_offline() {
                        MutationAction::Create
                    } else {
                        MutationAction::Update
                    };
                    sqlx::query(
                        "INSERT INTO mutations \
                         (kind, action, entity_id, payload, status, retry_count, enqueued_at) \
                         VALUES (?, ?, ?, ?, 'pending', 0, ?)",
                    )
                    .bind(kind.as_str())
                    .bind(action.as_str())
                    .bind(record.id.as_str())
                    .bind(&fields_json)
                    .bind(now.to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                    tracing::trace!(
                        kind = %kind,
                        entity_id = %record.id,
                        action = action.as_str(),
                        "Enqueued mutation"
                    );
                }
            }
        }

        tx.commit().await?;

        tracing::trace!(kind = %kind, id = %record.id, from_server, "Saved record");
        Ok(record)
    }

    async fn delete(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        from_server: bool,
    ) -> anyhow::Result<()> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        if !from_server {
            if id.is_offline() {
                // Never confirmed to the server: nothing to delete remotely.
                // The pending CREATE is superseded, so drop it here instead
                // of letting the drain upload a record the caller discarded.
                let cancelled = sqlx::query(
                    "DELETE FROM mutations \
                     WHERE kind = ? AND entity_id = ? AND status = 'pending'",
                )
                .bind(kind.as_str())
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
                tracing::trace!(
                    kind = %kind,
                    entity_id = %id,
                    cancelled,
                    "Cancelled pending mutations for discarded offline record"
                );
            } else {
                // Pending updates for this entity are superseded by the
                // delete; the DELETE request makes them moot remotely.
                sqlx::query(
                    "DELETE FROM mutations \
                     WHERE kind = ? AND entity_id = ? AND status = 'pending'",
                )
                .bind(kind.as_str())
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO mutations \
                     (kind, action, entity_id, payload, status, retry_count, enqueued_at) \
                     VALUES (?, 'delete', ?, NULL, 'pending', 0, ?)",
                )
                .bind(kind.as_str())
                .bind(id.as_str())
                .bind(now.to_rfc3339())
                .execute(&mut *tx)
                .await?;
                tracing::trace!(kind = %kind, entity_id = %id, "Enqueued delete mutation");
            }
        }

        tx.commit().await?;

        tracing::trace!(kind = %kind, id = %id, from_server, "Deleted record");
        Ok(())
    }

    // --- Mutation queue operations ---

    async fn pending_mutations(&self) -> anyhow::Result<Vec<Mutation>> {
        let rows = sqlx::query("SELECT * FROM mutations WHERE status = 'pending' ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut mutations = Vec::with_capacity(rows.len());
        for row in &rows {
            mutations.push(mutation_from_row(row)?);
        }
        Ok(mutations)
    }

    async fn all_mutations(&self) -> anyhow::Result<Vec<Mutation>> {
        let rows = sqlx::query("SELECT * FROM mutations ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut mutations = Vec::with_capacity(rows.len());
        for row in &rows {
            mutations.push(mutation_from_row(row)?);
        }
        Ok(mutations)
    }

    async fn mark_mutation_completed(&self, id: i64, revision: i64) -> anyhow::Result<bool> {
        let now = self.clock.now();

        let row = sqlx::query("SELECT * FROM mutations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("mutation {id}")))?;

        let mut mutation = mutation_from_row(&row)?;
        mutation.mark_completed(now)?;

        // Guarded on the revision the caller drained: a local edit that
        // refreshed the snapshot while the upload was in flight bumps the
        // revision, the UPDATE matches no row, and the entry stays pending
        // so the newer snapshot goes out on the next pass.
        let updated = sqlx::query(
            "UPDATE mutations SET status = ?, completed_at = ? \
             WHERE id = ? AND revision = ?",
        )
        .bind(mutation.status.as_str())
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(revision)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            tracing::debug!(
                mutation_id = id,
                "Mutation refreshed while in flight; left pending"
            );
            return Ok(false);
        }

        tracing::trace!(mutation_id = id, "Marked mutation completed");
        Ok(true)
    }

    async fn mark_mutation_failed(&self, id: i64, error: &str, ceiling: u32) -> anyhow::Result<()> {
        let now = self.clock.now();

        let row = sqlx::query("SELECT * FROM mutations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("mutation {id}")))?;

        let mut mutation = mutation_from_row(&row)?;
        mutation.mark_failed(error, now, ceiling)?;

        sqlx::query(
            "UPDATE mutations \
             SET status = ?, retry_count = ?, last_attempt = ?, last_error = ? \
             WHERE id = ?",
        )
        .bind(mutation.status.as_str())
        .bind(mutation.retry_count as i64)
        .bind(now.to_rfc3339())
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        tracing::trace!(
            mutation_id = id,
            retry_count = mutation.retry_count,
            status = mutation.status.as_str(),
            "Marked mutation failed"
        );
        Ok(())
    }

    async fn pending_count(&self) -> anyhow::Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM mutations WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn reap_completed(&self, older_than: DateTime<Utc>) -> anyhow::Result<u64> {
        let reaped = sqlx::query(
            "DELETE FROM mutations WHERE status = 'completed' AND completed_at < ?",
        )
        .bind(older_than.to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if reaped > 0 {
            tracing::debug!(reaped, "Reaped completed mutations");
        }
        Ok(reaped)
    }

    // --- Token cache operations ---

    async fn save_token(&self, token: &CachedToken) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO tokens (scope, access_token, expires_at) VALUES (?, ?, ?)",
        )
        .bind(token.scope.as_str())
        .bind(&token.access_token)
        .bind(token.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(scope = %token.scope, "Cached access token");
        Ok(())
    }

    async fn get_valid_token(&self, scope: &Scope) -> anyhow::Result<Option<CachedToken>> {
        let row = sqlx::query("SELECT * FROM tokens WHERE scope = ?")
            .bind(scope.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(ref row) = row else {
            return Ok(None);
        };

        let token = token_from_row(row)?;
        if token.is_expired(self.clock.now()) {
            sqlx::query("DELETE FROM tokens WHERE scope = ?")
                .bind(scope.as_str())
                .execute(&self.pool)
                .await?;
            tracing::debug!(scope = %scope, "Discarded expired cached token");
            return Ok(None);
        }

        Ok(Some(token))
    }
}

// ============================================================================
// Tests
// ============================================================================
