//! Local store port (driven/secondary port)
//!
//! This module defines the interface for the durable local record store,
//! the mutation queue, and the token cache. One trait covers all three
//! because their consistency is a single concern: a caller-facing write and
//! its queue entry must commit in the same storage transaction.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory, etc.) and don't need domain-level classification;
//!   they propagate to the immediate caller rather than being deferred.
//! - `put` and `delete` take a `from_server` flag: server-sourced writes
//!   bypass the queue entirely, which is what prevents the download phase
//!   from feeding the upload phase in a loop.

use chrono::{DateTime, Utc};

use crate::domain::{
    CachedToken, EntityKind, Mutation, Record, RecordDraft, RecordId, Scope,
};

/// Port trait for persistent local storage
///
/// ## Consistency contract
///
/// For every record with `needs_sync = true` there exists a pending or
/// failed queue entry with a matching `entity_id`; implementations keep the
/// two consistent by writing record and queue entry inside one transaction.
/// A crash must never leave a dirty record without its queue entry, nor a
/// queue entry referring to a vanished record.
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    // --- Record operations ---

    /// Returns every record of the given kind
    async fn get_all(&self, kind: &EntityKind) -> anyhow::Result<Vec<Record>>;

    /// Retrieves a single record by kind and id
    async fn get(&self, kind: &EntityKind, id: &RecordId) -> anyhow::Result<Option<Record>>;

    /// Writes a record (insert or update) and returns the stored form
    ///
    /// Sets `last_modified` to the current time. Drafts without an id get a
    /// freshly synthesized offline placeholder id and `is_offline_created =
    /// true`. `needs_sync` is set to `!from_server`.
    ///
    /// When `from_server` is false, a `Create` (placeholder id) or `Update`
    /// (real id) mutation is enqueued atomically with the record write.
    /// When `from_server` is true, no mutation is enqueued.
    async fn put(
        &self,
        kind: &EntityKind,
        draft: RecordDraft,
        from_server: bool,
    ) -> anyhow::Result<Record>;

    /// Removes a record
    ///
    /// When `from_server` is false and the id is server-issued, a `Delete`
    /// mutation is enqueued atomically. Deleting a placeholder-id record
    /// enqueues nothing (the server never heard of it); its pending `Create`
    /// entries are cancelled in the same transaction.
    async fn delete(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        from_server: bool,
    ) -> anyhow::Result<()>;

    // --- Mutation queue operations ---

    /// Returns all `Pending` queue entries in enqueue (FIFO) order
    async fn pending_mutations(&self) -> anyhow::Result<Vec<Mutation>>;

    /// Returns every queue entry regardless of status, in enqueue order
    ///
    /// This is the review surface for permanently failed entries.
    async fn all_mutations(&self) -> anyhow::Result<Vec<Mutation>>;

    /// Marks a queue entry's round trip confirmed
    ///
    /// `revision` is the value the caller read when it drained the entry.
    /// If a later local edit refreshed the entry's payload in the meantime,
    /// the entry is left `Pending` so the newer snapshot uploads on the next
    /// pass, and `false` is returned. Returns `true` when the entry was
    /// actually completed.
    async fn mark_mutation_completed(&self, id: i64, revision: i64) -> anyhow::Result<bool>;

    /// Records a failed attempt on a queue entry
    ///
    /// Applies the retry-ceiling transition: under `ceiling` the entry
    /// returns to `Pending`, at the ceiling it becomes permanently `Failed`.
    async fn mark_mutation_failed(
        &self,
        id: i64,
        error: &str,
        ceiling: u32,
    ) -> anyhow::Result<()>;

    /// Number of `Pending` queue entries
    async fn pending_count(&self) -> anyhow::Result<u64>;

    /// Physically removes `Completed` entries finished before `older_than`
    ///
    /// Returns the number of reaped rows.
    async fn reap_completed(&self, older_than: DateTime<Utc>) -> anyhow::Result<u64>;

    // --- Token cache operations ---

    /// Persists the most recently obtained token for its scope
    async fn save_token(&self, token: &CachedToken) -> anyhow::Result<()>;

    /// Returns the cached token for `scope` if it has not expired
    ///
    /// Expired entries are discarded on read.
    async fn get_valid_token(&self, scope: &Scope) -> anyhow::Result<Option<CachedToken>>;
}
