//! Bidirectional synchronization engine
//!
//! The [`SyncEngine`] orchestrates one full sync pass between the local
//! store and the remote record store.
//!
//! ## Sync Flow
//!
//! 1. **Guards**: reentrancy (atomic flag) and connectivity; a pass that
//!    cannot run is reported, not errored
//! 2. **Token**: silent acquisition via the identity provider, falling back
//!    to the cached token; fresh tokens are persisted
//! 3. **Download** (pull): list each configured kind, write every record
//!    with `from_server = true`
//! 4. **Upload** (push): drain pending queue entries in enqueue order;
//!    successful CREATEs remap the placeholder id to the server id
//! 5. **Bookkeeping**: clear the syncing flag, recompute the pending count,
//!    broadcast the final status
//!
//! Remote failures never abort the pass: download failures are per-kind,
//! upload failures are per-entry and recorded as queue state through the
//! retry ceiling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::{debug, info, warn};

use fieldsync_core::domain::record::Fields;
use fieldsync_core::domain::{
    EntityKind, Mutation, MutationAction, RecordDraft, RecordId, Scope, SyncStatus,
};
use fieldsync_core::ports::{IClock, IIdentityProvider, ILocalStore, IRemoteStore};

use crate::broadcast::StatusBroadcaster;
use crate::policy::RetryPolicy;

// ============================================================================
// SyncReport
// ============================================================================

/// Summary of a sync pass
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Whether a pass actually ran to its end
    pub success: bool,
    /// Human-readable outcome ("sync complete", "device is offline", ...)
    pub message: String,
    /// Records written locally during the download phase
    pub downloaded: u32,
    /// Queue entries confirmed during the upload phase
    pub uploaded: u32,
    /// Per-kind download failures plus per-entry upload failures
    pub failed: u32,
}

impl SyncReport {
    fn skipped(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            downloaded: 0,
            uploaded: 0,
            failed: 0,
        }
    }
}

// ============================================================================
// Local metadata stripping
// ============================================================================

/// Attribute names that belong to the local store, never to the remote
const LOCAL_ONLY_FIELDS: [&str; 4] = ["id", "last_modified", "is_offline_created", "needs_sync"];

/// Removes local bookkeeping attributes from an upload payload
///
/// Payloads are written without these by construction; the strip guards
/// against snapshots enqueued by older store versions.
fn strip_local_metadata(mut fields: Fields) -> Fields {
    for key in LOCAL_ONLY_FIELDS {
        fields.remove(key);
    }
    fields
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Download-then-upload synchronization engine
///
/// ## Dependencies
///
/// - `local`: durable records, mutation queue, and token cache
/// - `remote`: the HTTP record store
/// - `identity`: silent token acquisition
/// - `clock`: injected time source for expiry and retention arithmetic
///
/// The `online` flag is shared with the [`NetworkMonitor`]; the engine only
/// reads it.
///
/// [`NetworkMonitor`]: crate::monitor::NetworkMonitor
pub struct SyncEngine {
    local: Arc<dyn ILocalStore>,
    remote: Arc<dyn IRemoteStore>,
    identity: Arc<dyn IIdentityProvider>,
    clock: Arc<dyn IClock>,
    broadcaster: Arc<StatusBroadcaster>,
    online: Arc<AtomicBool>,
    /// Entity kinds synchronized by every pass, in configuration order
    kinds: Vec<EntityKind>,
    /// Scope requested for remote-store access tokens
    scope: Scope,
    policy: RetryPolicy,
    /// Reentrancy guard; at most one pass runs at a time
    syncing: AtomicBool,
}

impl SyncEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local: Arc<dyn ILocalStore>,
        remote: Arc<dyn IRemoteStore>,
        identity: Arc<dyn IIdentityProvider>,
        clock: Arc<dyn IClock>,
        broadcaster: Arc<StatusBroadcaster>,
        online: Arc<AtomicBool>,
        kinds: Vec<EntityKind>,
        scope: Scope,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            local,
            remote,
            identity,
            clock,
            broadcaster,
            online,
            kinds,
            scope,
            policy,
            syncing: AtomicBool::new(false),
        }
    }

    /// Whether the shared connectivity flag currently reports online
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.broadcaster
    }

    /// Current status snapshot (recomputes the pending count)
    pub async fn status(&self) -> Result<SyncStatus> {
        let pending = self.local.pending_count().await?;
        Ok(SyncStatus::new(
            self.is_online(),
            self.syncing.load(Ordering::SeqCst),
            pending,
        ))
    }

    /// Publishes the current status snapshot to all listeners
    pub async fn broadcast_status(&self) -> Result<()> {
        let status = self.status().await?;
        self.broadcaster.broadcast(status);
        Ok(())
    }

    /// Removes completed queue entries older than the retention window
    pub async fn reap_completed(&self, retention: Duration) -> Result<u64> {
        let cutoff = self.clock.now() - retention;
        self.local.reap_completed(cutoff).await
    }

    // ========================================================================
    // Sync pass
    // ========================================================================

    /// Runs one full sync pass
    ///
    /// Returns `Ok` with `success = false` when the pass is skipped (already
    /// in progress, or offline). The only `Err` is the auth dead end: token
    /// acquisition failed and the cache holds nothing usable. Every
    /// remote-side failure during the pass becomes queue state instead.
    #[tracing::instrument(skip(self))]
    pub async fn perform_sync(&self) -> Result<SyncReport> {
        // At most one pass at a time; concurrent callers leave immediately
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync requested while a pass is in flight");
            return Ok(SyncReport::skipped("sync already in progress"));
        }

        let result = self.sync_locked().await;

        self.syncing.store(false, Ordering::SeqCst);
        if let Err(e) = self.broadcast_status().await {
            warn!(error = %e, "Failed to broadcast post-sync status");
        }

        result
    }

    /// The pass body; runs with the syncing flag held
    async fn sync_locked(&self) -> Result<SyncReport> {
        if !self.is_online() {
            debug!("Sync requested while offline, deferring to reconnect");
            return Ok(SyncReport::skipped("device is offline"));
        }

        info!(kinds = self.kinds.len(), "Starting sync pass");
        self.broadcaster.broadcast(SyncStatus::new(
            true,
            true,
            self.local.pending_count().await?,
        ));

        let token = self.acquire_token().await?;

        let mut report = SyncReport {
            success: true,
            message: "sync complete".to_string(),
            downloaded: 0,
            uploaded: 0,
            failed: 0,
        };

        self.download_phase(&token, &mut report).await?;
        self.upload_phase(&token, &mut report).await?;

        info!(
            downloaded = report.downloaded,
            uploaded = report.uploaded,
            failed = report.failed,
            "Sync pass finished"
        );
        Ok(report)
    }

    /// Obtains a bearer token: provider first, cache as fallback
    async fn acquire_token(&self) -> Result<String> {
        match self.identity.acquire_token_silent(&self.scope).await {
            Ok(token) => {
                self.local
                    .save_token(&token)
                    .await
                    .context("Failed to cache fresh access token")?;
                Ok(token.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Silent token acquisition failed, consulting cache");
                match self.local.get_valid_token(&self.scope).await? {
                    Some(cached) => {
                        debug!(scope = %cached.scope, "Using cached access token");
                        Ok(cached.access_token)
                    }
                    None => Err(e).context("No usable access token: acquisition failed and the cache holds none"),
                }
            }
        }
    }

    /// Download phase: pull every configured kind into the local store
    async fn download_phase(&self, token: &str, report: &mut SyncReport) -> Result<()> {
        for kind in &self.kinds {
            let records = match self.remote.list(token, kind).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(kind = %kind, error = %format!("{e:#}"), "Download failed for kind");
                    report.failed += 1;
                    continue;
                }
            };

            for remote_record in records {
                let draft = RecordDraft::with_id(remote_record.id.clone(), remote_record.fields);
                match self.local.put(kind, draft, true).await {
                    Ok(_) => report.downloaded += 1,
                    Err(e) => {
                        warn!(
                            kind = %kind,
                            id = %remote_record.id,
                            error = %format!("{e:#}"),
                            "Failed to store downloaded record"
                        );
                        report.failed += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Upload phase: drain pending queue entries in enqueue order
    async fn upload_phase(&self, token: &str, report: &mut SyncReport) -> Result<()> {
        let pending = self.local.pending_mutations().await?;
        if pending.is_empty() {
            return Ok(());
        }
        info!(count = pending.len(), "Draining mutation queue");

        for mutation in pending {
            match self.apply_with_policy(token, &mutation).await {
                Ok(created_id) => {
                    let completed = self
                        .local
                        .mark_mutation_completed(mutation.id, mutation.revision)
                        .await?;
                    if !completed {
                        // A local edit refreshed the snapshot while the
                        // upload was in flight; the entry stays pending and
                        // the next pass sends the newer payload.
                        debug!(
                            mutation_id = mutation.id,
                            entity_id = %mutation.entity_id,
                            "Entry refreshed during upload, left pending"
                        );
                        continue;
                    }
                    if let Some(server_id) = created_id {
                        // Confirmed create: retire the placeholder record.
                        // Server-sourced, so it never re-enters the queue.
                        if mutation.entity_id.is_offline() && mutation.entity_id != server_id {
                            self.local
                                .delete(&mutation.kind, &mutation.entity_id, true)
                                .await?;
                        }
                        info!(
                            kind = %mutation.kind,
                            placeholder = %mutation.entity_id,
                            id = %server_id,
                            "Offline-created record confirmed by server"
                        );
                    }
                    report.uploaded += 1;
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(
                        mutation_id = mutation.id,
                        kind = %mutation.kind,
                        entity_id = %mutation.entity_id,
                        action = mutation.action.as_str(),
                        error = %message,
                        "Mutation upload failed"
                    );
                    self.local
                        .mark_mutation_failed(mutation.id, &message, self.policy.max_attempts)
                        .await?;
                    report.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Applies one entry, with in-pass retries only when a backoff hook is set
    ///
    /// Returns the server-issued id for creates, `None` otherwise.
    async fn apply_with_policy(&self, token: &str, mutation: &Mutation) -> Result<Option<RecordId>> {
        let mut attempt = 0u32;
        loop {
            match self.apply_mutation(token, mutation).await {
                Ok(created_id) => return Ok(created_id),
                Err(e) => match self.policy.backoff_for(attempt) {
                    Some(delay) if attempt + 1 < self.policy.max_attempts => {
                        warn!(
                            mutation_id = mutation.id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Upload attempt failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    _ => return Err(e),
                },
            }
        }
    }

    /// One remote round trip for a queue entry
    ///
    /// Creates also write the server's copy of the record locally under the
    /// server-issued id; retiring the placeholder is the caller's job once
    /// the queue entry is confirmed.
    async fn apply_mutation(&self, token: &str, mutation: &Mutation) -> Result<Option<RecordId>> {
        match mutation.action {
            MutationAction::Create => {
                let payload = mutation
                    .payload
                    .clone()
                    .context("Create mutation has no payload snapshot")?;
                let fields = strip_local_metadata(payload);

                let server_id = self.remote.create(token, &mutation.kind, &fields).await?;

                self.local
                    .put(
                        &mutation.kind,
                        RecordDraft::with_id(server_id.clone(), fields),
                        true,
                    )
                    .await?;
                Ok(Some(server_id))
            }
            MutationAction::Update => {
                let payload = mutation
                    .payload
                    .clone()
                    .context("Update mutation has no payload snapshot")?;
                let fields = strip_local_metadata(payload);
                self.remote
                    .update(token, &mutation.kind, &mutation.entity_id, &fields)
                    .await?;
                Ok(None)
            }
            MutationAction::Delete => {
                self.remote
                    .delete(token, &mutation.kind, &mutation.entity_id)
                    .await?;
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("kinds", &self.kinds)
            .field("scope", &self.scope)
            .field("policy", &self.policy)
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
