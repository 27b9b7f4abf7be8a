//! Durable mutation queue entries
//!
//! Every local write performed while a remote round trip is unconfirmed
//! appends a [`Mutation`] to the queue. The sync engine later drains pending
//! entries against the remote store in enqueue order (FIFO within an entity
//! kind; no cross-kind ordering is guaranteed or needed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{EntityKind, RecordId};
use super::record::Fields;

/// Default ceiling after which an entry stops being retried automatically
pub const DEFAULT_RETRY_CEILING: u32 = 3;

// ============================================================================
// MutationAction / MutationStatus
// ============================================================================

/// What the queued entry does against the remote store
///
/// Decided at enqueue time by whether the record's id is a locally generated
/// placeholder (`Create`) or a server-issued id (`Update` / `Delete`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    /// Stable string form used in storage and logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse from the stored string form
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown mutation action: {other}"
            ))),
        }
    }
}

/// Processing state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    /// Waiting for the next drain pass
    Pending,
    /// Round trip confirmed; retained until reaped
    Completed,
    /// Retry ceiling reached; excluded from drains, kept for manual review
    Failed,
}

impl MutationStatus {
    /// Stable string form used in storage and logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse from the stored string form
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown mutation status: {other}"
            ))),
        }
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// One durable entry in the mutation queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Store-assigned sequence number; insertion order is drain order
    pub id: i64,
    /// Entity kind this mutation targets
    pub kind: EntityKind,
    /// Create / Update / Delete
    pub action: MutationAction,
    /// The local-store id at enqueue time (placeholder or real)
    pub entity_id: RecordId,
    /// Snapshot of the record's fields at enqueue time; absent for deletes
    pub payload: Option<Fields>,
    /// Bumped every time a later local edit refreshes `payload`
    ///
    /// The engine drains against the revision it read; completion is guarded
    /// on it so a snapshot refreshed mid-flight stays pending instead of
    /// being confirmed under the old payload.
    pub revision: i64,
    /// Processing state
    pub status: MutationStatus,
    /// Number of failed upload attempts so far
    pub retry_count: u32,
    /// When the entry was appended
    pub enqueued_at: DateTime<Utc>,
    /// When the engine last attempted this entry
    pub last_attempt: Option<DateTime<Utc>>,
    /// Message from the most recent failure
    pub last_error: Option<String>,
    /// When the round trip was confirmed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Mutation {
    /// Marks the round trip confirmed
    ///
    /// Only `Pending` entries complete; completing a `Failed` or already
    /// `Completed` entry is a logic error upstream.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != MutationStatus::Pending {
            return Err(DomainError::InvalidState {
                from: self.status.as_str().to_string(),
                to: MutationStatus::Completed.as_str().to_string(),
            });
        }
        self.status = MutationStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Records a failed attempt
    ///
    /// Increments the retry count and captures the error. Entries under the
    /// ceiling return to `Pending` so the next drain pass retries them;
    /// entries at the ceiling become permanently `Failed`.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
        ceiling: u32,
    ) -> Result<(), DomainError> {
        if self.status != MutationStatus::Pending {
            return Err(DomainError::InvalidState {
                from: self.status.as_str().to_string(),
                to: MutationStatus::Failed.as_str().to_string(),
            });
        }
        self.retry_count += 1;
        self.last_attempt = Some(now);
        self.last_error = Some(error.into());
        self.status = if self.retry_count >= ceiling {
            MutationStatus::Failed
        } else {
            MutationStatus::Pending
        };
        Ok(())
    }

    /// Returns true if this entry participates in the next drain pass
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Mutation {
        Mutation {
            id: 1,
            kind: EntityKind::new("participants").unwrap(),
            action: MutationAction::Create,
            entity_id: RecordId::new_offline(Utc::now()),
            payload: Some(Fields::new()),
            revision: 0,
            status: MutationStatus::Pending,
            retry_count: 0,
            enqueued_at: Utc::now(),
            last_attempt: None,
            last_error: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_complete_sets_timestamp() {
        let mut m = entry();
        let now = Utc::now();
        m.mark_completed(now).unwrap();
        assert_eq!(m.status, MutationStatus::Completed);
        assert_eq!(m.completed_at, Some(now));
    }

    #[test]
    fn test_complete_twice_is_invalid() {
        let mut m = entry();
        m.mark_completed(Utc::now()).unwrap();
        assert!(m.mark_completed(Utc::now()).is_err());
    }

    #[test]
    fn test_failure_below_ceiling_stays_pending() {
        let mut m = entry();
        m.mark_failed("HTTP 503", Utc::now(), DEFAULT_RETRY_CEILING)
            .unwrap();
        assert_eq!(m.status, MutationStatus::Pending);
        assert_eq!(m.retry_count, 1);
        assert_eq!(m.last_error.as_deref(), Some("HTTP 503"));
        assert!(m.last_attempt.is_some());
    }

    #[test]
    fn test_failure_at_ceiling_becomes_failed() {
        let mut m = entry();
        for attempt in 1..=DEFAULT_RETRY_CEILING {
            m.mark_failed("HTTP 500", Utc::now(), DEFAULT_RETRY_CEILING)
                .unwrap();
            assert_eq!(m.retry_count, attempt);
        }
        assert_eq!(m.status, MutationStatus::Failed);
        assert!(!m.is_pending());

        // Failed is terminal for automatic processing
        assert!(m
            .mark_failed("HTTP 500", Utc::now(), DEFAULT_RETRY_CEILING)
            .is_err());
    }

    #[test]
    fn test_action_and_status_string_round_trip() {
        for action in [
            MutationAction::Create,
            MutationAction::Update,
            MutationAction::Delete,
        ] {
            assert_eq!(MutationAction::parse(action.as_str()).unwrap(), action);
        }
        for status in [
            MutationStatus::Pending,
            MutationStatus::Completed,
            MutationStatus::Failed,
        ] {
            assert_eq!(MutationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(MutationAction::parse("upsert").is_err());
        assert!(MutationStatus::parse("stuck").is_err());
    }
}
