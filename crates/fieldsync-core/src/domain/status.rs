//! Published sync/connectivity status

use serde::{Deserialize, Serialize};

/// Snapshot of the engine's state, pushed to registered listeners
///
/// Broadcast after initialization, after every online/offline transition,
/// and after every sync pass. Consumers render this directly; it carries no
/// identity of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether the network monitor currently reports connectivity
    pub is_online: bool,
    /// Whether a sync pass is in flight
    pub is_syncing: bool,
    /// Number of pending mutation-queue entries (excludes failed and completed)
    pub pending_count: u64,
    /// Convenience flag: `pending_count > 0`
    pub has_pending_changes: bool,
}

impl SyncStatus {
    /// Builds a status snapshot, deriving `has_pending_changes`
    #[must_use]
    pub fn new(is_online: bool, is_syncing: bool, pending_count: u64) -> Self {
        Self {
            is_online,
            is_syncing,
            pending_count,
            has_pending_changes: pending_count > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_pending_changes_derived() {
        assert!(!SyncStatus::new(true, false, 0).has_pending_changes);
        assert!(SyncStatus::new(false, false, 2).has_pending_changes);
    }
}
