//! Status broadcasting
//!
//! Fan-out of [`SyncStatus`] snapshots to registered listeners. The engine
//! publishes after initialization, on every connectivity transition, and at
//! sync-pass boundaries; consumers (CLI, host shell, UI) subscribe with an
//! [`IStatusListener`].

use std::sync::{Arc, Mutex};

use tracing::debug;

use fieldsync_core::domain::SyncStatus;
use fieldsync_core::ports::IStatusListener;

/// Observer list for sync status snapshots
///
/// Listeners are invoked synchronously on the publishing task, outside the
/// internal lock. Callbacks must be cheap and non-blocking.
#[derive(Default)]
pub struct StatusBroadcaster {
    listeners: Mutex<Vec<Arc<dyn IStatusListener>>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for all future status snapshots
    pub fn subscribe(&self, listener: Arc<dyn IStatusListener>) {
        let mut listeners = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(listener);
        debug!(count = listeners.len(), "Status listener subscribed");
    }

    /// Publishes a status snapshot to every registered listener
    pub fn broadcast(&self, status: SyncStatus) {
        let listeners = {
            let guard = match self.listeners.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };

        debug!(
            is_online = status.is_online,
            is_syncing = status.is_syncing,
            pending_count = status.pending_count,
            listeners = listeners.len(),
            "Broadcasting sync status"
        );
        for listener in &listeners {
            listener.on_status(status.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<SyncStatus>>,
    }

    impl IStatusListener for RecordingListener {
        fn on_status(&self, status: SyncStatus) {
            self.seen.lock().unwrap().push(status);
        }
    }

    #[test]
    fn test_broadcast_reaches_all_listeners() {
        let broadcaster = StatusBroadcaster::new();
        let first = Arc::new(RecordingListener::default());
        let second = Arc::new(RecordingListener::default());
        broadcaster.subscribe(first.clone());
        broadcaster.subscribe(second.clone());

        broadcaster.broadcast(SyncStatus::new(true, false, 2));

        for listener in [&first, &second] {
            let seen = listener.seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].is_online);
            assert_eq!(seen[0].pending_count, 2);
            assert!(seen[0].has_pending_changes);
        }
    }

    #[test]
    fn test_broadcast_without_listeners_is_noop() {
        let broadcaster = StatusBroadcaster::new();
        broadcaster.broadcast(SyncStatus::new(false, false, 0));
    }

    #[test]
    fn test_late_subscriber_misses_earlier_snapshots() {
        let broadcaster = StatusBroadcaster::new();
        broadcaster.broadcast(SyncStatus::new(true, false, 0));

        let listener = Arc::new(RecordingListener::default());
        broadcaster.subscribe(listener.clone());
        broadcaster.broadcast(SyncStatus::new(true, true, 1));

        let seen = listener.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_syncing);
    }
}
