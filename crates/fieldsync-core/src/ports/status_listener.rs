//! Status listener port (driving/primary port)
//!
//! Consumers (UI, CLI, host shell) register a listener to be notified with
//! the current [`SyncStatus`] after initialization, connectivity
//! transitions, and sync passes.

use crate::domain::SyncStatus;

/// Observer of published sync status
///
/// Callbacks must be cheap and non-blocking; they run on the engine's task.
pub trait IStatusListener: Send + Sync {
    /// Called with a fresh status snapshot
    fn on_status(&self, status: SyncStatus);
}
