//! Network monitoring and sync triggering
//!
//! The [`NetworkMonitor`] sits between the host environment and the
//! [`SyncEngine`](crate::engine::SyncEngine). The host feeds connectivity
//! transitions into an mpsc channel; the monitor maintains the shared online
//! flag, broadcasts status on every transition, and starts a sync pass the
//! moment connectivity returns.
//!
//! ## Flow
//!
//! ```text
//! host environment ──→ mpsc::Receiver ──→ NetworkMonitor ──→ SyncEngine
//!                                              │
//!                                       online AtomicBool (shared)
//! ```
//!
//! A periodic timer also reaps completed queue entries past the retention
//! window. The loop terminates when the event channel closes.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{SyncEngine, SyncReport};

/// Connectivity transition reported by the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Drives the sync engine from connectivity transitions
///
/// Owns the receiving end of the connectivity channel and the shared online
/// flag (the engine holds a read-only clone).
pub struct NetworkMonitor {
    engine: Arc<SyncEngine>,
    online: Arc<AtomicBool>,
    event_rx: mpsc::Receiver<ConnectivityEvent>,
    /// Retention window for completed queue entries
    reap_after: chrono::Duration,
    /// How often the retention sweep runs
    reap_interval: Duration,
}

impl NetworkMonitor {
    /// Creates a monitor and the channel the host feeds events into
    ///
    /// Returns the monitor together with the event sender. The shared
    /// `online` flag must be the same one the engine was constructed with;
    /// it starts out offline until the host reports otherwise.
    pub fn new(
        engine: Arc<SyncEngine>,
        online: Arc<AtomicBool>,
        reap_after: chrono::Duration,
        reap_interval: Duration,
    ) -> (Self, mpsc::Sender<ConnectivityEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);

        let monitor = Self {
            engine,
            online,
            event_rx,
            reap_after,
            reap_interval,
        };

        (monitor, event_tx)
    }

    /// Whether the last reported transition was online
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Explicit "sync now" entry point; delegates straight to the engine
    ///
    /// The engine's own guards apply, so calling this while offline or while
    /// a pass is running is harmless.
    pub async fn request_sync(&self) -> anyhow::Result<SyncReport> {
        info!("Sync requested explicitly");
        self.engine.perform_sync().await
    }

    /// Main event loop
    ///
    /// Handles two concurrent sources via `tokio::select!`:
    ///
    /// 1. **Connectivity events**: flips the shared flag, broadcasts the new
    ///    status, and triggers a sync pass on the offline-to-online edge.
    /// 2. **Retention timer**: periodically reaps completed queue entries.
    ///
    /// Terminates when the event channel closes (all senders dropped).
    pub async fn run(&mut self) {
        info!(
            reap_after_hours = self.reap_after.num_hours(),
            reap_interval_secs = self.reap_interval.as_secs(),
            "Network monitor starting"
        );

        let mut reap_timer = tokio::time::interval(self.reap_interval);
        reap_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it
        reap_timer.tick().await;

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            info!("Connectivity channel closed, monitor shutting down");
                            break;
                        }
                    }
                }
                _ = reap_timer.tick() => {
                    match self.engine.reap_completed(self.reap_after).await {
                        Ok(reaped) if reaped > 0 => {
                            debug!(reaped, "Retention sweep removed completed entries");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Retention sweep failed"),
                    }
                }
            }
        }
    }

    /// Applies one connectivity transition
    async fn handle_event(&self, event: ConnectivityEvent) {
        match event {
            ConnectivityEvent::Online => {
                let was_online = self.online.swap(true, Ordering::SeqCst);
                if was_online {
                    debug!("Connectivity report: still online");
                    return;
                }
                info!("Connectivity restored, starting sync pass");
                // Sync unconditionally on the reconnect edge; the pass
                // itself decides whether there is anything to move.
                match self.engine.perform_sync().await {
                    Ok(report) => {
                        debug!(
                            success = report.success,
                            uploaded = report.uploaded,
                            downloaded = report.downloaded,
                            "Reconnect sync finished"
                        );
                    }
                    Err(e) => warn!(error = %format!("{e:#}"), "Reconnect sync failed"),
                }
            }
            ConnectivityEvent::Offline => {
                let was_online = self.online.swap(false, Ordering::SeqCst);
                if !was_online {
                    debug!("Connectivity report: still offline");
                    return;
                }
                info!("Connectivity lost, sync deferred until reconnect");
                if let Err(e) = self.engine.broadcast_status().await {
                    warn!(error = %e, "Failed to broadcast offline status");
                }
            }
        }
    }
}
