//! Fieldsync Engine - bidirectional offline-first synchronization
//!
//! The application core of Fieldsync. Wires the ports from `fieldsync-core`
//! into a download-then-upload sync pass, triggered by connectivity
//! transitions and explicit requests.
//!
//! ## Components
//!
//! - [`SyncEngine`] - orchestrates one full sync pass (token, download,
//!   queue drain) with a reentrancy guard
//! - [`NetworkMonitor`] - consumes connectivity events, owns the shared
//!   online flag, and triggers sync on reconnect
//! - [`StatusBroadcaster`] - fan-out of [`SyncStatus`] snapshots to
//!   registered listeners
//! - [`RetryPolicy`] - failed-attempt ceiling and optional in-pass backoff
//!
//! [`SyncStatus`]: fieldsync_core::domain::SyncStatus

pub mod broadcast;
pub mod engine;
pub mod monitor;
pub mod policy;

pub use broadcast::StatusBroadcaster;
pub use engine::{SyncEngine, SyncReport};
pub use monitor::{ConnectivityEvent, NetworkMonitor};
pub use policy::RetryPolicy;
