//! Port definitions (hexagonal architecture)
//!
//! Ports are trait interfaces that decouple the domain and the sync engine
//! from concrete adapters:
//!
//! - [`ILocalStore`] - durable local record store, mutation queue, token cache
//! - [`IRemoteStore`] - REST-like remote record store
//! - [`IIdentityProvider`] - silent access-token acquisition
//! - [`IClock`] - injectable time source
//! - [`IStatusListener`] - observer of published sync status

pub mod clock;
pub mod identity;
pub mod local_store;
pub mod remote_store;
pub mod status_listener;

pub use clock::{IClock, SystemClock};
pub use identity::IIdentityProvider;
pub use local_store::ILocalStore;
pub use remote_store::{IRemoteStore, RemoteRecord};
pub use status_listener::IStatusListener;
