//! Fieldsync Remote - HTTP adapters for the remote record store
//!
//! Driven (secondary) adapters that connect the Fieldsync ports to the
//! network:
//!
//! - [`RestRemoteStore`] implements `IRemoteStore` against a REST-style API
//!   with one JSON collection per entity kind.
//! - [`OAuthIdentityProvider`] implements `IIdentityProvider` via a silent
//!   OAuth2 refresh-token exchange.
//!
//! Both adapters are stateless across calls; the bearer token for every
//! remote-store request is supplied by the caller, and the identity provider
//! holds only the long-lived refresh credential.

pub mod auth;
pub mod client;

pub use auth::OAuthIdentityProvider;
pub use client::RestRemoteStore;
