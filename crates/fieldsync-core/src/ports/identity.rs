//! Identity provider port (driven/secondary port)
//!
//! Silent access-token acquisition by scope. "Silent" means no user
//! interaction: the adapter redeems a long-lived credential (a refresh
//! token) against the provider's token endpoint.
//!
//! The engine treats every failure class uniformly as "acquire failed, try
//! the cache", so the trait has a single fallible operation and no error
//! taxonomy of its own.

use crate::domain::{CachedToken, Scope};

/// Port trait for silent token acquisition
#[async_trait::async_trait]
pub trait IIdentityProvider: Send + Sync {
    /// Acquires a fresh access token for `scope` without user interaction
    ///
    /// Fails when the provider is unreachable or interaction would be
    /// required; callers fall back to the token cache in either case.
    async fn acquire_token_silent(&self, scope: &Scope) -> anyhow::Result<CachedToken>;
}
