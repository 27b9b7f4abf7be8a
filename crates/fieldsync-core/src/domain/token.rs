//! Cached access credentials
//!
//! The engine keeps the most recently obtained access token per scope in the
//! local store so uploads can still authenticate after the identity provider
//! becomes unreachable, up to the token's expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::Scope;

/// An access token cached in the local store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    /// The scope the token was issued for
    pub scope: Scope,
    /// Bearer token for authenticating remote requests
    pub access_token: String,
    /// Absolute expiry; the cache entry is useless past this instant
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token has expired relative to `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Token material must never leak into logs.
impl std::fmt::Debug for CachedToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CachedToken")
            .field("scope", &self.scope)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: DateTime<Utc>) -> CachedToken {
        CachedToken {
            scope: Scope::new("https://records.example.com/.default").unwrap(),
            access_token: "secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_expiry_against_injected_now() {
        let now = Utc::now();
        assert!(!token(now + Duration::minutes(5)).is_expired(now));
        assert!(token(now - Duration::seconds(1)).is_expired(now));
        assert!(token(now).is_expired(now));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", token(Utc::now()));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
