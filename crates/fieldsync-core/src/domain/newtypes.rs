//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Prefix for locally generated placeholder ids
///
/// A record created while the remote store is unreachable gets an id of the
/// form `offline_<millis>_<8 hex chars>`. The prefix is what distinguishes a
/// placeholder from a server-issued id throughout the engine.
pub const OFFLINE_ID_PREFIX: &str = "offline_";

// ============================================================================
// RecordId
// ============================================================================

/// Identifier of an entity record
///
/// Either a server-issued identifier or a locally generated placeholder
/// (see [`RecordId::new_offline`]). The engine never inspects server ids
/// beyond equality; placeholders are recognized by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a RecordId from an existing (server-issued) identifier
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRecordId(id));
        }
        Ok(Self(id))
    }

    /// Generate a fresh offline placeholder id
    ///
    /// The timestamp keeps placeholders roughly sortable; the random suffix
    /// makes collisions between rapid offline creates practically impossible.
    #[must_use]
    pub fn new_offline(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}_{}",
            OFFLINE_ID_PREFIX,
            now.timestamp_millis(),
            &suffix[..8]
        ))
    }

    /// Returns true if this id is a locally generated placeholder
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.0.starts_with(OFFLINE_ID_PREFIX)
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// EntityKind
// ============================================================================

/// A category of domain record (e.g. `participants`, `sessions`)
///
/// Each kind has its own remote collection and its own slice of the local
/// store. The engine is schema-agnostic: kinds are opaque names, validated
/// only for safe use in URLs and queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(String);

impl EntityKind {
    /// Create an EntityKind, validating the name
    ///
    /// Names must be non-empty ASCII lowercase alphanumerics with optional
    /// underscores, matching the collection-name conventions of the remote
    /// store.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(DomainError::InvalidEntityKind(name));
        }
        Ok(Self(name))
    }

    /// Get the kind name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Scope
// ============================================================================

/// An access-token scope requested from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Create a Scope, rejecting empty values
    pub fn new(scope: impl Into<String>) -> Result<Self, DomainError> {
        let scope = scope.into();
        if scope.trim().is_empty() {
            return Err(DomainError::InvalidScope(scope));
        }
        Ok(Self(scope))
    }

    /// Get the scope as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_rejects_empty() {
        assert!(RecordId::new("").is_err());
        assert!(RecordId::new("   ").is_err());
        assert!(RecordId::new("srv-77").is_ok());
    }

    #[test]
    fn test_offline_id_shape() {
        let now = Utc::now();
        let id = RecordId::new_offline(now);
        assert!(id.is_offline());
        assert!(id.as_str().starts_with("offline_"));

        let parts: Vec<&str> = id.as_str().splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_offline_ids_are_unique() {
        let now = Utc::now();
        let a = RecordId::new_offline(now);
        let b = RecordId::new_offline(now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_server_id_is_not_offline() {
        let id = RecordId::new("a1b2-c3d4").unwrap();
        assert!(!id.is_offline());
    }

    #[test]
    fn test_entity_kind_validation() {
        assert!(EntityKind::new("participants").is_ok());
        assert!(EntityKind::new("session_notes").is_ok());
        assert!(EntityKind::new("v2_records").is_ok());
        assert!(EntityKind::new("").is_err());
        assert!(EntityKind::new("Participants").is_err());
        assert!(EntityKind::new("bad kind").is_err());
        assert!(EntityKind::new("bad/kind").is_err());
    }

    #[test]
    fn test_scope_validation() {
        assert!(Scope::new("https://records.example.com/.default").is_ok());
        assert!(Scope::new("").is_err());
    }

    #[test]
    fn test_from_str_round_trip() {
        let kind: EntityKind = "participants".parse().unwrap();
        assert_eq!(kind.as_str(), "participants");
        assert_eq!(kind.to_string(), "participants");
    }
}
