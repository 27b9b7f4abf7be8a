//! Entity records
//!
//! A [`Record`] is one domain object (a participant, a session, ...) held in
//! the local store. The attribute schema is owned by the remote store, so
//! `fields` is an open JSON map rather than a fixed struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::newtypes::{EntityKind, RecordId};

/// Open attribute map carried by every record
pub type Fields = Map<String, Value>;

// ============================================================================
// RecordDraft
// ============================================================================

/// Input to a local-store write
///
/// A draft carries the caller-supplied attributes and, optionally, an id.
/// Drafts without an id are new records: the store synthesizes an offline
/// placeholder id and marks the result as offline-created.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    /// Existing id, if the caller already has one (server-issued or placeholder)
    pub id: Option<RecordId>,
    /// Domain attributes
    pub fields: Fields,
}

impl RecordDraft {
    /// Draft for a brand new record with no id yet
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self { id: None, fields }
    }

    /// Draft addressing an existing record
    #[must_use]
    pub fn with_id(id: RecordId, fields: Fields) -> Self {
        Self {
            id: Some(id),
            fields,
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// An entity record as stored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key; placeholder while offline-created and unconfirmed
    pub id: RecordId,
    /// The entity kind this record belongs to
    pub kind: EntityKind,
    /// Open map of domain attributes
    pub fields: Fields,
    /// Set by the local store on every write
    pub last_modified: DateTime<Utc>,
    /// True exactly when the record was created without ever receiving a
    /// server-issued id
    pub is_offline_created: bool,
    /// True when the last write has not been confirmed round-tripped to the
    /// remote store
    pub needs_sync: bool,
}

impl Record {
    /// Returns true if this record still carries a placeholder id
    #[must_use]
    pub fn has_placeholder_id(&self) -> bool {
        self.id.is_offline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_draft_new_has_no_id() {
        let draft = RecordDraft::new(fields_of(json!({"name": "Alex"})));
        assert!(draft.id.is_none());
        assert_eq!(draft.fields["name"], json!("Alex"));
    }

    #[test]
    fn test_placeholder_detection() {
        let record = Record {
            id: RecordId::new_offline(Utc::now()),
            kind: EntityKind::new("participants").unwrap(),
            fields: Fields::new(),
            last_modified: Utc::now(),
            is_offline_created: true,
            needs_sync: true,
        };
        assert!(record.has_placeholder_id());

        let record = Record {
            id: RecordId::new("srv-77").unwrap(),
            ..record
        };
        assert!(!record.has_placeholder_id());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let record = Record {
            id: RecordId::new("srv-77").unwrap(),
            kind: EntityKind::new("sessions").unwrap(),
            fields: fields_of(json!({"title": "Intake", "count": 3})),
            last_modified: Utc::now(),
            is_offline_created: false,
            needs_sync: false,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
