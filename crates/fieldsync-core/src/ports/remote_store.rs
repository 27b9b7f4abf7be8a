//! Remote record store port (driven/secondary port)
//!
//! This module defines the interface for the remote record store: a
//! REST-like HTTP API with one collection per entity kind. The primary
//! implementation targets a Dataverse-style Web API, but the trait is
//! deliberately provider-agnostic.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the sync engine converts them into queue-entry state
//!   rather than classifying them.
//! - Every call takes the bearer token explicitly. Token lifetime is the
//!   engine's concern (provider plus cache fallback), not the transport's.
//! - `RemoteRecord` is a port-level DTO; the engine maps it to a local
//!   [`Record`](crate::domain::Record) via `put(.., from_server = true)`.

use serde::{Deserialize, Serialize};

use crate::domain::{EntityKind, RecordId};
use crate::domain::record::Fields;

/// A single record as returned by the remote collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Server-issued identifier
    pub id: RecordId,
    /// Domain attributes as the server holds them
    pub fields: Fields,
}

/// Port trait for remote record-store operations
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches the full remote collection for an entity kind
    async fn list(&self, token: &str, kind: &EntityKind) -> anyhow::Result<Vec<RemoteRecord>>;

    /// Creates a record and returns the server-issued id
    ///
    /// The id is extracted from the success response's location mechanism
    /// (`Location`-style header or response body), whichever the remote
    /// exposes.
    async fn create(
        &self,
        token: &str,
        kind: &EntityKind,
        fields: &Fields,
    ) -> anyhow::Result<RecordId>;

    /// Updates a record addressed by its (server-issued) id
    async fn update(
        &self,
        token: &str,
        kind: &EntityKind,
        id: &RecordId,
        fields: &Fields,
    ) -> anyhow::Result<()>;

    /// Deletes a record addressed by its id
    async fn delete(&self, token: &str, kind: &EntityKind, id: &RecordId) -> anyhow::Result<()>;
}
