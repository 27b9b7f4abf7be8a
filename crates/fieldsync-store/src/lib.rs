//! Fieldsync Store - Durable local persistence
//!
//! SQLite-based local store for:
//! - Entity records (one logical collection per entity kind)
//! - The durable mutation queue
//! - The access-token cache
//!
//! ## Architecture
//!
//! This crate implements the `ILocalStore` port from `fieldsync-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! The crate's one hard guarantee is transactional coupling: a caller-facing
//! record write and its mutation-queue entry commit together or not at all.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteLocalStore`] - Full `ILocalStore` implementation
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use fieldsync_core::ports::SystemClock;
//! use fieldsync_store::{DatabasePool, SqliteLocalStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/fieldsync/state.db")).await?;
//! let store = SqliteLocalStore::new(pool.pool().clone(), Arc::new(SystemClock));
//! // Use store as ILocalStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod store;

pub use pool::DatabasePool;
pub use store::SqliteLocalStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The addressed row does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
