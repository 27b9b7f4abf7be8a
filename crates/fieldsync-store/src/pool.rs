//! SQLite pool setup and schema migration
//!
//! Everything durable in Fieldsync (records, the mutation queue, cached
//! tokens) lives in one SQLite file, so pool construction is also where the
//! schema gets applied: a [`DatabasePool`] is ready to serve queries as soon
//! as it exists. An in-memory variant backs the test suites.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::StoreError;

/// Connection pool over the single Fieldsync database file
///
/// File-backed pools run in WAL mode with up to 5 connections and a
/// 5-second busy timeout; reads keep flowing while the engine writes.
/// The in-memory variant is pinned to 1 connection because a SQLite
/// `:memory:` database exists per connection.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (or creates) the database at `db_path` and applies the schema
    ///
    /// Missing parent directories and a missing database file are created
    /// on the way; first use on a fresh machine needs no setup step.
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` when the file cannot be opened,
    /// `StoreError::MigrationFailed` when applying the schema fails.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(
            path = %db_path.display(),
            "Database pool initialized"
        );

        Ok(Self { pool })
    }

    /// Creates a migrated in-memory database, for tests
    ///
    /// Capped at one connection: each SQLite connection gets its own
    /// `:memory:` database, so a second connection would see empty tables.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory database pool initialized");

        Ok(Self { pool })
    }

    /// The underlying SQLx pool, for issuing queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the schema; every statement is IF NOT EXISTS, so reruns are
    /// harmless
    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        let migration_sql = include_str!("migrations/20260801_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!("Failed to run initial migration: {}", e))
            })?;

        tracing::debug!("Database migrations completed");
        Ok(())
    }
}
