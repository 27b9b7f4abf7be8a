//! CLI command implementations

pub mod queue;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use fieldsync_core::config::Config;
use fieldsync_core::ports::SystemClock;
use fieldsync_store::{DatabasePool, SqliteLocalStore};

/// Loads configuration from the given path, or the default location
pub(crate) fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = config_path.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&path);
    info!(config_path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Opens the local store at the configured database path
pub(crate) async fn open_store(config: &Config) -> Result<Arc<SqliteLocalStore>> {
    let pool = DatabasePool::new(&config.store.db_path)
        .await
        .context("Failed to open local database")?;
    Ok(Arc::new(SqliteLocalStore::new(
        pool.pool().clone(),
        Arc::new(SystemClock),
    )))
}
