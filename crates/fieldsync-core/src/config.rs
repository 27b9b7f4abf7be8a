//! Configuration module for Fieldsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Fieldsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub auth: AuthConfig,
    pub sync: SyncConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Remote record-store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote record store (one collection per entity kind
    /// beneath it).
    pub base_url: String,
}

/// Authentication / token acquisition settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint of the identity provider.
    pub token_url: Option<String>,
    /// Application (client) ID registered with the provider.
    pub client_id: Option<String>,
    /// Scope requested for remote-store access.
    pub scope: Option<String>,
    /// Long-lived refresh token used for silent acquisition. When absent,
    /// the `FIELDSYNC_REFRESH_TOKEN` environment variable is consulted.
    pub refresh_token: Option<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entity kinds the engine synchronizes (each maps to a remote
    /// collection and a local table slice).
    pub kinds: Vec<String>,
    /// Failed-attempt ceiling before a queue entry becomes permanently
    /// `failed`.
    pub retry_ceiling: u32,
    /// Hours a completed queue entry is retained before being reaped.
    pub reap_after_hours: u64,
    /// Minutes between background reap sweeps.
    pub reap_interval_minutes: u64,
}

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            kinds: vec!["participants".to_string(), "sessions".to_string()],
            retry_ceiling: 3,
            reap_after_hours: 24,
            reap_interval_minutes: 60,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fieldsync")
                .join("state.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Default config file location: `~/.config/fieldsync/config.yaml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fieldsync")
            .join("config.yaml")
    }

    /// Validate settings that cannot be expressed in the type system.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.remote.base_url.is_empty() {
            anyhow::bail!("remote.base_url must be set");
        }
        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            anyhow::bail!("remote.base_url must include http:// or https://");
        }
        if self.sync.kinds.is_empty() {
            anyhow::bail!("sync.kinds must name at least one entity kind");
        }
        if self.sync.retry_ceiling == 0 {
            anyhow::bail!("sync.retry_ceiling must be at least 1");
        }
        for kind in &self.sync.kinds {
            crate::domain::EntityKind::new(kind.clone())
                .map_err(|e| anyhow::anyhow!("sync.kinds entry rejected: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.sync.retry_ceiling, 3);
        assert_eq!(config.sync.kinds.len(), 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_kind() {
        let mut config = Config::default();
        config.remote.base_url = "https://records.example.com/api".to_string();
        config.sync.kinds = vec!["Bad Kind".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut config = Config::default();
        config.remote.base_url = "https://records.example.com/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_round_trip() {
        let mut config = Config::default();
        config.remote.base_url = "https://records.example.com/api".to_string();
        config.auth.scope = Some("https://records.example.com/.default".to_string());

        let yaml = serde_yaml::to_string(&config).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.remote.base_url, config.remote.base_url);
        assert_eq!(loaded.auth.scope, config.auth.scope);
        assert_eq!(loaded.sync.retry_ceiling, 3);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.logging.level, "info");
    }
}
