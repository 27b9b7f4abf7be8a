//! Sync command - run one synchronization pass
//!
//! Provides the `fieldsync sync` CLI command which:
//! 1. Loads and validates configuration and opens the local database
//! 2. Creates the adapters (REST remote store, OAuth identity provider)
//! 3. Runs the SyncEngine and displays the report

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::warn;

use fieldsync_core::domain::{CachedToken, EntityKind, Scope};
use fieldsync_core::ports::{IIdentityProvider, SystemClock};
use fieldsync_engine::{RetryPolicy, StatusBroadcaster, SyncEngine};
use fieldsync_remote::{OAuthIdentityProvider, RestRemoteStore};

use crate::commands::{load_config, open_store};
use crate::output::{get_formatter, OutputFormat};

/// Identity stand-in used when no provider is configured
///
/// Always fails acquisition, which sends the engine to the token cache.
struct CacheOnlyIdentity;

#[async_trait::async_trait]
impl IIdentityProvider for CacheOnlyIdentity {
    async fn acquire_token_silent(&self, _scope: &Scope) -> Result<CachedToken> {
        anyhow::bail!("No identity provider configured")
    }
}

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(format);

        let config = load_config(config_path)?;
        if let Err(e) = config.validate() {
            formatter.error(&format!("Invalid configuration: {e:#}"));
            return Ok(());
        }

        let store = open_store(&config).await?;
        let remote = Arc::new(RestRemoteStore::new(&config.remote.base_url));
        let clock = Arc::new(SystemClock);

        let identity: Arc<dyn IIdentityProvider> =
            match OAuthIdentityProvider::from_config(&config.auth, clock.clone()) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    warn!(error = %e, "Identity provider unavailable, relying on cached tokens");
                    Arc::new(CacheOnlyIdentity)
                }
            };

        let scope = match &config.auth.scope {
            Some(scope) => Scope::new(scope)?,
            None => Scope::new(format!("{}/.default", config.remote.base_url))?,
        };
        let kinds = config
            .sync
            .kinds
            .iter()
            .map(|k| EntityKind::new(k.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        // One-shot invocation: the user is telling us the network is there.
        // Unreachable hosts surface as per-entry failures, not a crash.
        let online = Arc::new(AtomicBool::new(true));

        let engine = SyncEngine::new(
            store,
            remote,
            identity,
            clock,
            Arc::new(StatusBroadcaster::new()),
            online,
            kinds,
            scope,
            RetryPolicy::with_ceiling(config.sync.retry_ceiling),
        );

        formatter.info("Starting synchronization...");
        let report = match engine.perform_sync().await {
            Ok(report) => report,
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                return Ok(());
            }
        };

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "success": report.success,
                "message": report.message,
                "downloaded": report.downloaded,
                "uploaded": report.uploaded,
                "failed": report.failed,
            }));
            return Ok(());
        }

        if !report.success {
            formatter.error(&report.message);
            return Ok(());
        }

        if report.downloaded == 0 && report.uploaded == 0 && report.failed == 0 {
            formatter.success("Already up to date");
        } else {
            formatter.success("Sync completed");
        }
        if report.downloaded > 0 {
            formatter.info(&format!(
                "Downloaded: {} record{}",
                report.downloaded,
                if report.downloaded == 1 { "" } else { "s" }
            ));
        }
        if report.uploaded > 0 {
            formatter.info(&format!(
                "Uploaded:   {} change{}",
                report.uploaded,
                if report.uploaded == 1 { "" } else { "s" }
            ));
        }
        if report.failed > 0 {
            formatter.error(&format!(
                "{} operation{} failed; see 'fieldsync queue' for details",
                report.failed,
                if report.failed == 1 { "" } else { "s" }
            ));
        }

        Ok(())
    }
}
