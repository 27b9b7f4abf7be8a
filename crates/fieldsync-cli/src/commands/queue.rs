//! Queue command - inspect the mutation queue
//!
//! Lists queue entries in enqueue order. `--failed` narrows the listing to
//! permanently failed entries, which is the review surface once the retry
//! ceiling has been hit.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use fieldsync_core::domain::{Mutation, MutationStatus};
use fieldsync_core::ports::ILocalStore;

use crate::commands::{load_config, open_store};
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct QueueCommand {
    /// Show only permanently failed entries
    #[arg(long)]
    pub failed: bool,
}

fn entry_json(m: &Mutation) -> serde_json::Value {
    serde_json::json!({
        "id": m.id,
        "kind": m.kind.as_str(),
        "action": m.action.as_str(),
        "entity_id": m.entity_id.as_str(),
        "status": m.status.as_str(),
        "retry_count": m.retry_count,
        "enqueued_at": m.enqueued_at.to_rfc3339(),
        "last_error": m.last_error,
    })
}

impl QueueCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(format);

        let config = load_config(config_path)?;
        let store = open_store(&config).await?;

        let mut mutations = store.all_mutations().await?;
        if self.failed {
            mutations.retain(|m| m.status == MutationStatus::Failed);
        }

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "entries": mutations.iter().map(entry_json).collect::<Vec<_>>(),
            }));
            return Ok(());
        }

        if mutations.is_empty() {
            formatter.success(if self.failed {
                "No permanently failed entries"
            } else {
                "Queue is empty"
            });
            return Ok(());
        }

        formatter.success(&format!(
            "{} queue entr{}",
            mutations.len(),
            if mutations.len() == 1 { "y" } else { "ies" }
        ));
        for m in &mutations {
            let mut line = format!(
                "#{} {} {} {} [{}] retries={}",
                m.id,
                m.kind,
                m.action.as_str(),
                m.entity_id,
                m.status.as_str(),
                m.retry_count
            );
            if let Some(error) = &m.last_error {
                line.push_str(&format!(" last_error={error}"));
            }
            formatter.info(&line);
        }

        Ok(())
    }
}
