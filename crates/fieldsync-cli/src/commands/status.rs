//! Status command - show queue and record state
//!
//! Reads the local database only; no network traffic.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use fieldsync_core::domain::MutationStatus;
use fieldsync_core::ports::ILocalStore;

use crate::commands::{load_config, open_store};
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(format);

        let config = load_config(config_path)?;
        let store = open_store(&config).await?;

        let mutations = store.all_mutations().await?;
        let pending = mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Pending)
            .count();
        let failed = mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Failed)
            .count();
        let completed = mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Completed)
            .count();

        let mut record_counts = Vec::new();
        for kind in &config.sync.kinds {
            let kind = fieldsync_core::domain::EntityKind::new(kind.clone())?;
            let records = store.get_all(&kind).await?;
            record_counts.push((kind, records.len()));
        }

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "pending": pending,
                "failed": failed,
                "completed": completed,
                "has_pending_changes": pending > 0,
                "records": record_counts
                    .iter()
                    .map(|(kind, count)| serde_json::json!({
                        "kind": kind.as_str(),
                        "count": count,
                    }))
                    .collect::<Vec<_>>(),
            }));
            return Ok(());
        }

        let summary = summary_line(pending, failed);
        if failed > 0 {
            // Permanently failed entries need operator attention
            formatter.error(&summary);
        } else if pending > 0 {
            formatter.info(&summary);
        } else {
            formatter.success(&summary);
        }
        formatter.info(&format!(
            "Queue: {pending} pending, {completed} completed, {failed} failed"
        ));
        for (kind, count) in &record_counts {
            formatter.info(&format!("{}: {} record{}", kind, count, if *count == 1 { "" } else { "s" }));
        }

        Ok(())
    }
}

/// One-line queue summary shown at the top of the human-readable output
fn summary_line(pending: usize, failed: usize) -> String {
    if pending == 0 && failed == 0 {
        "All local changes are synchronized".to_string()
    } else {
        format!(
            "{pending} pending change{}, {failed} permanently failed",
            if pending == 1 { "" } else { "s" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_wording() {
        assert_eq!(summary_line(0, 0), "All local changes are synchronized");
        assert_eq!(summary_line(1, 0), "1 pending change, 0 permanently failed");
        assert_eq!(summary_line(3, 2), "3 pending changes, 2 permanently failed");
    }
}
