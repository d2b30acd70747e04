//! Check an event log without printing state.

use anyhow::{Context, Result};
use std::path::Path;

use super::replay::{replay_log, ReplayOptions};

/// Run the check command. Fails if any line is rejected.
pub async fn run(log_path: &Path) -> Result<()> {
    let log = tokio::fs::read_to_string(log_path)
        .await
        .with_context(|| format!("Failed to read event log {}", log_path.display()))?;

    let report = replay_log(&log, ReplayOptions::default(), &mut std::io::sink())?;
    for failure in &report.failures {
        eprintln!("line {}: {}", failure.line, failure.message);
    }

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} events rejected",
            report.failures.len(),
            report.events
        );
    }
    Ok(())
}
