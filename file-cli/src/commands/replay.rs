//! Replay an event log through a fresh file cache.
//!
//! A log is JSON lines, one client `FileEvent` per line. Blank lines and
//! lines starting with `#` are skipped.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use file_cache::{FileCache, MetricsSnapshot};
use file_types::FileEvent;

/// How to treat the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Abort at the first rejected line.
    pub stop_on_error: bool,
    /// Write every canonical event as a JSON line.
    pub emit_events: bool,
}

/// A log line the cache did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// 1-based line number in the log.
    pub line: usize,
    /// Why it was rejected.
    pub message: String,
}

/// State of one open file at the end of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    /// File path.
    pub file_path: String,
    /// Replica version.
    pub version: u64,
    /// Length in characters.
    pub len_chars: usize,
    /// Hex SHA-256 of the contents.
    pub digest: String,
}

/// Outcome of a replay.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Event lines read (comments and blanks excluded).
    pub events: usize,
    /// Rejected lines, in log order.
    pub failures: Vec<LineFailure>,
    /// True if the replay stopped at a failure.
    pub aborted: bool,
    /// Files open after the last line, sorted by path.
    pub files: Vec<FileSummary>,
    /// Cache counters after the last line.
    pub metrics: MetricsSnapshot,
}

/// Feed `log` through a new cache, writing canonical events to `out` if asked.
pub fn replay_log(log: &str, options: ReplayOptions, out: &mut impl Write) -> Result<ReplayReport> {
    let cache = FileCache::new();
    let mut events = cache.observe_file_events();
    let mut report = ReplayReport {
        events: 0,
        failures: Vec::new(),
        aborted: false,
        files: Vec::new(),
        metrics: MetricsSnapshot::default(),
    };

    for (index, raw) in log.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        report.events += 1;

        let outcome = FileEvent::from_json(trimmed)
            .map_err(file_cache::CacheError::from)
            .and_then(|event| cache.on_event(event));

        if let Err(e) = outcome {
            tracing::debug!("Line {} rejected: {}", line, e);
            report.failures.push(LineFailure {
                line,
                message: e.to_string(),
            });
            if options.stop_on_error {
                report.aborted = true;
                break;
            }
        }

        for event in events.drain() {
            if options.emit_events {
                writeln!(out, "{}", event.to_json()?).context("Failed to write event")?;
            }
        }
    }

    report.files = cache
        .open_files()
        .into_iter()
        .filter_map(|path| {
            cache.get_buffer(&path).map(|replica| FileSummary {
                version: replica.version(),
                len_chars: replica.len_chars(),
                digest: replica.digest(),
                file_path: path,
            })
        })
        .collect();
    report.metrics = cache.metrics().snapshot();

    Ok(report)
}

/// Run the replay command.
pub async fn run(log_path: &Path, options: ReplayOptions) -> Result<()> {
    let log = tokio::fs::read_to_string(log_path)
        .await
        .with_context(|| format!("Failed to read event log {}", log_path.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = replay_log(&log, options, &mut out)?;

    for failure in &report.failures {
        eprintln!("line {}: {}", failure.line, failure.message);
    }
    print_summary(&report, &mut out)?;

    if report.aborted {
        anyhow::bail!("Replay stopped at first rejected line");
    }
    Ok(())
}

/// Print the end-of-replay summary.
pub fn print_summary(report: &ReplayReport, out: &mut impl Write) -> Result<()> {
    let m = &report.metrics;
    writeln!(out, "=== openfiles replay ===")?;
    writeln!(
        out,
        "Events: {} ({} rejected{})",
        report.events,
        report.failures.len(),
        if report.aborted { ", aborted" } else { "" }
    )?;
    writeln!(out)?;

    writeln!(out, "Open files: {}", report.files.len())?;
    for file in &report.files {
        writeln!(
            out,
            "  {} @{}  {} chars  sha256:{}",
            file.file_path,
            file.version,
            file.len_chars,
            &file.digest[..16]
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Metrics:")?;
    writeln!(out, "  applied:     {}", m.events_applied)?;
    writeln!(out, "  rejected:    {}", m.events_rejected)?;
    writeln!(out, "  stale syncs: {}", m.stale_syncs)?;
    writeln!(out, "  resyncs:     {}", m.resyncs)?;
    writeln!(
        out,
        "  published:   {} open, {} edit, {} close",
        m.opens, m.edits, m.closes
    )?;
    Ok(())
}
