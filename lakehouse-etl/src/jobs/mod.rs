pub mod demo;
pub mod ingest;
pub mod silver;

use crate::error::Result;
use crate::AppState;
use lakehouse_store::RunEntry;

pub use demo::{run_demo, save_demo, DemoRun};
pub use ingest::{run_ingest, IngestedBatch};
pub use silver::{run_silver, SilverReport, SilverRun};

/// Most recent run-log entries, newest first
pub fn recent_runs(state: &AppState, limit: usize) -> Result<Vec<RunEntry>> {
    Ok(state.run_log.recent_runs(limit)?)
}

/// One line per run for terminal output
pub fn format_run(entry: &RunEntry) -> String {
    let mut line = format!(
        "{}  {:<6} {:<7} {:<32} in={} out={} dropped={}",
        entry.timestamp,
        entry.stage,
        entry.result,
        entry.source.as_deref().unwrap_or("-"),
        entry.records_in,
        entry.records_out,
        entry.dropped
    );
    if let Some(error) = &entry.error_message {
        line.push_str("  error: ");
        line.push_str(error);
    }
    line
}
