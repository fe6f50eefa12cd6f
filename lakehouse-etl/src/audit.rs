use lakehouse_store::{RunCounts, RunLog, Stage};

/// Identity of one job run, shared by its log lines and run-log rows
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub stage: Stage,
    pub source: Option<String>,
}

impl RunContext {
    /// New run with a random v4 id
    pub fn new(stage: Stage, source: Option<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            stage,
            source,
        }
    }
}

/// Log a successful run
pub fn log_run_success(context: &RunContext, counts: RunCounts, run_log: &RunLog) {
    tracing::info!(
        run_id = %context.run_id,
        stage = context.stage.as_str(),
        source = context.source.as_deref().unwrap_or("N/A"),
        records_in = counts.records_in,
        records_out = counts.records_out,
        dropped = counts.dropped,
        status = "success",
        "Run: {} {}",
        context.stage.as_str(),
        context.source.as_deref().unwrap_or("")
    );

    if let Err(e) = run_log.log_success(
        &context.run_id,
        context.stage,
        context.source.as_deref(),
        counts,
    ) {
        tracing::error!("Failed to write run log to database: {}", e);
    }
}

/// Log a failed run
pub fn log_run_error(context: &RunContext, error: &str, run_log: &RunLog) {
    tracing::warn!(
        run_id = %context.run_id,
        stage = context.stage.as_str(),
        source = context.source.as_deref().unwrap_or("N/A"),
        status = "error",
        error = error,
        "Run: {} failed: {}",
        context.stage.as_str(),
        error
    );

    if let Err(e) = run_log.log_error(
        &context.run_id,
        context.stage,
        context.source.as_deref(),
        error,
    ) {
        tracing::error!("Failed to write run log to database: {}", e);
    }
}
