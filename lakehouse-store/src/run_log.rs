//! SQLite-based pipeline run log
//!
//! Separate file from the layer documents for easy management and rotation.

use crate::error::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

/// Pipeline stage a run executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Silver,
    Demo,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Silver => "silver",
            Stage::Demo => "demo",
        }
    }
}

/// Record counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub records_in: usize,
    pub records_out: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEntry {
    pub run_id: String,
    pub timestamp: String,
    pub stage: String,
    pub source: Option<String>,
    pub records_in: i64,
    pub records_out: i64,
    pub dropped: i64,
    pub result: String,
    pub error_message: Option<String>,
}

/// Run log
pub struct RunLog {
    conn: Connection,
}

#[allow(clippy::result_large_err)]
impl RunLog {
    /// Open the run log (create if not exists)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let log = Self { conn };
        log.initialize()?;
        Ok(log)
    }

    /// Initialize tables
    fn initialize(&self) -> Result<()> {
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                stage TEXT NOT NULL,
                source TEXT,
                records_in INTEGER NOT NULL DEFAULT 0,
                records_out INTEGER NOT NULL DEFAULT 0,
                dropped INTEGER NOT NULL DEFAULT 0,
                result TEXT NOT NULL,
                error_message TEXT
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_timestamp ON pipeline_runs(timestamp)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_stage ON pipeline_runs(stage)",
            [],
        )?;

        Ok(())
    }

    /// Record a run entry
    pub fn log(
        &self,
        run_id: &str,
        stage: Stage,
        source: Option<&str>,
        counts: RunCounts,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = if success { "success" } else { "error" };

        self.conn.execute(
            r#"
            INSERT INTO pipeline_runs
            (run_id, stage, source, records_in, records_out, dropped, result, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                run_id,
                stage.as_str(),
                source,
                counts.records_in as i64,
                counts.records_out as i64,
                counts.dropped as i64,
                result,
                error_message,
            ],
        )?;

        Ok(())
    }

    /// Record a successful run (helper)
    pub fn log_success(
        &self,
        run_id: &str,
        stage: Stage,
        source: Option<&str>,
        counts: RunCounts,
    ) -> Result<()> {
        self.log(run_id, stage, source, counts, true, None)
    }

    /// Record a failed run (helper)
    pub fn log_error(
        &self,
        run_id: &str,
        stage: Stage,
        source: Option<&str>,
        error: &str,
    ) -> Result<()> {
        self.log(run_id, stage, source, RunCounts::default(), false, Some(error))
    }

    /// Get recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT run_id, timestamp, stage, source, records_in, records_out,
                   dropped, result, error_message
            FROM pipeline_runs
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RunEntry {
                run_id: row.get(0)?,
                timestamp: row.get(1)?,
                stage: row.get(2)?,
                source: row.get(3)?,
                records_in: row.get(4)?,
                records_out: row.get(5)?,
                dropped: row.get(6)?,
                result: row.get(7)?,
                error_message: row.get(8)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }
}
