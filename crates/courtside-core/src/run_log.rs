// SQLite persistence for optimization run summaries.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Final status of a run as written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// The best strategy solved; later ranks may still be infeasible.
    Ok,
    /// Not even the best strategy could be solved.
    Infeasible,
    /// A fatal upstream or data-integrity failure stopped the run.
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "OK",
            RunStatus::Infeasible => "INFEASIBLE",
            RunStatus::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(RunStatus::Ok),
            "INFEASIBLE" => Some(RunStatus::Infeasible),
            "ERROR" => Some(RunStatus::Error),
            _ => None,
        }
    }
}

/// One row of the `runs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub team_id: u32,
    pub start_week: u32,
    pub horizon_weeks: u32,
    /// Manual overrides as supplied to the run, serialized as JSON.
    pub overrides: serde_json::Value,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub message: Option<String>,
    pub best_objective: Option<f64>,
    /// Flattened "OUT x -> IN y" transfer descriptions of the best strategy.
    pub transfers: Vec<String>,
}

/// SQLite-backed append-only log of optimization runs.
pub struct RunLog {
    conn: Mutex<Connection>,
}

impl RunLog {
    /// Open (or create) the run log at `path`. Pass `":memory:"` for an
    /// ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open run log at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set run log pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS runs (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at     TEXT NOT NULL,
                team_id        INTEGER NOT NULL,
                start_week     INTEGER NOT NULL,
                horizon_weeks  INTEGER NOT NULL,
                overrides      TEXT NOT NULL,
                duration_ms    INTEGER NOT NULL,
                status         TEXT NOT NULL,
                message        TEXT,
                best_objective REAL,
                transfers      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_team ON runs(team_id);
            ",
        )
        .context("failed to create run log schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Resolve a configured path. An empty path falls back to the platform
    /// data directory (`.../courtside/courtside-runs.db`).
    pub fn resolve_path(configured: &str) -> PathBuf {
        if !configured.trim().is_empty() {
            return PathBuf::from(configured);
        }
        directories::ProjectDirs::from("", "", "courtside")
            .map(|dirs| dirs.data_local_dir().join("courtside-runs.db"))
            .unwrap_or_else(|| PathBuf::from("courtside-runs.db"))
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("run log mutex poisoned")
    }

    /// Append one run summary.
    pub fn record_run(&self, record: &RunRecord) -> Result<()> {
        let conn = self.conn();
        let overrides_json =
            serde_json::to_string(&record.overrides).context("failed to serialize overrides")?;
        let transfers_json =
            serde_json::to_string(&record.transfers).context("failed to serialize transfers")?;
        conn.execute(
            "INSERT INTO runs
                (started_at, team_id, start_week, horizon_weeks, overrides, duration_ms,
                 status, message, best_objective, transfers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.started_at.to_rfc3339(),
                record.team_id,
                record.start_week,
                record.horizon_weeks,
                overrides_json,
                record.duration_ms as i64,
                record.status.as_str(),
                record.message,
                record.best_objective,
                transfers_json,
            ],
        )
        .context("failed to record run")?;
        Ok(())
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT started_at, team_id, start_week, horizon_weeks, overrides, duration_ms,
                        status, message, best_objective, transfers
                 FROM runs ORDER BY id DESC LIMIT ?1",
            )
            .context("failed to prepare recent_runs query")?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<f64>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .context("failed to query runs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map run rows")?;

        rows.into_iter()
            .map(
                |(started, team_id, start_week, horizon, overrides, duration, status, message, best, transfers)| {
                    Ok(RunRecord {
                        started_at: DateTime::parse_from_rfc3339(&started)
                            .context("invalid started_at timestamp")?
                            .with_timezone(&Utc),
                        team_id,
                        start_week,
                        horizon_weeks: horizon,
                        overrides: serde_json::from_str(&overrides)
                            .context("invalid overrides JSON")?,
                        duration_ms: duration.max(0) as u64,
                        status: RunStatus::parse(&status)
                            .with_context(|| format!("unknown run status {status}"))?,
                        message,
                        best_objective: best,
                        transfers: serde_json::from_str(&transfers)
                            .context("invalid transfers JSON")?,
                    })
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(status: RunStatus, objective: Option<f64>) -> RunRecord {
        RunRecord {
            started_at: Utc.with_ymd_and_hms(2025, 11, 3, 18, 0, 0).unwrap(),
            team_id: 17,
            start_week: 7,
            horizon_weeks: 1,
            overrides: serde_json::json!({ "force_drop": [101] }),
            duration_ms: 4200,
            status,
            message: None,
            best_objective: objective,
            transfers: vec!["OUT 101 -> IN 202".into()],
        }
    }

    #[test]
    fn record_and_read_back() {
        let log = RunLog::open(":memory:").unwrap();
        log.record_run(&sample(RunStatus::Ok, Some(512.5))).unwrap();

        let runs = log.recent_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0], sample(RunStatus::Ok, Some(512.5)));
    }

    #[test]
    fn recent_runs_newest_first() {
        let log = RunLog::open(":memory:").unwrap();
        log.record_run(&sample(RunStatus::Ok, Some(1.0))).unwrap();
        let mut failed = sample(RunStatus::Error, None);
        failed.message = Some("no phase matches gameweek 99".into());
        log.record_run(&failed).unwrap();

        let runs = log.recent_runs(1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Error);
        assert_eq!(runs[0].message.as_deref(), Some("no phase matches gameweek 99"));
        assert!(runs[0].best_objective.is_none());
    }

    #[test]
    fn resolve_path_keeps_configured_value() {
        assert_eq!(RunLog::resolve_path("runs.db"), PathBuf::from("runs.db"));
        assert!(RunLog::resolve_path("").ends_with("courtside-runs.db"));
    }
}
