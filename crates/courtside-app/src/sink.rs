// Fire-and-forget destination for run summaries.

use tracing::{debug, warn};

use courtside_core::run_log::{RunLog, RunRecord};

/// Receives one summary per run. Implementations must not fail the run.
pub trait RunSink: Send + Sync {
    fn record(&self, record: &RunRecord);
}

impl RunSink for RunLog {
    fn record(&self, record: &RunRecord) {
        match self.record_run(record) {
            Ok(()) => debug!(status = record.status.as_str(), "run logged"),
            Err(e) => warn!("failed to log run: {e:#}"),
        }
    }
}

/// Discards every record.
pub struct NullSink;

impl RunSink for NullSink {
    fn record(&self, _record: &RunRecord) {}
}
