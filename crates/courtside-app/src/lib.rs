// Run orchestration: ties the provider, the optimization core and the run
// log together into one request/report cycle.

pub mod error;
pub mod pipeline;
pub mod report;
pub mod sink;

pub use error::RunError;
pub use pipeline::Pipeline;
pub use report::{BudgetBreakdown, RunReport, RunRequest, SCRATCH_TEAM};
pub use sink::{NullSink, RunSink};
