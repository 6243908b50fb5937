// Fatal run failures. Anything here stops the run before or instead of
// solving; per-rank infeasibility is reported in the run report instead.

use thiserror::Error;

use courtside_engine::calendar::CalendarError;
use courtside_engine::player::EventId;
use courtside_engine::pool::OverrideError;
use courtside_provider::ProviderError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("upstream data failure: {0}")]
    Upstream(#[from] ProviderError),

    #[error("no roster found for team {team_id} at event {event} or the one before")]
    NoRoster { team_id: u32, event: EventId },

    #[error("roster for team {team_id} has {found} players, expected {required}")]
    IncompleteRoster {
        team_id: u32,
        found: usize,
        required: usize,
    },

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("invalid overrides: {0}")]
    Overrides(#[from] OverrideError),

    #[error("solver task failed: {0}")]
    SolverTask(String),
}
