// Run inputs and the report handed to the rendering layer.

use serde::{Deserialize, Serialize};

use courtside_core::run_log::RunStatus;
use courtside_engine::calendar::{Calendar, Cursor};
use courtside_engine::model::BudgetCap;
use courtside_engine::pool::Overrides;
use courtside_engine::{RankOutcome, Strategy};

/// Team id that means "build a squad from scratch".
pub const SCRATCH_TEAM: u32 = 0;

/// Parameters of one optimization run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub team_id: u32,
    pub start_gameweek: u32,
    pub horizon_weeks: u32,
    pub overrides: Overrides,
    pub cursor: Cursor,
    /// Overrides `[budget] safety_margin` when set.
    pub safety_margin: Option<u32>,
    /// Overrides `[enumeration] strategies` when set.
    pub strategies: Option<usize>,
}

impl RunRequest {
    pub fn from_scratch(&self) -> bool {
        self.team_id == SCRATCH_TEAM
    }
}

/// How the budget cap was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub cap: BudgetCap,
    /// Sum of sale values of the current roster; `None` from scratch.
    pub liquidation_value: Option<u32>,
    pub bank: Option<u32>,
    pub safety_margin: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub team_id: u32,
    pub start_gameweek: u32,
    pub horizon_weeks: u32,
    pub calendar: Calendar,
    pub budget: BudgetBreakdown,
    /// Points already scored on settled days of the horizon.
    pub banked_points: f64,
    pub pool_size: usize,
    pub outcomes: Vec<RankOutcome>,
}

impl RunReport {
    pub fn best(&self) -> Option<&Strategy> {
        self.outcomes.first().and_then(RankOutcome::strategy)
    }

    pub fn status(&self) -> RunStatus {
        if self.best().is_some() {
            RunStatus::Ok
        } else {
            RunStatus::Infeasible
        }
    }

    /// Best strategy's transfers as "OUT x -> IN y" lines.
    pub fn transfer_lines(&self) -> Vec<String> {
        self.best()
            .map(|s| s.transfers.iter().map(|t| t.describe()).collect())
            .unwrap_or_default()
    }

    /// Projected total for the horizon: banked points plus the best strategy.
    pub fn projected_total(&self) -> Option<f64> {
        self.best().map(|s| self.banked_points + s.objective)
    }
}
