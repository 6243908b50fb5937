// Strategy enumeration: solve, cut the solution off, solve again.
//
// Each rank gets a freshly built model carrying every earlier rank's cut, so
// no solver instance is ever mutated between ranks.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{cut_from_roster, ExclusionCut, RosterModel, RosterProblem};
use crate::solver::MilpBackend;
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RankOutcome {
    Solved(Strategy),
    Infeasible { rank: usize, reason: String },
}

impl RankOutcome {
    pub fn rank(&self) -> usize {
        match self {
            RankOutcome::Solved(s) => s.rank,
            RankOutcome::Infeasible { rank, .. } => *rank,
        }
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        match self {
            RankOutcome::Solved(s) => Some(s),
            RankOutcome::Infeasible { .. } => None,
        }
    }
}

/// Solve up to `max_strategies` mutually distinct strategies, best first.
///
/// Stops at the first rank the solver cannot satisfy; that rank is reported
/// as infeasible and every earlier rank is kept.
pub fn enumerate(
    problem: &RosterProblem,
    backend: &dyn MilpBackend,
    max_strategies: usize,
) -> Vec<RankOutcome> {
    let mut cuts: Vec<ExclusionCut> = Vec::new();
    let mut outcomes = Vec::with_capacity(max_strategies);

    for rank in 1..=max_strategies {
        let model = RosterModel::build(problem, &cuts);
        info!(
            rank,
            variables = model.variable_count(),
            constraints = model.constraint_count(),
            "solving strategy"
        );
        match backend.solve(model) {
            Ok(assignment) => {
                let strategy = Strategy::from_assignment(rank, problem, &assignment);
                info!(
                    rank,
                    objective = strategy.objective,
                    transfers = strategy.transfers.len(),
                    "strategy solved"
                );
                cuts.push(cut_from_roster(assignment.roster_cells()));
                outcomes.push(RankOutcome::Solved(strategy));
            }
            Err(failure) => {
                warn!(rank, error = %failure, "strategy rank not solvable");
                outcomes.push(RankOutcome::Infeasible {
                    rank,
                    reason: failure.to_string(),
                });
                break;
            }
        }
    }

    outcomes
}

/// Solve rank 1 only.
pub fn solve_best(problem: &RosterProblem, backend: &dyn MilpBackend) -> RankOutcome {
    enumerate(problem, backend, 1)
        .into_iter()
        .next()
        .unwrap_or_else(|| RankOutcome::Infeasible {
            rank: 1,
            reason: "no strategy requested".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Assignment, SolveFailure};
    use std::sync::Mutex;

    use crate::ledger::WeekPlan;
    use crate::model::{BudgetCap, RosterRules};
    use crate::pool::Overrides;
    use crate::schedule::ParticipationMatrix;

    /// Backend that replays scripted answers and records how many cuts each model carried.
    struct Scripted {
        answers: Mutex<Vec<Result<Assignment, SolveFailure>>>,
        constraint_counts: Mutex<Vec<usize>>,
    }

    impl MilpBackend for Scripted {
        fn solve(&self, model: RosterModel) -> Result<Assignment, SolveFailure> {
            self.constraint_counts
                .lock()
                .expect("lock")
                .push(model.constraint_count());
            self.answers.lock().expect("lock").remove(0)
        }
    }

    fn empty_problem() -> RosterProblem {
        RosterProblem {
            players: Vec::new(),
            participation: ParticipationMatrix::zeros(0, 1),
            day_events: vec![7],
            weeks: vec![WeekPlan {
                gameweek: 1,
                days: vec![0],
                transfer_allowance: 2,
                captain_available: true,
                unlimited_day: None,
            }],
            budget: BudgetCap::Unlimited,
            initial_roster: None,
            overrides: Overrides::default(),
            rules: RosterRules::default(),
        }
    }

    fn blank() -> Assignment {
        Assignment::from_parts(1, vec![], vec![], vec![], vec![])
    }

    #[test]
    fn stops_at_first_infeasible_rank() {
        let backend = Scripted {
            answers: Mutex::new(vec![Ok(blank()), Err(SolveFailure::Infeasible), Ok(blank())]),
            constraint_counts: Mutex::new(Vec::new()),
        };
        let outcomes = enumerate(&empty_problem(), &backend, 3);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].strategy().is_some());
        assert_eq!(outcomes[1].rank(), 2);
        assert!(matches!(&outcomes[1], RankOutcome::Infeasible { reason, .. } if reason.contains("no roster")));

        // The second model carries one cut more than the first.
        let counts = backend.constraint_counts.lock().expect("lock").clone();
        assert_eq!(counts[1], counts[0] + 1);
    }

    #[test]
    fn solve_best_returns_rank_one() {
        let backend = Scripted {
            answers: Mutex::new(vec![Err(SolveFailure::Infeasible)]),
            constraint_counts: Mutex::new(Vec::new()),
        };
        let outcome = solve_best(&empty_problem(), &backend);
        assert_eq!(outcome.rank(), 1);
        assert!(outcome.strategy().is_none());
    }
}
