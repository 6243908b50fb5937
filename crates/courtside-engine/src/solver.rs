// Solver adapter: hands a built model to a MILP backend and reads back the
// binary assignment.

use good_lp::{default_solver, ResolutionError, Solution, SolverModel};
use thiserror::Error;
use tracing::debug;

use crate::model::RosterModel;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveFailure {
    #[error("no roster satisfies every constraint")]
    Infeasible,

    #[error("objective is unbounded")]
    Unbounded,

    #[error("solver error: {0}")]
    Solver(String),
}

impl From<ResolutionError> for SolveFailure {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveFailure::Infeasible,
            ResolutionError::Unbounded => SolveFailure::Unbounded,
            other => SolveFailure::Solver(other.to_string()),
        }
    }
}

/// Rounded values of every model variable, laid out like the model's arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    days: usize,
    roster: Vec<bool>,
    transfer_in: Vec<bool>,
    starter: Vec<bool>,
    captain: Vec<bool>,
    objective: f64,
}

impl Assignment {
    fn idx(&self, player: usize, day: usize) -> usize {
        player * self.days + day
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn players(&self) -> usize {
        if self.days == 0 {
            0
        } else {
            self.roster.len() / self.days
        }
    }

    pub fn roster(&self, player: usize, day: usize) -> bool {
        self.roster[self.idx(player, day)]
    }

    pub fn transfer_in(&self, player: usize, day: usize) -> bool {
        self.transfer_in[self.idx(player, day)]
    }

    pub fn starter(&self, player: usize, day: usize) -> bool {
        self.starter[self.idx(player, day)]
    }

    pub fn captain(&self, player: usize, day: usize) -> bool {
        self.captain[self.idx(player, day)]
    }

    /// Objective value reported by the solver.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Every (player, day) cell held on the roster.
    pub fn roster_cells(&self) -> Vec<(usize, usize)> {
        let players = self.players();
        let mut cells = Vec::new();
        for p in 0..players {
            for d in 0..self.days {
                if self.roster(p, d) {
                    cells.push((p, d));
                }
            }
        }
        cells
    }
}

/// A MILP backend able to solve a built roster model.
pub trait MilpBackend: Send + Sync {
    fn solve(&self, model: RosterModel) -> Result<Assignment, SolveFailure>;
}

/// The solver compiled into good_lp (`microlp`, pure Rust).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackend;

impl MilpBackend for DefaultBackend {
    fn solve(&self, model: RosterModel) -> Result<Assignment, SolveFailure> {
        let RosterModel {
            vars,
            arena,
            objective,
            constraints,
            ..
        } = model;

        let mut problem = vars.maximise(objective.clone()).using(default_solver);
        for constraint in constraints {
            problem = problem.with(constraint);
        }
        let solution = problem.solve()?;

        let cells = arena.cells();
        let days = arena.days();
        let on = |v: good_lp::Variable| solution.value(v) > 0.5;
        let maybe_on = |v: Option<good_lp::Variable>| v.is_some_and(|v| on(v));

        let mut roster = Vec::with_capacity(cells);
        let mut transfer_in = Vec::with_capacity(cells);
        let mut starter = Vec::with_capacity(cells);
        let mut captain = Vec::with_capacity(cells);
        for p in 0..cells.checked_div(days).unwrap_or(0) {
            for d in 0..days {
                roster.push(on(arena.roster(p, d)));
                transfer_in.push(on(arena.transfer_in(p, d)));
                starter.push(maybe_on(arena.starter(p, d)));
                captain.push(maybe_on(arena.captain(p, d)));
            }
        }

        let objective = solution.eval(objective);
        debug!(objective, "solver returned optimum");

        Ok(Assignment {
            days,
            roster,
            transfer_in,
            starter,
            captain,
            objective,
        })
    }
}

#[cfg(test)]
impl Assignment {
    /// Hand-built assignment for exercising the strategy reader.
    pub(crate) fn from_parts(
        days: usize,
        roster: Vec<bool>,
        starter: Vec<bool>,
        captain: Vec<bool>,
        transfer_in: Vec<bool>,
    ) -> Self {
        Self {
            days,
            roster,
            transfer_in,
            starter,
            captain,
            objective: 0.0,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_objective(mut self, objective: f64) -> Self {
        self.objective = objective;
        self
    }
}
