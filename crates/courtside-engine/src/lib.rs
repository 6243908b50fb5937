// Optimization core: valuation, calendar, roster model, solver and
// strategy enumeration. No I/O happens in this crate.

pub mod calendar;
pub mod enumerator;
pub mod ledger;
pub mod model;
pub mod player;
pub mod pool;
pub mod schedule;
pub mod solver;
pub mod strategy;
pub mod valuation;

pub use enumerator::{enumerate, solve_best, RankOutcome};
pub use model::{BudgetCap, RosterProblem, RosterRules};
pub use solver::{DefaultBackend, MilpBackend, SolveFailure};
pub use strategy::Strategy;
