// Roster model builder: translates game rules into a binary integer program.
//
// Variables live in a dense arena indexed by (player, day). Every cell has a
// roster and a transfer-in variable; starter and captain variables exist only
// where the player has a chance of playing that day.

use std::collections::BTreeMap;

use good_lp::{variable, Constraint, Expression, ProblemVariables, Variable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use courtside_core::config::LeagueConfig;

use crate::ledger::WeekPlan;
use crate::player::{EventId, Player, PlayerId, PositionGroup, TeamId};
use crate::pool::Overrides;
use crate::schedule::ParticipationMatrix;

// ---------------------------------------------------------------------------
// Problem definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BudgetCap {
    /// Total roster cost may not exceed this many tenths on any day.
    Limited(u32),
    Unlimited,
}

/// Squad and lineup rules, lifted from league.toml.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRules {
    pub roster_size: usize,
    pub back_court: usize,
    pub front_court: usize,
    pub max_per_team: usize,
    pub max_starters: usize,
    pub max_starters_per_position: usize,
}

impl From<&LeagueConfig> for RosterRules {
    fn from(league: &LeagueConfig) -> Self {
        Self {
            roster_size: league.roster_size,
            back_court: league.positions.back_court,
            front_court: league.positions.front_court,
            max_per_team: league.max_per_team,
            max_starters: league.lineup.max_starters,
            max_starters_per_position: league.lineup.max_starters_per_position,
        }
    }
}

impl Default for RosterRules {
    fn default() -> Self {
        Self {
            roster_size: 10,
            back_court: 5,
            front_court: 5,
            max_per_team: 2,
            max_starters: 5,
            max_starters_per_position: 3,
        }
    }
}

/// Everything needed to build the model for any strategy rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterProblem {
    pub players: Vec<Player>,
    pub participation: ParticipationMatrix,
    /// Event bound to each future day, in solver order.
    pub day_events: Vec<EventId>,
    pub weeks: Vec<WeekPlan>,
    pub budget: BudgetCap,
    /// Roster held before the first future day; `None` when starting from scratch.
    pub initial_roster: Option<Vec<PlayerId>>,
    pub overrides: Overrides,
    pub rules: RosterRules,
}

impl RosterProblem {
    pub fn day_count(&self) -> usize {
        self.day_events.len()
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Whether `id` was held before the horizon.
    pub fn initially_owned(&self, id: PlayerId) -> bool {
        self.initial_roster
            .as_ref()
            .is_some_and(|ids| ids.contains(&id))
    }
}

/// Forbids reproducing an earlier solution's exact set of held (player, day) cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCut {
    pub cells: Vec<(usize, usize)>,
}

// ---------------------------------------------------------------------------
// Variable arena
// ---------------------------------------------------------------------------

/// Dense (player, day) storage for model variables.
#[derive(Debug, Clone)]
pub struct VarArena {
    days: usize,
    roster: Vec<Variable>,
    transfer_in: Vec<Variable>,
    starter: Vec<Option<Variable>>,
    captain: Vec<Option<Variable>>,
}

impl VarArena {
    fn idx(&self, player: usize, day: usize) -> usize {
        player * self.days + day
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn cells(&self) -> usize {
        self.roster.len()
    }

    pub fn roster(&self, player: usize, day: usize) -> Variable {
        self.roster[self.idx(player, day)]
    }

    pub fn transfer_in(&self, player: usize, day: usize) -> Variable {
        self.transfer_in[self.idx(player, day)]
    }

    pub fn starter(&self, player: usize, day: usize) -> Option<Variable> {
        self.starter[self.idx(player, day)]
    }

    pub fn captain(&self, player: usize, day: usize) -> Option<Variable> {
        self.captain[self.idx(player, day)]
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A fully built, not yet solved model.
pub struct RosterModel {
    pub(crate) vars: ProblemVariables,
    pub(crate) arena: VarArena,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<Constraint>,
    variable_count: usize,
}

impl RosterModel {
    /// Build the integer program for `problem`, adding one no-repeat
    /// constraint per entry of `cuts`.
    pub fn build(problem: &RosterProblem, cuts: &[ExclusionCut]) -> Self {
        let mut builder = Builder::new(problem);
        builder.daily_constraints();
        builder.continuity();
        builder.initial_roster();
        builder.manual_overrides();
        builder.weekly_constraints();
        for cut in cuts {
            builder.exclude(cut);
        }
        builder.objective();
        builder.finish()
    }

    pub fn arena(&self) -> &VarArena {
        &self.arena
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

struct Builder<'a> {
    problem: &'a RosterProblem,
    vars: ProblemVariables,
    arena: VarArena,
    constraints: Vec<Constraint>,
    objective: Expression,
    variable_count: usize,
}

impl<'a> Builder<'a> {
    fn new(problem: &'a RosterProblem) -> Self {
        let players = problem.players.len();
        let days = problem.day_count();
        let mut vars = ProblemVariables::new();
        let mut arena = VarArena {
            days,
            roster: Vec::with_capacity(players * days),
            transfer_in: Vec::with_capacity(players * days),
            starter: Vec::with_capacity(players * days),
            captain: Vec::with_capacity(players * days),
        };
        let mut variable_count = 0;

        for p in 0..players {
            for d in 0..days {
                arena.roster.push(vars.add(variable().binary()));
                arena.transfer_in.push(vars.add(variable().binary()));
                variable_count += 2;
                if problem.participation.plays(p, d) {
                    arena.starter.push(Some(vars.add(variable().binary())));
                    arena.captain.push(Some(vars.add(variable().binary())));
                    variable_count += 2;
                } else {
                    arena.starter.push(None);
                    arena.captain.push(None);
                }
            }
        }

        Self {
            problem,
            vars,
            arena,
            constraints: Vec::new(),
            objective: Expression::default(),
            variable_count,
        }
    }

    fn players(&self) -> &'a [Player] {
        &self.problem.players
    }

    fn pin(&mut self, var: Variable, value: f64) {
        let mut held = Expression::default();
        held.add_mul(1.0, var);
        self.constraints.push(held.eq(value));
    }

    /// Squad size, budget, position quotas, team caps and lineup rules.
    fn daily_constraints(&mut self) {
        let rules = self.problem.rules;
        for d in 0..self.problem.day_count() {
            let mut size = Expression::default();
            let mut cost = Expression::default();
            let mut back = Expression::default();
            let mut front = Expression::default();
            let mut by_team: BTreeMap<TeamId, Expression> = BTreeMap::new();

            let mut starters = Expression::default();
            let mut back_starters = Expression::default();
            let mut front_starters = Expression::default();
            let mut any_starter = false;

            for (p, player) in self.players().iter().enumerate() {
                let r = self.arena.roster(p, d);
                size.add_mul(1.0, r);
                cost.add_mul(f64::from(player.cost), r);
                match player.position {
                    PositionGroup::BackCourt => back.add_mul(1.0, r),
                    PositionGroup::FrontCourt => front.add_mul(1.0, r),
                }
                by_team.entry(player.team_id).or_default().add_mul(1.0, r);

                if let Some(s) = self.arena.starter(p, d) {
                    any_starter = true;
                    starters.add_mul(1.0, s);
                    match player.position {
                        PositionGroup::BackCourt => back_starters.add_mul(1.0, s),
                        PositionGroup::FrontCourt => front_starters.add_mul(1.0, s),
                    }
                    self.constraints.push((s - r).leq(0.0));
                    if let Some(c) = self.arena.captain(p, d) {
                        self.constraints.push((c - s).leq(0.0));
                    }
                }
            }

            self.constraints.push(size.eq(rules.roster_size as f64));
            if let BudgetCap::Limited(cap) = self.problem.budget {
                self.constraints.push(cost.leq(f64::from(cap)));
            }
            self.constraints.push(back.eq(rules.back_court as f64));
            self.constraints.push(front.eq(rules.front_court as f64));
            for team in by_team.into_values() {
                self.constraints.push(team.leq(rules.max_per_team as f64));
            }

            if any_starter {
                let per_position = rules.max_starters_per_position as f64;
                self.constraints.push(starters.leq(rules.max_starters as f64));
                self.constraints.push(back_starters.leq(per_position));
                self.constraints.push(front_starters.leq(per_position));
            }
        }
    }

    /// `transfer_in[p,d] >= roster[p,d] - roster[p,d-1]`, with the
    /// pre-horizon roster standing in for day -1. From scratch, day 0 is
    /// squad selection and carries no transfer cost.
    fn continuity(&mut self) {
        for (p, player) in self.players().iter().enumerate() {
            for d in 0..self.problem.day_count() {
                let t = self.arena.transfer_in(p, d);
                let r = self.arena.roster(p, d);
                if d > 0 {
                    let prev = self.arena.roster(p, d - 1);
                    self.constraints.push((t - r + prev).geq(0.0));
                } else if self.problem.initial_roster.is_some() {
                    let owned = if self.problem.initially_owned(player.id) { 1.0 } else { 0.0 };
                    self.constraints.push((t - r).geq(-owned));
                }
            }
        }
    }

    /// Pin day 0 to the current roster unless day-0 changes were declared.
    ///
    /// Owned players stay unless force-dropped or a forced buy needs room.
    /// Non-owned players are kept out only while the owned set already fills
    /// the squad and nothing was declared.
    fn initial_roster(&mut self) {
        let problem = self.problem;
        if problem.initial_roster.is_none() || problem.day_count() == 0 {
            return;
        }
        let overrides = &problem.overrides;
        let owned_in_pool = problem
            .players
            .iter()
            .filter(|p| problem.initially_owned(p.id))
            .count();
        let full = owned_in_pool >= problem.rules.roster_size;
        let has_buys = !overrides.force_buy.is_empty();
        let drops_owned = overrides
            .force_drop
            .iter()
            .any(|id| problem.initially_owned(*id));

        for (p, player) in problem.players.iter().enumerate() {
            let r = self.arena.roster(p, 0);
            if problem.initially_owned(player.id) {
                if !has_buys && !overrides.force_drop.contains(&player.id) {
                    self.pin(r, 1.0);
                }
            } else if full && !has_buys && !drops_owned {
                self.pin(r, 0.0);
            }
        }
    }

    fn manual_overrides(&mut self) {
        let problem = self.problem;
        let overrides = &problem.overrides;
        let days = problem.day_count();
        for (p, player) in problem.players.iter().enumerate() {
            if overrides.force_drop.contains(&player.id) {
                for d in 0..days {
                    let r = self.arena.roster(p, d);
                    self.pin(r, 0.0);
                }
            }
            if overrides.force_buy.contains(&player.id) && days > 0 {
                let r = self.arena.roster(p, 0);
                self.pin(r, 1.0);
            }
            if overrides.force_keep.contains(&player.id) && problem.initially_owned(player.id) {
                for d in 0..days {
                    let r = self.arena.roster(p, d);
                    self.pin(r, 1.0);
                }
            }
        }
    }

    /// Weekly transfer allowance and captaincy.
    fn weekly_constraints(&mut self) {
        let players = self.players().len();
        for week in &self.problem.weeks {
            let mut transfers = Expression::default();
            let mut captains = Expression::default();
            let mut any_captain = false;

            for &d in &week.days {
                let counted = week.unlimited_day != Some(d);
                for p in 0..players {
                    if counted {
                        transfers.add_mul(1.0, self.arena.transfer_in(p, d));
                    }
                    if let Some(c) = self.arena.captain(p, d) {
                        any_captain = true;
                        captains.add_mul(1.0, c);
                    }
                }
            }

            self.constraints
                .push(transfers.leq(f64::from(week.transfer_allowance)));

            if any_captain {
                let required = if week.captain_available { 1.0 } else { 0.0 };
                self.constraints.push(captains.eq(required));
            } else {
                debug!(gameweek = week.gameweek, "no captain-eligible cells this week");
            }
        }
    }

    fn exclude(&mut self, cut: &ExclusionCut) {
        let mut held = Expression::default();
        for &(p, d) in &cut.cells {
            held.add_mul(1.0, self.arena.roster(p, d));
        }
        let bound = cut.cells.len().saturating_sub(1) as f64;
        self.constraints.push(held.leq(bound));
    }

    /// Expected points of starters, with the captain counted a second time.
    fn objective(&mut self) {
        let mut objective = Expression::default();
        for (p, player) in self.players().iter().enumerate() {
            for d in 0..self.problem.day_count() {
                let weight = player.projected_score * self.problem.participation.get(p, d);
                if weight == 0.0 {
                    continue;
                }
                if let Some(s) = self.arena.starter(p, d) {
                    objective.add_mul(weight, s);
                }
                if let Some(c) = self.arena.captain(p, d) {
                    objective.add_mul(weight, c);
                }
            }
        }
        self.objective = objective;
    }

    fn finish(self) -> RosterModel {
        debug!(
            variables = self.variable_count,
            constraints = self.constraints.len(),
            "built roster model"
        );
        RosterModel {
            vars: self.vars,
            arena: self.arena,
            objective: self.objective,
            constraints: self.constraints,
            variable_count: self.variable_count,
        }
    }
}

/// The (player, day) cells held in a solution, as a cut for the next rank.
pub fn cut_from_roster(held: impl IntoIterator<Item = (usize, usize)>) -> ExclusionCut {
    let mut cells: Vec<(usize, usize)> = held.into_iter().collect();
    cells.sort_unstable();
    ExclusionCut { cells }
}
