// Strategy extraction: turns a solver assignment into per-day lineups,
// weekly projections and a transfer list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::RosterProblem;
use crate::player::{EventId, PlayerId, PositionGroup};
use crate::solver::Assignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Captain,
    Starter,
    Bench,
    /// Held, but the player's team has no game that day.
    NoGame,
}

impl Role {
    pub fn display_str(&self) -> &'static str {
        match self {
            Role::Captain => "Captain",
            Role::Starter => "Starter",
            Role::Bench => "Bench",
            Role::NoGame => "No Game",
        }
    }

    /// Display order within a day: captain, starters, bench, idle.
    pub fn sort_order(&self) -> u8 {
        match self {
            Role::Captain => 0,
            Role::Starter => 1,
            Role::Bench => 2,
            Role::NoGame => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSlot {
    pub player_id: PlayerId,
    pub name: String,
    pub position: PositionGroup,
    pub role: Role,
    /// Contribution to the day's projection, captain bonus included.
    pub expected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub solver_index: usize,
    pub event_id: EventId,
    pub gameweek: u32,
    pub slots: Vec<RosterSlot>,
    pub transfers_in: Vec<PlayerId>,
    pub transfers_out: Vec<PlayerId>,
    pub projected: f64,
}

impl DayPlan {
    pub fn captain(&self) -> Option<&RosterSlot> {
        self.slots.iter().find(|s| s.role == Role::Captain)
    }

    pub fn starters(&self) -> impl Iterator<Item = &RosterSlot> {
        self.slots
            .iter()
            .filter(|s| matches!(s.role, Role::Captain | Role::Starter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekProjection {
    pub gameweek: u32,
    pub projected: f64,
    /// Transfers counted against the allowance (wildcard day excluded).
    pub transfers: u32,
    pub allowance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub event_id: EventId,
    pub solver_index: usize,
    pub player_in: PlayerId,
    pub in_name: String,
    pub buy_price: u32,
    pub player_out: Option<PlayerId>,
    pub out_name: Option<String>,
    pub sell_price: Option<u32>,
}

impl Transfer {
    /// "OUT name -> IN name"; outgoing players missing from the pool show by id.
    pub fn describe(&self) -> String {
        let out = match (&self.out_name, self.player_out) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => "-".to_string(),
        };
        format!("OUT {out} -> IN {}", self.in_name)
    }
}

/// One full solution for the future part of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub rank: usize,
    pub objective: f64,
    pub days: Vec<DayPlan>,
    pub weeks: Vec<WeekProjection>,
    pub transfers: Vec<Transfer>,
}

impl Strategy {
    pub fn from_assignment(rank: usize, problem: &RosterProblem, assignment: &Assignment) -> Self {
        let mut days = Vec::with_capacity(problem.day_count());
        let mut transfers = Vec::new();
        let mut previous: Option<HashSet<PlayerId>> = problem
            .initial_roster
            .as_ref()
            .map(|ids| ids.iter().copied().collect());

        for (d, &event_id) in problem.day_events.iter().enumerate() {
            let gameweek = problem
                .weeks
                .iter()
                .find(|w| w.days.contains(&d))
                .map_or(0, |w| w.gameweek);

            let mut slots = Vec::new();
            let mut held = HashSet::new();
            for (p, player) in problem.players.iter().enumerate() {
                if !assignment.roster(p, d) {
                    continue;
                }
                held.insert(player.id);
                let weight = player.projected_score * problem.participation.get(p, d);
                let (role, expected) = if assignment.captain(p, d) {
                    (Role::Captain, 2.0 * weight)
                } else if assignment.starter(p, d) {
                    (Role::Starter, weight)
                } else if problem.participation.plays(p, d) {
                    (Role::Bench, 0.0)
                } else {
                    (Role::NoGame, 0.0)
                };
                slots.push(RosterSlot {
                    player_id: player.id,
                    name: player.name.clone(),
                    position: player.position,
                    role,
                    expected,
                });
            }

            let (mut transfers_in, mut transfers_out) = match &previous {
                Some(prev) => (
                    held.difference(prev).copied().collect::<Vec<_>>(),
                    prev.difference(&held).copied().collect::<Vec<_>>(),
                ),
                None => (Vec::new(), Vec::new()),
            };
            transfers_in.sort_unstable();
            transfers_out.sort_unstable();

            for (i, &incoming) in transfers_in.iter().enumerate() {
                let outgoing = transfers_out.get(i).copied();
                let in_player = problem.player_index(incoming).map(|idx| &problem.players[idx]);
                let out_player = outgoing
                    .and_then(|id| problem.player_index(id))
                    .map(|idx| &problem.players[idx]);
                transfers.push(Transfer {
                    event_id,
                    solver_index: d,
                    player_in: incoming,
                    in_name: in_player.map_or_else(|| format!("#{incoming}"), |p| p.name.clone()),
                    buy_price: in_player.map_or(0, |p| p.cost),
                    player_out: outgoing,
                    out_name: out_player.map(|p| p.name.clone()),
                    sell_price: out_player.map(|p| p.cost),
                });
            }

            let projected = slots.iter().map(|s| s.expected).sum();
            days.push(DayPlan {
                solver_index: d,
                event_id,
                gameweek,
                slots,
                transfers_in,
                transfers_out,
                projected,
            });
            previous = Some(held);
        }

        let weeks = problem
            .weeks
            .iter()
            .map(|w| WeekProjection {
                gameweek: w.gameweek,
                projected: w.days.iter().filter_map(|&d| days.get(d)).map(|d| d.projected).sum(),
                transfers: w
                    .days
                    .iter()
                    .filter(|&&d| w.unlimited_day != Some(d))
                    .filter_map(|&d| days.get(d))
                    .map(|d| d.transfers_in.len() as u32)
                    .sum(),
                allowance: w.transfer_allowance,
            })
            .collect();

        let objective = assignment.objective();
        let slot_total: f64 = days.iter().map(|d| d.projected).sum();
        if (objective - slot_total).abs() > 1e-6 * objective.abs().max(1.0) {
            warn!(rank, objective, slot_total, "solver objective disagrees with lineup projection");
        }

        Self {
            rank,
            objective,
            days,
            weeks,
            transfers,
        }
    }
}
