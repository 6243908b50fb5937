// Schedule mapping: per (player, future day) participation probability.
//
// A confirmed fixture gives both teams probability 1. A fixture in a
// contingent (bracket) event is only played by the winner of the listed
// pairing, so each side gets its win ratio normalized against the other's.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::player::{EventId, Player, TeamId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub event_id: EventId,
    pub kickoff: Option<DateTime<Utc>>,
    pub home: TeamId,
    pub away: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
    pub wins: u32,
    pub losses: u32,
}

impl TeamRecord {
    /// Season win ratio, `None` before the first game.
    pub fn win_ratio(&self) -> Option<f64> {
        let played = self.wins + self.losses;
        (played > 0).then(|| f64::from(self.wins) / f64::from(played))
    }
}

/// Probability that `team` advances past `opponent`.
///
/// 0.5 when either side has no record, or when neither has won a game.
pub fn advance_probability(team: Option<&TeamRecord>, opponent: Option<&TeamRecord>) -> f64 {
    let (Some(own), Some(other)) = (
        team.and_then(TeamRecord::win_ratio),
        opponent.and_then(TeamRecord::win_ratio),
    ) else {
        return 0.5;
    };
    let total = own + other;
    if total <= 0.0 {
        return 0.5;
    }
    own / total
}

/// Earliest kickoff of every event that has one.
pub fn first_kickoffs(fixtures: &[Fixture]) -> HashMap<EventId, DateTime<Utc>> {
    let mut out: HashMap<EventId, DateTime<Utc>> = HashMap::new();
    for f in fixtures {
        let Some(kickoff) = f.kickoff else { continue };
        out.entry(f.event_id)
            .and_modify(|k| {
                if kickoff < *k {
                    *k = kickoff;
                }
            })
            .or_insert(kickoff);
    }
    out
}

/// Dense player x day grid of participation probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationMatrix {
    days: usize,
    cells: Vec<f64>,
}

impl ParticipationMatrix {
    pub fn zeros(players: usize, days: usize) -> Self {
        Self {
            days,
            cells: vec![0.0; players * days],
        }
    }

    /// Build from rows of per-day probabilities (one row per player).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let days = rows.first().map_or(0, Vec::len);
        let cells = rows
            .into_iter()
            .flat_map(|mut row| {
                row.resize(days, 0.0);
                row
            })
            .collect();
        Self { days, cells }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn players(&self) -> usize {
        if self.days == 0 {
            0
        } else {
            self.cells.len() / self.days
        }
    }

    pub fn get(&self, player: usize, day: usize) -> f64 {
        self.cells[player * self.days + day]
    }

    pub fn set(&mut self, player: usize, day: usize, value: f64) {
        self.cells[player * self.days + day] = value;
    }

    /// Whether the player has any chance of playing on the day.
    pub fn plays(&self, player: usize, day: usize) -> bool {
        self.get(player, day) > 0.0
    }
}

/// Map fixtures of the future days onto the candidate pool.
///
/// `future_events[d]` is the event bound to solver day `d`. Players marked
/// unavailable get an all-zero row.
pub fn participation(
    players: &[Player],
    future_events: &[EventId],
    fixtures: &[Fixture],
    teams: &[TeamRecord],
    contingent_events: &HashSet<EventId>,
) -> ParticipationMatrix {
    let records: HashMap<TeamId, &TeamRecord> = teams.iter().map(|t| (t.id, t)).collect();

    // Per day, each team's best chance of taking the floor.
    let mut team_chance: Vec<HashMap<TeamId, f64>> = vec![HashMap::new(); future_events.len()];
    for (day, event) in future_events.iter().enumerate() {
        for f in fixtures.iter().filter(|f| f.event_id == *event) {
            let (home_p, away_p) = if contingent_events.contains(event) {
                let home = records.get(&f.home).copied();
                let away = records.get(&f.away).copied();
                (
                    advance_probability(home, away),
                    advance_probability(away, home),
                )
            } else {
                (1.0, 1.0)
            };
            for (team, p) in [(f.home, home_p), (f.away, away_p)] {
                let cell = team_chance[day].entry(team).or_insert(0.0);
                *cell = cell.max(p).min(1.0);
            }
        }
    }

    let mut matrix = ParticipationMatrix::zeros(players.len(), future_events.len());
    for (p, player) in players.iter().enumerate() {
        if !player.available {
            continue;
        }
        for (day, chances) in team_chance.iter().enumerate() {
            if let Some(&chance) = chances.get(&player.team_id) {
                matrix.set(p, day, chance);
            }
        }
    }
    matrix
}
