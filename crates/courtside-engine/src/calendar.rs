// Calendar resolution: gameweeks to ordered day slots, split at the cursor.

use std::collections::HashMap;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::player::EventId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("no phase matches gameweek {0}")]
    UnknownGameweek(u32),

    #[error("horizon must cover at least one week")]
    EmptyHorizon,

    #[error("horizon has no days left to optimize")]
    NothingToOptimize,

    #[error("wildcard event {0} is not a future day of the horizon")]
    WildcardOutsideHorizon(EventId),
}

/// A provider-defined block of events sharing one transfer allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: u32,
    pub name: String,
    pub start_event: EventId,
    pub stop_event: EventId,
}

/// Where "now" is, for splitting the horizon into settled and future days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// An event is settled once its earliest kickoff has passed.
    Live(DateTime<Utc>),
    /// Every event before this id is settled.
    Simulated(EventId),
}

impl Cursor {
    /// Latest instant whose game data may be used for valuation.
    ///
    /// A simulated cursor on an event without fixtures cuts at the earliest
    /// kickoff of any later event. `None` only when no known event kicks off
    /// at or after the cursor.
    pub fn history_cutoff(
        &self,
        kickoffs: &HashMap<EventId, DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match self {
            Cursor::Live(now) => Some(*now),
            Cursor::Simulated(event) => kickoffs
                .iter()
                .filter(|(id, _)| *id >= event)
                .map(|(_, kickoff)| *kickoff)
                .min(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub event_id: EventId,
    pub gameweek: u32,
    /// Index into `Calendar::weeks`.
    pub week: usize,
    pub kickoff: Option<DateTime<Utc>>,
    pub settled: bool,
    /// 0-based index among future days; `None` for settled days.
    pub solver_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub gameweek: u32,
    /// Range into `Calendar::days`.
    pub days: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub weeks: Vec<Week>,
    pub days: Vec<Day>,
}

/// Trailing integer of a phase name ("Gameweek 7" -> 7).
pub fn gameweek_number(name: &str) -> Option<u32> {
    let trimmed = name.trim_end();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}

/// Ordered event ids of a gameweek.
///
/// Phases are matched by the number parsed from their name. Only when no
/// phase name carries that number is a number-less phase matched by its
/// start event.
pub fn week_events(phases: &[Phase], gameweek: u32) -> Option<Vec<EventId>> {
    let phase = phases
        .iter()
        .find(|p| gameweek_number(&p.name) == Some(gameweek))
        .or_else(|| {
            phases
                .iter()
                .find(|p| gameweek_number(&p.name).is_none() && p.start_event == gameweek)
        })?;
    if phase.stop_event < phase.start_event {
        return None;
    }
    Some((phase.start_event..=phase.stop_event).collect())
}

impl Calendar {
    /// Resolve `horizon_weeks` consecutive gameweeks starting at
    /// `start_gameweek` and split them at `cursor`.
    ///
    /// `kickoffs` maps each event to its earliest fixture kickoff. Settled
    /// days always form a prefix of the horizon.
    pub fn resolve(
        phases: &[Phase],
        start_gameweek: u32,
        horizon_weeks: u32,
        kickoffs: &HashMap<EventId, DateTime<Utc>>,
        cursor: &Cursor,
    ) -> Result<Self, CalendarError> {
        if horizon_weeks == 0 {
            return Err(CalendarError::EmptyHorizon);
        }

        let mut weeks = Vec::with_capacity(horizon_weeks as usize);
        let mut days = Vec::new();
        for offset in 0..horizon_weeks {
            let gameweek = start_gameweek + offset;
            let events =
                week_events(phases, gameweek).ok_or(CalendarError::UnknownGameweek(gameweek))?;
            let start = days.len();
            for event_id in events {
                days.push(Day {
                    event_id,
                    gameweek,
                    week: weeks.len(),
                    kickoff: kickoffs.get(&event_id).copied(),
                    settled: false,
                    solver_index: None,
                });
            }
            weeks.push(Week {
                gameweek,
                days: start..days.len(),
            });
        }

        let settled_prefix = match cursor {
            Cursor::Live(now) => days
                .iter()
                .rposition(|d| d.kickoff.is_some_and(|k| k <= *now))
                .map_or(0, |i| i + 1),
            Cursor::Simulated(first_open) => {
                days.iter().take_while(|d| d.event_id < *first_open).count()
            }
        };

        let mut next_index = 0;
        for (i, day) in days.iter_mut().enumerate() {
            if i < settled_prefix {
                day.settled = true;
            } else {
                day.solver_index = Some(next_index);
                next_index += 1;
            }
        }

        debug!(
            days = days.len(),
            settled = settled_prefix,
            future = next_index,
            "resolved calendar"
        );

        Ok(Self { weeks, days })
    }

    pub fn future_days(&self) -> impl Iterator<Item = &Day> {
        self.days.iter().filter(|d| !d.settled)
    }

    pub fn settled_days(&self) -> impl Iterator<Item = &Day> {
        self.days.iter().filter(|d| d.settled)
    }

    pub fn future_count(&self) -> usize {
        self.future_days().count()
    }

    /// First event of the horizon, settled or not.
    pub fn first_event(&self) -> Option<EventId> {
        self.days.first().map(|d| d.event_id)
    }

    /// Event ids of future days in solver order.
    pub fn future_events(&self) -> Vec<EventId> {
        self.future_days().map(|d| d.event_id).collect()
    }

    pub fn future_day(&self, solver_index: usize) -> Option<&Day> {
        self.days
            .iter()
            .find(|d| d.solver_index == Some(solver_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn phases() -> Vec<Phase> {
        vec![
            Phase {
                id: 1,
                name: "Overall".into(),
                start_event: 1,
                stop_event: 160,
            },
            Phase {
                id: 8,
                name: "Gameweek 7".into(),
                start_event: 43,
                stop_event: 49,
            },
            Phase {
                id: 9,
                name: "Gameweek 8".into(),
                start_event: 50,
                stop_event: 56,
            },
        ]
    }

    fn kickoffs() -> HashMap<EventId, DateTime<Utc>> {
        (43..=56)
            .map(|e| {
                let day = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i64::from(e - 43));
                (e, day)
            })
            .collect()
    }

    #[test]
    fn parses_trailing_numbers() {
        assert_eq!(gameweek_number("Gameweek 7"), Some(7));
        assert_eq!(gameweek_number("GW12 "), Some(12));
        assert_eq!(gameweek_number("Overall"), None);
    }

    #[test]
    fn week_lookup_by_name_then_start_event() {
        assert_eq!(week_events(&phases(), 7), Some((43..=49).collect()));
        assert_eq!(week_events(&phases(), 30), None);
    }

    #[test]
    fn named_week_beats_overall_phase_with_same_start() {
        let mut listed = phases();
        listed.insert(
            1,
            Phase {
                id: 2,
                name: "Gameweek 1".into(),
                start_event: 1,
                stop_event: 7,
            },
        );
        // "Overall" is listed first and also starts at event 1.
        assert_eq!(week_events(&listed, 1), Some((1..=7).collect()));
    }

    #[test]
    fn start_event_fallback_only_without_named_match() {
        let listed = vec![
            Phase {
                id: 1,
                name: "Overall".into(),
                start_event: 1,
                stop_event: 160,
            },
            Phase {
                id: 3,
                name: "Playoffs".into(),
                start_event: 150,
                stop_event: 156,
            },
        ];
        assert_eq!(week_events(&listed, 150), Some((150..=156).collect()));
        assert_eq!(week_events(&listed, 1).map(|v| v.len()), Some(160));
    }

    #[test]
    fn unknown_week_is_a_hard_stop() {
        let err = Calendar::resolve(&phases(), 8, 2, &kickoffs(), &Cursor::Simulated(0));
        assert_eq!(err, Err(CalendarError::UnknownGameweek(9)));
    }

    #[test]
    fn simulated_cursor_splits_and_indexes_future_days() {
        let cal = Calendar::resolve(&phases(), 7, 2, &kickoffs(), &Cursor::Simulated(45)).unwrap();
        assert_eq!(cal.weeks.len(), 2);
        assert_eq!(cal.days.len(), 14);
        assert_eq!(cal.settled_days().count(), 2);
        assert_eq!(cal.future_count(), 12);
        assert_eq!(cal.days[2].solver_index, Some(0));
        assert_eq!(cal.days[13].solver_index, Some(11));
        assert_eq!(cal.days[7].week, 1);
        assert_eq!(cal.future_events()[0], 45);
    }

    #[test]
    fn live_cursor_settles_started_events() {
        let now = Utc.with_ymd_and_hms(2025, 12, 3, 12, 0, 0).unwrap();
        let cal = Calendar::resolve(&phases(), 7, 1, &kickoffs(), &Cursor::Live(now)).unwrap();
        // Events 43, 44 and 45 kicked off on Dec 1, 2 and 3.
        assert_eq!(cal.settled_days().count(), 3);
        assert_eq!(cal.future_day(0).map(|d| d.event_id), Some(46));
    }

    #[test]
    fn simulated_cutoff_skips_events_without_fixtures() {
        let mut k = kickoffs();
        k.remove(&45);
        k.remove(&46);
        assert_eq!(Cursor::Simulated(45).history_cutoff(&k), k.get(&47).copied());
    }

    #[test]
    fn zero_horizon_rejected() {
        let err = Calendar::resolve(&phases(), 7, 0, &kickoffs(), &Cursor::Simulated(0));
        assert_eq!(err, Err(CalendarError::EmptyHorizon));
    }

    #[test]
    fn cutoff_follows_cursor() {
        let k = kickoffs();
        assert_eq!(Cursor::Simulated(45).history_cutoff(&k), k.get(&45).copied());
        assert_eq!(Cursor::Simulated(99).history_cutoff(&k), None);
        let now = Utc::now();
        assert_eq!(Cursor::Live(now).history_cutoff(&k), Some(now));
    }
}
