// Settled-day bookkeeping and per-week transfer/captain plans.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{Calendar, CalendarError};
use crate::player::{EventId, PlayerId};

/// One pick from a team sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub player_id: PlayerId,
    /// Purchase price in tenths; falls back to the current price when absent.
    pub purchase_price: Option<u32>,
    pub multiplier: u32,
    pub is_captain: bool,
}

/// A team sheet for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub event_id: EventId,
    pub picks: Vec<Pick>,
    pub bank: u32,
    /// Points scored in this event.
    pub points: f64,
}

impl TeamSheet {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.picks.iter().map(|p| p.player_id).collect()
    }

    /// Whether the captain multiplier was applied on this sheet.
    pub fn captain_played(&self) -> bool {
        self.picks.iter().any(|p| p.is_captain && p.multiplier > 1)
    }
}

/// What settled days already consumed, per horizon week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekLedger {
    pub transfers_used: u32,
    pub captain_used: bool,
    pub banked_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettledLedger {
    pub weeks: Vec<WeekLedger>,
}

impl SettledLedger {
    /// Build from the sheets of settled days.
    ///
    /// Transfers are derived by diffing each settled sheet against the
    /// previous one, starting from `pre_horizon` (the roster held before the
    /// first day of the horizon). Sheets for events outside the calendar's
    /// settled days are ignored.
    pub fn from_sheets(
        calendar: &Calendar,
        pre_horizon: Option<&[PlayerId]>,
        sheets: &[TeamSheet],
    ) -> Self {
        let mut weeks = vec![WeekLedger::default(); calendar.weeks.len()];
        let mut previous: Option<HashSet<PlayerId>> =
            pre_horizon.map(|ids| ids.iter().copied().collect());

        for day in calendar.settled_days() {
            let Some(sheet) = sheets.iter().find(|s| s.event_id == day.event_id) else {
                continue;
            };
            let today: HashSet<PlayerId> = sheet.player_ids().into_iter().collect();
            let week = &mut weeks[day.week];
            if let Some(prev) = &previous {
                week.transfers_used += today.difference(prev).count() as u32;
            }
            week.captain_used |= sheet.captain_played();
            week.banked_points += sheet.points;
            previous = Some(today);
        }

        Self { weeks }
    }

    pub fn banked_points(&self) -> f64 {
        self.weeks.iter().map(|w| w.banked_points).sum()
    }
}

/// Aggregate constraints for one week of the model, in solver-day terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub gameweek: u32,
    /// Solver indices of this week's future days.
    pub days: Vec<usize>,
    pub transfer_allowance: u32,
    /// False when the captain was already played on a settled day.
    pub captain_available: bool,
    /// Solver index of the wildcard day, exempt from the allowance.
    pub unlimited_day: Option<usize>,
}

/// Derive per-week plans for the future part of the horizon.
///
/// Every week gets the full `transfers_per_week` minus what its settled days
/// consumed. Weeks with no future days are dropped.
pub fn plan_weeks(
    calendar: &Calendar,
    ledger: &SettledLedger,
    transfers_per_week: u32,
    wildcard_event: Option<EventId>,
) -> Result<Vec<WeekPlan>, CalendarError> {
    let wildcard_day = match wildcard_event {
        Some(event) => Some(
            calendar
                .future_days()
                .find(|d| d.event_id == event)
                .ok_or(CalendarError::WildcardOutsideHorizon(event))?,
        ),
        None => None,
    };

    let mut plans = Vec::new();
    for (week_idx, week) in calendar.weeks.iter().enumerate() {
        let days: Vec<usize> = calendar.days[week.days.clone()]
            .iter()
            .filter_map(|d| d.solver_index)
            .collect();
        if days.is_empty() {
            continue;
        }
        let consumed = ledger.weeks.get(week_idx).cloned().unwrap_or_default();
        let plan = WeekPlan {
            gameweek: week.gameweek,
            days,
            transfer_allowance: transfers_per_week.saturating_sub(consumed.transfers_used),
            captain_available: !consumed.captain_used,
            unlimited_day: wildcard_day
                .filter(|d| d.week == week_idx)
                .and_then(|d| d.solver_index),
        };
        debug!(
            gameweek = plan.gameweek,
            allowance = plan.transfer_allowance,
            captain = plan.captain_available,
            "week plan"
        );
        plans.push(plan);
    }

    if plans.is_empty() {
        return Err(CalendarError::NothingToOptimize);
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Cursor, Phase};
    use std::collections::HashMap;

    fn calendar(first_open: EventId) -> Calendar {
        let phases = vec![
            Phase {
                id: 1,
                name: "Gameweek 1".into(),
                start_event: 1,
                stop_event: 4,
            },
            Phase {
                id: 2,
                name: "Gameweek 2".into(),
                start_event: 5,
                stop_event: 7,
            },
        ];
        Calendar::resolve(&phases, 1, 2, &HashMap::new(), &Cursor::Simulated(first_open)).unwrap()
    }

    fn sheet(event_id: EventId, ids: &[PlayerId], captain: Option<PlayerId>, points: f64) -> TeamSheet {
        TeamSheet {
            event_id,
            picks: ids
                .iter()
                .map(|&id| Pick {
                    player_id: id,
                    purchase_price: None,
                    multiplier: if Some(id) == captain { 2 } else { 1 },
                    is_captain: Some(id) == captain,
                })
                .collect(),
            bank: 0,
            points,
        }
    }

    #[test]
    fn counts_settled_transfers_and_captain() {
        let cal = calendar(3);
        let pre: Vec<PlayerId> = (1..=10).collect();
        let mut day1: Vec<PlayerId> = (1..=9).collect();
        day1.push(11);
        let mut day2 = day1.clone();
        day2[0] = 12;
        let sheets = vec![sheet(1, &day1, None, 180.0), sheet(2, &day2, Some(5), 220.0)];

        let ledger = SettledLedger::from_sheets(&cal, Some(&pre), &sheets);
        assert_eq!(ledger.weeks[0].transfers_used, 2);
        assert!(ledger.weeks[0].captain_used);
        assert!((ledger.banked_points() - 400.0).abs() < 1e-9);
        assert_eq!(ledger.weeks[1], WeekLedger::default());

        let plans = plan_weeks(&cal, &ledger, 2, None).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].days, vec![0, 1]);
        assert_eq!(plans[0].transfer_allowance, 0);
        assert!(!plans[0].captain_available);
        assert_eq!(plans[1].days, vec![2, 3, 4]);
        assert_eq!(plans[1].transfer_allowance, 2);
        assert!(plans[1].captain_available);
    }

    #[test]
    fn captain_flag_without_multiplier_is_not_consumed() {
        let cal = calendar(2);
        let ids: Vec<PlayerId> = (1..=10).collect();
        let mut s = sheet(1, &ids, Some(3), 100.0);
        s.picks[2].multiplier = 1;
        let ledger = SettledLedger::from_sheets(&cal, Some(&ids), &[s]);
        assert!(!ledger.weeks[0].captain_used);
        assert_eq!(ledger.weeks[0].transfers_used, 0);
    }

    #[test]
    fn fully_settled_week_is_dropped() {
        let cal = calendar(5);
        let plans = plan_weeks(&cal, &SettledLedger::default(), 2, None).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].gameweek, 2);
        assert_eq!(plans[0].days, vec![0, 1, 2]);
    }

    #[test]
    fn wildcard_must_be_future_day() {
        let cal = calendar(3);
        let err = plan_weeks(&cal, &SettledLedger::default(), 2, Some(1)).unwrap_err();
        assert_eq!(err, CalendarError::WildcardOutsideHorizon(1));

        let plans = plan_weeks(&cal, &SettledLedger::default(), 2, Some(6)).unwrap();
        assert_eq!(plans[0].unlimited_day, None);
        assert_eq!(plans[1].unlimited_day, Some(3));
    }

    #[test]
    fn nothing_left_to_optimize() {
        let cal = calendar(100);
        let err = plan_weeks(&cal, &SettledLedger::default(), 2, None).unwrap_err();
        assert_eq!(err, CalendarError::NothingToOptimize);
    }
}
