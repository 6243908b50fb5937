// Valuation engine: projected scores, availability verdicts, sale values.
//
// Projected score is a rolling mean of fantasy points over the most recent
// games a player actually took part in. Sale value applies the game's
// profit-sharing fee: half of any price rise, rounded up, is withheld.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use courtside_core::config::ValuationConfig;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One completed game from a player's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub kickoff: DateTime<Utc>,
    pub minutes: u32,
    pub total_points: f64,
}

impl GameRecord {
    /// Whether the player recorded any participation in this game.
    pub fn participated(&self) -> bool {
        self.minutes > 0 || self.total_points != 0.0
    }
}

/// Valuation parameters, lifted from `[valuation]` in optimizer.toml.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationRules {
    pub recent_games: usize,
    pub injury_window: usize,
    pub chance_threshold: u8,
    pub threshold_inclusive: bool,
}

impl From<&ValuationConfig> for ValuationRules {
    fn from(cfg: &ValuationConfig) -> Self {
        Self {
            recent_games: cfg.recent_games,
            injury_window: cfg.injury_window,
            chance_threshold: cfg.chance_threshold,
            threshold_inclusive: cfg.threshold_inclusive,
        }
    }
}

impl Default for ValuationRules {
    fn default() -> Self {
        Self {
            recent_games: 10,
            injury_window: 2,
            chance_threshold: 50,
            threshold_inclusive: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableReason {
    /// The most recent `injury_window` games all show zero minutes.
    ConsecutiveDnp,
    /// Reported chance of playing next round is under the threshold.
    Doubtful { chance: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Unavailable(UnavailableReason),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Result of valuing one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appraisal {
    pub projected_score: f64,
    pub availability: Availability,
}

/// How an appraised player enters the candidate pool, if at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// In the pool, starter-eligible, at the given score.
    Active { score: f64 },
    /// In the pool at score 0 and never started (owned or forced-keep while unavailable).
    Retained,
    Excluded,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Arithmetic mean of `total_points` over the `recent_games` most recent
/// games with recorded participation. Zero when no game qualifies.
pub fn projected_score(history: &[GameRecord], recent_games: usize) -> f64 {
    let mut played: Vec<&GameRecord> = history.iter().filter(|g| g.participated()).collect();
    played.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
    played.truncate(recent_games);

    if played.is_empty() {
        return 0.0;
    }
    played.iter().map(|g| g.total_points).sum::<f64>() / played.len() as f64
}

/// Availability verdict from recent minutes and the reported chance of playing.
pub fn availability(
    history: &[GameRecord],
    chance_of_playing: Option<u8>,
    rules: &ValuationRules,
) -> Availability {
    if rules.injury_window > 0 && history.len() >= rules.injury_window {
        let mut recent: Vec<&GameRecord> = history.iter().collect();
        recent.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
        if recent
            .iter()
            .take(rules.injury_window)
            .all(|g| g.minutes == 0)
        {
            return Availability::Unavailable(UnavailableReason::ConsecutiveDnp);
        }
    }

    if let Some(chance) = chance_of_playing {
        let doubtful = if rules.threshold_inclusive {
            chance <= rules.chance_threshold
        } else {
            chance < rules.chance_threshold
        };
        if doubtful {
            return Availability::Unavailable(UnavailableReason::Doubtful { chance });
        }
    }

    Availability::Available
}

/// Value a player from their game history and injury report.
pub fn appraise(
    history: &[GameRecord],
    chance_of_playing: Option<u8>,
    rules: &ValuationRules,
) -> Appraisal {
    Appraisal {
        projected_score: projected_score(history, rules.recent_games),
        availability: availability(history, chance_of_playing, rules),
    }
}

/// Decide pool membership for an appraised player.
///
/// `retain` is true for owned and forced-keep players; `force_available`
/// overrides an unavailability verdict entirely.
pub fn admit(appraisal: &Appraisal, retain: bool, force_available: bool) -> Admission {
    if appraisal.availability.is_available() || force_available {
        return Admission::Active {
            score: appraisal.projected_score,
        };
    }
    if retain {
        Admission::Retained
    } else {
        Admission::Excluded
    }
}

/// Price an owned player can be sold for.
///
/// At or below the purchase price the sale value is the current price.
/// Above it, half the profit rounded up to the next price unit is withheld.
pub fn sale_value(purchase_price: u32, current_price: u32) -> u32 {
    if current_price <= purchase_price {
        return current_price;
    }
    let profit = current_price - purchase_price;
    let fee = profit.div_ceil(2);
    current_price - fee
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn game(days_ago: i64, minutes: u32, points: f64) -> GameRecord {
        let base = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        GameRecord {
            kickoff: base - Duration::days(days_ago),
            minutes,
            total_points: points,
        }
    }

    #[test]
    fn sale_value_examples() {
        assert_eq!(sale_value(50, 57), 53);
        assert_eq!(sale_value(50, 56), 53);
        assert_eq!(sale_value(50, 51), 50);
        assert_eq!(sale_value(50, 50), 50);
        assert_eq!(sale_value(50, 45), 45);
    }

    #[test]
    fn sale_value_never_exceeds_current_or_drops_below_purchase_on_gain() {
        for pp in 40..60u32 {
            for cp in pp..pp + 20 {
                let sv = sale_value(pp, cp);
                assert!(sv <= cp);
                assert!(sv >= pp);
            }
        }
    }

    #[test]
    fn projected_score_uses_most_recent_played_games() {
        let history = vec![
            game(1, 30, 40.0),
            game(2, 0, 0.0),
            game(3, 28, 20.0),
            game(4, 31, 60.0),
        ];
        // Two most recent played games: 40 and 20.
        assert!((projected_score(&history, 2) - 30.0).abs() < 1e-9);
        assert!((projected_score(&history, 10) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn projected_score_ignores_input_order() {
        let history = vec![game(4, 31, 60.0), game(1, 30, 40.0), game(3, 28, 20.0)];
        assert!((projected_score(&history, 1) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn projected_score_zero_without_games() {
        assert_eq!(projected_score(&[], 10), 0.0);
        assert_eq!(projected_score(&[game(1, 0, 0.0)], 10), 0.0);
    }

    #[test]
    fn two_straight_dnps_is_unavailable() {
        let rules = ValuationRules::default();
        let history = vec![game(1, 0, 0.0), game(2, 0, 0.0), game(3, 30, 25.0)];
        assert_eq!(
            availability(&history, None, &rules),
            Availability::Unavailable(UnavailableReason::ConsecutiveDnp)
        );
    }

    #[test]
    fn single_dnp_is_available() {
        let rules = ValuationRules::default();
        let history = vec![game(1, 0, 0.0), game(2, 22, 18.0)];
        assert_eq!(availability(&history, None, &rules), Availability::Available);
    }

    #[test]
    fn chance_threshold_strict_and_inclusive() {
        let mut rules = ValuationRules::default();
        assert_eq!(availability(&[], Some(50), &rules), Availability::Available);
        assert_eq!(
            availability(&[], Some(25), &rules),
            Availability::Unavailable(UnavailableReason::Doubtful { chance: 25 })
        );

        rules.threshold_inclusive = true;
        assert_eq!(
            availability(&[], Some(50), &rules),
            Availability::Unavailable(UnavailableReason::Doubtful { chance: 50 })
        );
        assert_eq!(availability(&[], Some(75), &rules), Availability::Available);
    }

    #[test]
    fn admission_rules() {
        let doubtful = Appraisal {
            projected_score: 33.0,
            availability: Availability::Unavailable(UnavailableReason::Doubtful { chance: 10 }),
        };
        assert_eq!(admit(&doubtful, false, false), Admission::Excluded);
        assert_eq!(admit(&doubtful, true, false), Admission::Retained);
        assert_eq!(admit(&doubtful, false, true), Admission::Active { score: 33.0 });

        let healthy = Appraisal {
            projected_score: 21.5,
            availability: Availability::Available,
        };
        assert_eq!(admit(&healthy, false, false), Admission::Active { score: 21.5 });
    }
}
