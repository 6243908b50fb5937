// End-to-end tests for the run pipeline.
//
// A twelve-team league is built in memory as a provider snapshot, run
// through the full pipeline with the bundled solver, and logged to an
// in-memory run log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use courtside_app::{NullSink, Pipeline, RunError, RunRequest, RunSink};
use courtside_core::config::*;
use courtside_core::run_log::{RunLog, RunStatus};
use courtside_engine::calendar::{CalendarError, Cursor};
use courtside_engine::model::BudgetCap;
use courtside_engine::pool::Overrides;
use courtside_engine::strategy::Role;
use courtside_engine::DefaultBackend;
use courtside_provider::types::*;
use courtside_provider::{Snapshot, SnapshotProvider};

// ===========================================================================
// Test helpers
// ===========================================================================

const TEAM: u32 = 17;

fn test_config() -> Config {
    Config {
        league: LeagueConfig {
            name: "Test League".into(),
            roster_size: 10,
            max_per_team: 2,
            transfers_per_week: 2,
            scratch_budget: 1000,
            positions: PositionQuotas {
                back_court: 5,
                front_court: 5,
            },
            lineup: LineupRules {
                max_starters: 5,
                max_starters_per_position: 3,
            },
        },
        optimizer: OptimizerConfig {
            valuation: ValuationConfig {
                recent_games: 10,
                injury_window: 2,
                chance_threshold: 50,
                threshold_inclusive: false,
            },
            budget: BudgetConfig {
                safety_margin: 1,
                unlimited_cap: 100_000,
            },
            pool: PoolConfig {
                candidate_pool_size: 200,
            },
            enumeration: EnumerationConfig { strategies: 3 },
            schedule: ScheduleConfig {
                contingent_events: vec![],
            },
        },
        provider: ProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            bootstrap_ttl_secs: 3600,
            fixtures_ttl_secs: 3600,
            history_ttl_secs: 86400,
            request_timeout_secs: 1,
            fetch_concurrency: 4,
        },
        run_log_path: ":memory:".into(),
    }
}

fn kickoff(event: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 0, 30, 0).unwrap() + Duration::days(i64::from(event))
}

fn picks(ids: &[u32], event: u32, captain: Option<u32>, points: f64) -> PicksDto {
    PicksDto {
        picks: ids
            .iter()
            .map(|&id| PickDto {
                element: id,
                purchase_price: Some(80 + id),
                multiplier: if Some(id) == captain { 2 } else { 1 },
                is_captain: Some(id) == captain,
            })
            .collect(),
        entry_history: EntryHistoryDto {
            event,
            bank: 50,
            points,
        },
    }
}

/// 24 players on 12 teams: odd ids back court, even ids front court.
/// Higher ids cost more and score more. Team 17 owns players 1-10 before
/// event 4 (the start of gameweek 2).
fn league_snapshot() -> Snapshot {
    let elements = (1..=24)
        .map(|id| ElementDto {
            id,
            first_name: "Player".into(),
            second_name: id.to_string(),
            web_name: format!("P{id}"),
            team: id.div_ceil(2),
            element_type: if id % 2 == 1 { 1 } else { 2 },
            status: "a".into(),
            now_cost: 80 + id,
            chance_of_playing_next_round: None,
            total_points: f64::from(id * 40),
        })
        .collect();
    let teams = (1..=12)
        .map(|id| TeamDto {
            id,
            name: format!("City {id}"),
            short_name: None,
            win: id,
            loss: 12 - id,
        })
        .collect();
    let phases = vec![
        PhaseDto {
            id: 2,
            name: "Gameweek 1".into(),
            start_event: 1,
            stop_event: 3,
        },
        PhaseDto {
            id: 3,
            name: "Gameweek 2".into(),
            start_event: 4,
            stop_event: 6,
        },
        PhaseDto {
            id: 4,
            name: "Gameweek 3".into(),
            start_event: 7,
            stop_event: 9,
        },
    ];
    let fixtures = (1..=9)
        .flat_map(|event| {
            (0..6).map(move |pair| FixtureDto {
                event: Some(event),
                kickoff_time: Some(kickoff(event)),
                team_h: 2 * pair + 1,
                team_a: 2 * pair + 2,
            })
        })
        .collect();
    let histories = (1..=24)
        .map(|id| {
            let games = (0..3)
                .map(|g| HistoryDto {
                    kickoff_time: kickoff(0) - Duration::days(g),
                    minutes: 30,
                    total_points: f64::from(id),
                })
                .collect();
            (id, games)
        })
        .collect();

    let owned: Vec<u32> = (1..=10).collect();
    let mut team_picks = HashMap::new();
    team_picks.insert(3, picks(&owned, 3, None, 120.0));

    Snapshot {
        bootstrap: BootstrapDto {
            elements,
            teams,
            element_types: vec![
                ElementTypeDto {
                    id: 1,
                    singular_name: "Back Court".into(),
                },
                ElementTypeDto {
                    id: 2,
                    singular_name: "Front Court".into(),
                },
            ],
            phases,
        },
        fixtures,
        histories,
        picks: HashMap::from([(TEAM, team_picks)]),
    }
}

fn request(team_id: u32, gameweek: u32, first_open: u32) -> RunRequest {
    RunRequest {
        team_id,
        start_gameweek: gameweek,
        horizon_weeks: 1,
        overrides: Overrides::default(),
        cursor: Cursor::Simulated(first_open),
        safety_margin: None,
        strategies: None,
    }
}

fn pipeline(snapshot: Snapshot, log: &Arc<RunLog>) -> Pipeline {
    let sink: Arc<dyn RunSink> = log.clone();
    Pipeline::new(
        test_config(),
        Arc::new(SnapshotProvider::new(snapshot)),
        Arc::new(DefaultBackend),
        sink,
    )
}

fn memory_log() -> Arc<RunLog> {
    Arc::new(RunLog::open(":memory:").unwrap())
}

// ===========================================================================
// Successful runs
// ===========================================================================

#[tokio::test]
async fn run_produces_three_ranked_strategies_and_logs_ok() {
    let log = memory_log();
    let report = pipeline(league_snapshot(), &log)
        .run(&request(TEAM, 2, 4))
        .await
        .unwrap();

    assert_eq!(report.status(), RunStatus::Ok);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.pool_size, 24);
    // Sale values equal purchase prices: 81..=90 plus 50 in the bank, less the margin.
    assert_eq!(report.budget.liquidation_value, Some(855));
    assert_eq!(report.budget.bank, Some(50));
    assert_eq!(report.budget.cap, BudgetCap::Limited(904));

    let best = report.best().unwrap();
    assert_eq!(best.days.len(), 3);
    assert_eq!(best.days[0].event_id, 4);
    for day in &best.days {
        assert_eq!(day.slots.len(), 10);
    }
    // Day 0 keeps the current roster.
    let mut day0: Vec<u32> = best.days[0].slots.iter().map(|s| s.player_id).collect();
    day0.sort_unstable();
    assert_eq!(day0, (1..=10).collect::<Vec<_>>());
    assert!(best.weeks[0].transfers <= 2);
    assert_eq!(best.days.iter().filter(|d| d.captain().is_some()).count(), 1);

    let runs = log.recent_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Ok);
    assert_eq!(runs[0].team_id, TEAM);
    assert_eq!(runs[0].best_objective, Some(best.objective));
    assert_eq!(runs[0].transfers, report.transfer_lines());
}

#[tokio::test]
async fn scratch_run_uses_scratch_budget() {
    let log = memory_log();
    let report = pipeline(league_snapshot(), &log)
        .run(&request(0, 1, 1))
        .await
        .unwrap();
    assert_eq!(report.budget.cap, BudgetCap::Limited(1000));
    assert_eq!(report.budget.liquidation_value, None);
    let best = report.best().unwrap();
    assert!(best.days[0].transfers_in.is_empty());
    assert!(best.transfers.iter().all(|t| t.solver_index > 0));
}

#[tokio::test]
async fn settled_days_consume_allowance_and_captain() {
    let mut snapshot = league_snapshot();
    // On event 4 the team swapped player 1 for 11 and played its captain.
    let day_one: Vec<u32> = (2..=11).collect();
    snapshot
        .picks
        .get_mut(&TEAM)
        .unwrap()
        .insert(4, picks(&day_one, 4, Some(11), 210.0));

    let log = memory_log();
    let report = pipeline(snapshot, &log)
        .run(&request(TEAM, 2, 5))
        .await
        .unwrap();

    assert_eq!(report.banked_points, 210.0);
    assert_eq!(report.calendar.settled_days().count(), 1);
    let best = report.best().unwrap();
    assert_eq!(best.days.len(), 2);
    assert_eq!(best.days[0].event_id, 5);
    assert!(best.days.iter().all(|d| d.captain().is_none()));
    assert!(best.weeks[0].allowance == 1 && best.weeks[0].transfers <= 1);
    assert_eq!(report.projected_total(), Some(210.0 + best.objective));
}

#[tokio::test]
async fn forced_keep_doubtful_player_is_never_started() {
    let mut snapshot = league_snapshot();
    let doubtful = snapshot
        .bootstrap
        .elements
        .iter_mut()
        .find(|e| e.id == 9)
        .unwrap();
    doubtful.chance_of_playing_next_round = Some(10);

    let mut req = request(TEAM, 2, 4);
    req.overrides.force_keep = vec![9];
    let log = memory_log();
    let report = pipeline(snapshot, &log).run(&req).await.unwrap();

    let best = report.best().unwrap();
    for day in &best.days {
        let slot = day.slots.iter().find(|s| s.player_id == 9).unwrap();
        assert!(!matches!(slot.role, Role::Starter | Role::Captain));
    }
}

#[tokio::test]
async fn missing_picks_fall_back_to_the_event_before() {
    let mut snapshot = league_snapshot();
    let sheets = snapshot.picks.get_mut(&TEAM).unwrap();
    let pre = sheets.remove(&3).unwrap();
    sheets.insert(2, pre);

    let log = memory_log();
    let report = pipeline(snapshot, &log)
        .run(&request(TEAM, 2, 4))
        .await
        .unwrap();
    assert_eq!(report.budget.liquidation_value, Some(855));
    assert_eq!(report.status(), RunStatus::Ok);
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn budget_margin_beyond_funds_is_infeasible_not_fatal() {
    let mut req = request(TEAM, 2, 4);
    req.safety_margin = Some(10_000);
    let log = memory_log();
    let report = pipeline(league_snapshot(), &log).run(&req).await.unwrap();

    assert_eq!(report.status(), RunStatus::Infeasible);
    assert_eq!(report.outcomes.len(), 1);
    let runs = log.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Infeasible);
    assert!(runs[0].message.as_deref().unwrap_or("").contains("rank 1"));
}

#[tokio::test]
async fn short_roster_is_fatal_and_logged() {
    let mut snapshot = league_snapshot();
    let nine: Vec<u32> = (1..=9).collect();
    snapshot
        .picks
        .get_mut(&TEAM)
        .unwrap()
        .insert(3, picks(&nine, 3, None, 0.0));

    let log = memory_log();
    let err = pipeline(snapshot, &log)
        .run(&request(TEAM, 2, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::IncompleteRoster { found: 9, required: 10, .. }));

    let runs = log.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Error);
    assert!(runs[0].message.as_deref().unwrap_or("").contains("9 players"));
}

#[tokio::test]
async fn unknown_team_has_no_roster() {
    let log = memory_log();
    let err = pipeline(league_snapshot(), &log)
        .run(&request(99, 2, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NoRoster { team_id: 99, .. }));
}

#[tokio::test]
async fn unknown_gameweek_stops_the_run() {
    let log = memory_log();
    let mut req = request(TEAM, 3, 1);
    req.horizon_weeks = 2;
    let err = pipeline(league_snapshot(), &log).run(&req).await.unwrap_err();
    assert!(matches!(err, RunError::Calendar(CalendarError::UnknownGameweek(4))));
    assert_eq!(log.recent_runs(1).unwrap()[0].status, RunStatus::Error);
}

#[tokio::test]
async fn conflicting_overrides_are_rejected() {
    let mut req = request(TEAM, 2, 4);
    req.overrides.force_keep = vec![3];
    req.overrides.force_drop = vec![3];
    let p = Pipeline::new(
        test_config(),
        Arc::new(SnapshotProvider::new(league_snapshot())),
        Arc::new(DefaultBackend),
        Arc::new(NullSink),
    );
    let err = p.run(&req).await.unwrap_err();
    assert!(matches!(err, RunError::Overrides(_)));
}
