// The optimization run: fetch -> value -> schedule -> build -> solve -> report.
//
// Every run builds its inputs from scratch. The provider is the only source
// of data; the sink receives exactly one summary per run whatever the
// outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use courtside_core::config::Config;
use courtside_core::run_log::{RunRecord, RunStatus};
use courtside_engine::calendar::{Calendar, CalendarError};
use courtside_engine::{enumerate, RankOutcome};
use courtside_engine::ledger::{plan_weeks, SettledLedger, TeamSheet};
use courtside_engine::model::{BudgetCap, RosterProblem, RosterRules};
use courtside_engine::player::{EventId, PlayerId};
use courtside_engine::pool::{build_pool, select_candidates, CatalogEntry};
use courtside_engine::schedule::{first_kickoffs, participation};
use courtside_engine::solver::MilpBackend;
use courtside_engine::valuation::{appraise, sale_value, GameRecord, ValuationRules};
use courtside_provider::DataProvider;

use crate::error::RunError;
use crate::report::{BudgetBreakdown, RunReport, RunRequest};
use crate::sink::RunSink;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: Config,
    provider: Arc<dyn DataProvider>,
    backend: Arc<dyn MilpBackend>,
    sink: Arc<dyn RunSink>,
}

/// The roster the horizon starts from, plus what settled days recorded.
struct RosterSource {
    /// Roster before the first day of the horizon.
    pre_horizon: Vec<PlayerId>,
    /// Sheets of settled days, in calendar order.
    settled: Vec<TeamSheet>,
    /// The most recent sheet: the roster entering the first future day.
    current: TeamSheet,
}

impl Pipeline {
    pub fn new(
        config: Config,
        provider: Arc<dyn DataProvider>,
        backend: Arc<dyn MilpBackend>,
        sink: Arc<dyn RunSink>,
    ) -> Self {
        Self {
            config,
            provider,
            backend,
            sink,
        }
    }

    /// Run once and log the outcome.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            team_id = request.team_id,
            gameweek = request.start_gameweek,
            horizon = request.horizon_weeks,
            "run starting"
        );

        let result = self.execute(request).await;
        let duration_ms = clock.elapsed().as_millis() as u64;

        let record = match &result {
            Ok(report) => {
                info!(
                    status = report.status().as_str(),
                    ranks = report.outcomes.len(),
                    duration_ms,
                    "run finished"
                );
                self.record(request, started_at, duration_ms, report.status(), None, Some(report))
            }
            Err(e) => {
                error!("run failed: {e}");
                self.record(request, started_at, duration_ms, RunStatus::Error, Some(e.to_string()), None)
            }
        };
        self.sink.record(&record);

        result
    }

    fn record(
        &self,
        request: &RunRequest,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        status: RunStatus,
        message: Option<String>,
        report: Option<&RunReport>,
    ) -> RunRecord {
        let message = message.or_else(|| {
            report.and_then(|r| {
                r.outcomes.iter().find_map(|o| match o {
                    RankOutcome::Infeasible { rank, reason } => Some(format!("rank {rank}: {reason}")),
                    RankOutcome::Solved(_) => None,
                })
            })
        });
        RunRecord {
            started_at,
            team_id: request.team_id,
            start_week: request.start_gameweek,
            horizon_weeks: request.horizon_weeks,
            overrides: serde_json::to_value(&request.overrides).unwrap_or_default(),
            duration_ms,
            status,
            message,
            best_objective: report.and_then(|r| r.best()).map(|s| s.objective),
            transfers: report.map(RunReport::transfer_lines).unwrap_or_default(),
        }
    }

    async fn execute(&self, request: &RunRequest) -> Result<RunReport, RunError> {
        let league = &self.config.league;
        let optimizer = &self.config.optimizer;

        // Catalog and schedule
        let bootstrap = self.provider.bootstrap().await?;
        let fixtures = self.provider.fixtures().await?;
        let kickoffs = first_kickoffs(&fixtures);
        let calendar = Calendar::resolve(
            &bootstrap.phases,
            request.start_gameweek,
            request.horizon_weeks,
            &kickoffs,
            &request.cursor,
        )?;
        if calendar.future_count() == 0 {
            return Err(CalendarError::NothingToOptimize.into());
        }
        let catalog: HashMap<PlayerId, &CatalogEntry> =
            bootstrap.players.iter().map(|e| (e.id, e)).collect();

        // Current roster and budget
        let roster = if request.from_scratch() {
            info!("building a squad from scratch");
            None
        } else {
            Some(self.fetch_roster(request.team_id, &calendar).await?)
        };

        let owned: HashSet<PlayerId> = roster
            .as_ref()
            .map(|r| r.current.player_ids().into_iter().collect())
            .unwrap_or_default();
        let known: HashSet<PlayerId> = catalog.keys().copied().collect();
        request.overrides.validate(&known, &owned)?;

        let mut sale_values: HashMap<PlayerId, u32> = HashMap::new();
        if let Some(source) = &roster {
            for pick in &source.current.picks {
                let Some(entry) = catalog.get(&pick.player_id) else {
                    warn!(player = pick.player_id, "owned player missing from catalog");
                    continue;
                };
                let purchase = pick.purchase_price.unwrap_or(entry.now_cost);
                sale_values.insert(pick.player_id, sale_value(purchase, entry.now_cost));
            }
        }
        let budget = self.budget(request, roster.as_ref(), &sale_values);
        info!(cap = ?budget.cap, liquidation = ?budget.liquidation_value, bank = ?budget.bank, "budget");

        // Valuation
        let candidates = select_candidates(
            &bootstrap.players,
            &owned,
            &request.overrides,
            optimizer.pool.candidate_pool_size,
        );
        let cutoff = request.cursor.history_cutoff(&kickoffs);
        let histories = self.fetch_histories(&candidates, cutoff).await;

        let rules = ValuationRules::from(&optimizer.valuation);
        let appraised: Vec<_> = candidates
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|entry| {
                let history = histories.get(&entry.id).map_or(&[][..], Vec::as_slice);
                let appraisal = appraise(history, entry.chance_of_playing, &rules);
                (CatalogEntry::clone(entry), appraisal)
            })
            .collect();
        let pool = build_pool(&appraised, &sale_values, &request.overrides);
        info!(candidates = candidates.len(), pool = pool.len(), "candidate pool ready");

        // Schedule and weekly plans
        let day_events = calendar.future_events();
        let contingent: HashSet<EventId> =
            optimizer.schedule.contingent_events.iter().copied().collect();
        let matrix = participation(&pool, &day_events, &fixtures, &bootstrap.teams, &contingent);

        let ledger = match &roster {
            Some(source) => SettledLedger::from_sheets(
                &calendar,
                Some(source.pre_horizon.as_slice()),
                &source.settled,
            ),
            None => SettledLedger::from_sheets(&calendar, None, &[]),
        };
        let weeks = plan_weeks(
            &calendar,
            &ledger,
            league.transfers_per_week,
            request.overrides.wildcard_event,
        )?;

        let mut initial_roster: Option<Vec<PlayerId>> =
            roster.as_ref().map(|_| owned.iter().copied().collect());
        if let Some(ids) = initial_roster.as_mut() {
            ids.sort_unstable();
        }

        let problem = RosterProblem {
            players: pool,
            participation: matrix,
            day_events,
            weeks,
            budget: budget.cap,
            initial_roster,
            overrides: request.overrides.clone(),
            rules: RosterRules::from(league),
        };
        let pool_size = problem.players.len();

        // Solve
        let strategies = request
            .strategies
            .unwrap_or(optimizer.enumeration.strategies);
        let backend = Arc::clone(&self.backend);
        let outcomes =
            tokio::task::spawn_blocking(move || enumerate(&problem, backend.as_ref(), strategies))
                .await
                .map_err(|e| RunError::SolverTask(e.to_string()))?;

        Ok(RunReport {
            team_id: request.team_id,
            start_gameweek: request.start_gameweek,
            horizon_weeks: request.horizon_weeks,
            calendar,
            budget,
            banked_points: ledger.banked_points(),
            pool_size,
            outcomes,
        })
    }

    fn budget(
        &self,
        request: &RunRequest,
        roster: Option<&RosterSource>,
        sale_values: &HashMap<PlayerId, u32>,
    ) -> BudgetBreakdown {
        let margin = request
            .safety_margin
            .unwrap_or(self.config.optimizer.budget.safety_margin);

        let (liquidation_value, bank) = match roster {
            Some(source) => (
                Some(sale_values.values().sum::<u32>()),
                Some(source.current.bank),
            ),
            None => (None, None),
        };

        let cap = if request.overrides.unlimited_budget {
            BudgetCap::Unlimited
        } else {
            match (liquidation_value, bank) {
                (Some(value), Some(bank)) => BudgetCap::Limited((value + bank).saturating_sub(margin)),
                _ => BudgetCap::Limited(self.config.league.scratch_budget),
            }
        };

        BudgetBreakdown {
            cap,
            liquidation_value,
            bank,
            safety_margin: margin,
        }
    }

    /// Load the pre-horizon roster and the sheets of settled days.
    async fn fetch_roster(
        &self,
        team_id: u32,
        calendar: &Calendar,
    ) -> Result<RosterSource, RunError> {
        let first = calendar.first_event().unwrap_or(1);
        let source_event = first.saturating_sub(1);
        let pre = match self.provider.team_picks(team_id, source_event).await? {
            Some(sheet) => sheet,
            None if source_event > 1 => {
                debug!(event = source_event, "no picks yet, trying the previous event");
                self.provider
                    .team_picks(team_id, source_event - 1)
                    .await?
                    .ok_or(RunError::NoRoster {
                        team_id,
                        event: source_event,
                    })?
            }
            None => {
                return Err(RunError::NoRoster {
                    team_id,
                    event: source_event,
                })
            }
        };
        self.check_complete(team_id, &pre)?;

        let mut settled = Vec::new();
        for day in calendar.settled_days() {
            match self.provider.team_picks(team_id, day.event_id).await? {
                Some(sheet) => {
                    self.check_complete(team_id, &sheet)?;
                    settled.push(sheet);
                }
                None => warn!(event = day.event_id, "no picks for settled day"),
            }
        }

        let current = settled.last().cloned().unwrap_or_else(|| pre.clone());
        info!(
            event = current.event_id,
            players = current.picks.len(),
            bank = current.bank,
            settled = settled.len(),
            "loaded roster"
        );
        Ok(RosterSource {
            pre_horizon: pre.player_ids(),
            settled,
            current,
        })
    }

    fn check_complete(&self, team_id: u32, sheet: &TeamSheet) -> Result<(), RunError> {
        let required = self.config.league.roster_size;
        if sheet.picks.len() < required {
            return Err(RunError::IncompleteRoster {
                team_id,
                found: sheet.picks.len(),
                required,
            });
        }
        Ok(())
    }

    /// Fetch candidate histories concurrently, dropping games at or after
    /// `cutoff`. A failed fetch becomes an empty history.
    async fn fetch_histories(
        &self,
        candidates: &[PlayerId],
        cutoff: Option<DateTime<Utc>>,
    ) -> HashMap<PlayerId, Vec<GameRecord>> {
        let concurrency = self.config.provider.fetch_concurrency.max(1);
        let provider = &self.provider;
        let mut fetches = stream::iter(candidates.iter().copied())
            .map(|id| async move { (id, provider.player_history(id).await) })
            .buffer_unordered(concurrency);

        let mut histories = HashMap::with_capacity(candidates.len());
        let mut failures = 0usize;
        while let Some((id, result)) = fetches.next().await {
            let mut games = match result {
                Ok(games) => games,
                Err(e) => {
                    warn!(player = id, "history fetch failed: {e}");
                    failures += 1;
                    Vec::new()
                }
            };
            if let Some(cutoff) = cutoff {
                games.retain(|g| g.kickoff < cutoff);
            }
            histories.insert(id, games);
        }
        info!(players = histories.len(), failures, "fetched histories");
        histories
    }
}
