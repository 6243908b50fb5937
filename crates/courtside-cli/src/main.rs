// Courtside entry point.
//
// Startup sequence:
// 1. Parse command-line arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Open the run log
// 5. Pick a data provider (HTTP or snapshot file)
// 6. Run the pipeline and print the report

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use courtside_app::{Pipeline, RunRequest, RunSink, SCRATCH_TEAM};
use courtside_core::config;
use courtside_core::run_log::RunLog;
use courtside_engine::calendar::Cursor;
use courtside_engine::pool::Overrides;
use courtside_engine::DefaultBackend;
use courtside_provider::{DataProvider, HttpProvider, SnapshotProvider};

#[derive(Parser, Debug)]
#[command(name = "courtside")]
#[command(version)]
#[command(about = "Plans daily fantasy basketball lineups and transfers over a multi-week horizon")]
struct Args {
    /// Team id to optimize; 0 builds a squad from scratch
    #[arg(short, long, default_value_t = SCRATCH_TEAM)]
    team_id: u32,

    /// First gameweek of the horizon
    #[arg(short, long)]
    gameweek: u32,

    /// Number of consecutive gameweeks to plan
    #[arg(long, default_value_t = 1)]
    horizon: u32,

    /// Treat every event before this one as settled instead of using the clock
    #[arg(long)]
    simulate_event: Option<u32>,

    /// Owned player to sell on the first open day (repeatable)
    #[arg(long = "force-drop")]
    force_drop: Vec<u32>,

    /// Player to buy on the first open day (repeatable)
    #[arg(long = "force-buy")]
    force_buy: Vec<u32>,

    /// Owned player to hold for the whole horizon (repeatable)
    #[arg(long = "force-keep")]
    force_keep: Vec<u32>,

    /// Player never to consider (repeatable)
    #[arg(long)]
    exclude: Vec<u32>,

    /// Player to treat as available regardless of injury signals (repeatable)
    #[arg(long = "force-available")]
    force_available: Vec<u32>,

    /// Event id on which transfers are unlimited
    #[arg(long)]
    wildcard_event: Option<u32>,

    /// Skip the budget check
    #[arg(long)]
    unlimited_budget: bool,

    /// Budget safety margin in tenths (overrides optimizer.toml)
    #[arg(long)]
    safety_margin: Option<u32>,

    /// Number of distinct strategies to produce (overrides optimizer.toml)
    #[arg(long)]
    strategies: Option<usize>,

    /// Read provider data from a JSON snapshot instead of the network
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn request(&self) -> RunRequest {
        RunRequest {
            team_id: self.team_id,
            start_gameweek: self.gameweek,
            horizon_weeks: self.horizon,
            overrides: Overrides {
                force_drop: self.force_drop.clone(),
                force_buy: self.force_buy.clone(),
                force_keep: self.force_keep.clone(),
                exclude: self.exclude.clone(),
                force_available: self.force_available.clone(),
                wildcard_event: self.wildcard_event,
                unlimited_budget: self.unlimited_budget,
            },
            cursor: match self.simulate_event {
                Some(event) => Cursor::Simulated(event),
                None => Cursor::Live(Utc::now()),
            },
            safety_margin: self.safety_margin,
            strategies: self.strategies,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let args = Args::parse();

    // 2. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Courtside starting up");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, roster of {}, {} transfers per week",
        config.league.name, config.league.roster_size, config.league.transfers_per_week
    );
    let unlimited_cap = config.optimizer.budget.unlimited_cap;

    // 4. Open the run log
    let log_path = RunLog::resolve_path(&config.run_log_path);
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let run_log = RunLog::open(&log_path.to_string_lossy()).context("failed to open run log")?;
    info!("Run log opened at {}", log_path.display());

    // 5. Pick a data provider
    let provider: Arc<dyn DataProvider> = match &args.snapshot {
        Some(path) => {
            info!("Reading provider data from snapshot {}", path.display());
            Arc::new(SnapshotProvider::from_file(path).context("failed to load snapshot")?)
        }
        None => Arc::new(
            HttpProvider::new(&config.provider).context("failed to build HTTP client")?,
        ),
    };

    // 6. Run and print
    let sink: Arc<dyn RunSink> = Arc::new(run_log);
    let pipeline = Pipeline::new(config, provider, Arc::new(DefaultBackend), sink);
    let report = pipeline.run(&args.request()).await?;

    if report.best().is_none() {
        warn!("no feasible strategy found");
    }
    let output = if args.json {
        render::render_json(&report)?
    } else {
        render::render_text(&report, unlimited_cap)
    };
    println!("{output}");

    info!("Courtside finished");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal carries the report).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "courtside=info,courtside_app=info,courtside_engine=info,courtside_provider=info,courtside_core=info,warn",
            )
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
