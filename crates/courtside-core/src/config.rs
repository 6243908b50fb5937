// Configuration loading and parsing (league.toml, optimizer.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub optimizer: OptimizerConfig,
    pub provider: ProviderConfig,
    pub run_log_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

/// Game rules the roster model is built against. Money is in integer tenths.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub roster_size: usize,
    pub max_per_team: usize,
    pub transfers_per_week: u32,
    /// Budget used when building a roster from scratch (no existing team).
    pub scratch_budget: u32,
    pub positions: PositionQuotas,
    pub lineup: LineupRules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionQuotas {
    pub back_court: usize,
    pub front_court: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineupRules {
    pub max_starters: usize,
    pub max_starters_per_position: usize,
}

// ---------------------------------------------------------------------------
// optimizer.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire optimizer.toml file.
#[derive(Debug, Clone, Deserialize)]
struct OptimizerFile {
    valuation: ValuationConfig,
    budget: BudgetConfig,
    pool: PoolConfig,
    enumeration: EnumerationConfig,
    #[serde(default)]
    schedule: ScheduleConfig,
    provider: ProviderConfig,
    run_log: RunLogSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    pub recent_games: usize,
    pub injury_window: usize,
    pub chance_threshold: u8,
    #[serde(default)]
    pub threshold_inclusive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    pub safety_margin: u32,
    pub unlimited_cap: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub candidate_pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumerationConfig {
    pub strategies: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub contingent_events: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub bootstrap_ttl_secs: u64,
    pub fixtures_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub fetch_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct RunLogSection {
    path: String,
}

/// The public optimizer config assembled from the optimizer.toml sections.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub valuation: ValuationConfig,
    pub budget: BudgetConfig,
    pub pool: PoolConfig,
    pub enumeration: EnumerationConfig,
    pub schedule: ScheduleConfig,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/optimizer.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let optimizer_path = config_dir.join("optimizer.toml");
    let optimizer_text = read_file(&optimizer_path)?;
    let optimizer_file: OptimizerFile =
        toml::from_str(&optimizer_text).map_err(|e| ConfigError::ParseError {
            path: optimizer_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        optimizer: OptimizerConfig {
            valuation: optimizer_file.valuation,
            budget: optimizer_file.budget,
            pool: optimizer_file.pool,
            enumeration: optimizer_file.enumeration,
            schedule: optimizer_file.schedule,
        },
        provider: optimizer_file.provider,
        run_log_path: optimizer_file.run_log.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the workspace root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    copied.sort();
    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.roster_size == 0 {
        return Err(invalid("league.roster_size", "must be greater than 0"));
    }
    let quota_sum = league.positions.back_court + league.positions.front_court;
    if quota_sum != league.roster_size {
        return Err(invalid(
            "league.positions",
            format!(
                "back_court + front_court must equal roster_size ({}), got {quota_sum}",
                league.roster_size
            ),
        ));
    }
    if league.max_per_team == 0 {
        return Err(invalid("league.max_per_team", "must be greater than 0"));
    }
    if league.lineup.max_starters == 0 {
        return Err(invalid("league.lineup.max_starters", "must be greater than 0"));
    }
    if league.lineup.max_starters_per_position == 0 {
        return Err(invalid(
            "league.lineup.max_starters_per_position",
            "must be greater than 0",
        ));
    }

    let opt = &config.optimizer;
    if opt.valuation.recent_games == 0 {
        return Err(invalid("valuation.recent_games", "must be greater than 0"));
    }
    if opt.valuation.chance_threshold > 100 {
        return Err(invalid(
            "valuation.chance_threshold",
            format!("must be a percentage (0-100), got {}", opt.valuation.chance_threshold),
        ));
    }
    if opt.enumeration.strategies == 0 || opt.enumeration.strategies > 10 {
        return Err(invalid(
            "enumeration.strategies",
            format!("must be between 1 and 10, got {}", opt.enumeration.strategies),
        ));
    }
    if opt.pool.candidate_pool_size == 0 {
        return Err(invalid("pool.candidate_pool_size", "must be > 0"));
    }

    if config.provider.base_url.trim().is_empty() {
        return Err(invalid("provider.base_url", "must not be empty"));
    }
    if config.provider.fetch_concurrency == 0 {
        return Err(invalid("provider.fetch_concurrency", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
