use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub environment: Environment,
    pub lifecycle: LifecycleConfig,
    pub matching: MatchingConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Age limits driving the lifecycle sweeps, in days.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub published_age_days: u32,
    pub deletion_age_days: u32,
    pub finalize_age_days: u32,
    pub hot_deal_days: u32,
    pub warning_lead_days: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchingConfig {
    pub limit: u32,
    pub price_band: i64,
    pub year_window: i32,
}

/// Six-field cron expressions (seconds first) for each recurring sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub expire_cron: String,
    pub purge_cron: String,
    pub finalize_cron: String,
    pub hot_deal_expiry_cron: String,
    pub pre_expiry_warning_cron: String,
    pub pre_deletion_warning_cron: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Environments in which scheduled sweeps mutate data.
    pub fn is_production_like(&self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub environment: Option<Environment>,
    pub log_level: Option<String>,
    pub scheduler_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://carmarket.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            environment: Environment::Development,
            lifecycle: LifecycleConfig {
                published_age_days: 60,
                deletion_age_days: 30,
                finalize_age_days: 30,
                hot_deal_days: 7,
                warning_lead_days: 7,
            },
            matching: MatchingConfig { limit: 20, price_band: 50_000, year_window: 2 },
            scheduler: SchedulerConfig {
                enabled: true,
                expire_cron: "0 0 3 * * *".to_string(),
                purge_cron: "0 0 3 * * *".to_string(),
                finalize_cron: "0 0 3 * * *".to_string(),
                hot_deal_expiry_cron: "0 0 * * * *".to_string(),
                pre_expiry_warning_cron: "0 0 9 * * *".to_string(),
                pre_deletion_warning_cron: "0 0 9 * * *".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::Validation(format!(
                "unsupported environment `{other}` (expected development|test|staging|production)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("carmarket.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(environment) = patch.environment {
            self.environment = environment;
        }

        if let Some(lifecycle) = patch.lifecycle {
            if let Some(days) = lifecycle.published_age_days {
                self.lifecycle.published_age_days = days;
            }
            if let Some(days) = lifecycle.deletion_age_days {
                self.lifecycle.deletion_age_days = days;
            }
            if let Some(days) = lifecycle.finalize_age_days {
                self.lifecycle.finalize_age_days = days;
            }
            if let Some(days) = lifecycle.hot_deal_days {
                self.lifecycle.hot_deal_days = days;
            }
            if let Some(days) = lifecycle.warning_lead_days {
                self.lifecycle.warning_lead_days = days;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(limit) = matching.limit {
                self.matching.limit = limit;
            }
            if let Some(price_band) = matching.price_band {
                self.matching.price_band = price_band;
            }
            if let Some(year_window) = matching.year_window {
                self.matching.year_window = year_window;
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(enabled) = scheduler.enabled {
                self.scheduler.enabled = enabled;
            }
            if let Some(cron) = scheduler.expire_cron {
                self.scheduler.expire_cron = cron;
            }
            if let Some(cron) = scheduler.purge_cron {
                self.scheduler.purge_cron = cron;
            }
            if let Some(cron) = scheduler.finalize_cron {
                self.scheduler.finalize_cron = cron;
            }
            if let Some(cron) = scheduler.hot_deal_expiry_cron {
                self.scheduler.hot_deal_expiry_cron = cron;
            }
            if let Some(cron) = scheduler.pre_expiry_warning_cron {
                self.scheduler.pre_expiry_warning_cron = cron;
            }
            if let Some(cron) = scheduler.pre_deletion_warning_cron {
                self.scheduler.pre_deletion_warning_cron = cron;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARMARKET_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CARMARKET_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CARMARKET_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CARMARKET_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let environment = read_env("CARMARKET_ENVIRONMENT").or_else(|| read_env("CARMARKET_ENV"));
        if let Some(value) = environment {
            self.environment = value.parse()?;
        }

        if let Some(value) = read_env("CARMARKET_LIFECYCLE_PUBLISHED_AGE_DAYS") {
            self.lifecycle.published_age_days =
                parse_u32("CARMARKET_LIFECYCLE_PUBLISHED_AGE_DAYS", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_LIFECYCLE_DELETION_AGE_DAYS") {
            self.lifecycle.deletion_age_days =
                parse_u32("CARMARKET_LIFECYCLE_DELETION_AGE_DAYS", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_LIFECYCLE_FINALIZE_AGE_DAYS") {
            self.lifecycle.finalize_age_days =
                parse_u32("CARMARKET_LIFECYCLE_FINALIZE_AGE_DAYS", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_LIFECYCLE_HOT_DEAL_DAYS") {
            self.lifecycle.hot_deal_days = parse_u32("CARMARKET_LIFECYCLE_HOT_DEAL_DAYS", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_LIFECYCLE_WARNING_LEAD_DAYS") {
            self.lifecycle.warning_lead_days =
                parse_u32("CARMARKET_LIFECYCLE_WARNING_LEAD_DAYS", &value)?;
        }

        if let Some(value) = read_env("CARMARKET_MATCHING_LIMIT") {
            self.matching.limit = parse_u32("CARMARKET_MATCHING_LIMIT", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_MATCHING_PRICE_BAND") {
            self.matching.price_band = parse_i64("CARMARKET_MATCHING_PRICE_BAND", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_MATCHING_YEAR_WINDOW") {
            self.matching.year_window = parse_i32("CARMARKET_MATCHING_YEAR_WINDOW", &value)?;
        }

        if let Some(value) = read_env("CARMARKET_SCHEDULER_ENABLED") {
            self.scheduler.enabled = parse_bool("CARMARKET_SCHEDULER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_EXPIRE_CRON") {
            self.scheduler.expire_cron = value;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_PURGE_CRON") {
            self.scheduler.purge_cron = value;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_FINALIZE_CRON") {
            self.scheduler.finalize_cron = value;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_HOT_DEAL_EXPIRY_CRON") {
            self.scheduler.hot_deal_expiry_cron = value;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_PRE_EXPIRY_WARNING_CRON") {
            self.scheduler.pre_expiry_warning_cron = value;
        }
        if let Some(value) = read_env("CARMARKET_SCHEDULER_PRE_DELETION_WARNING_CRON") {
            self.scheduler.pre_deletion_warning_cron = value;
        }

        let log_level =
            read_env("CARMARKET_LOGGING_LEVEL").or_else(|| read_env("CARMARKET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARMARKET_LOGGING_FORMAT").or_else(|| read_env("CARMARKET_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(environment) = overrides.environment {
            self.environment = environment;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.scheduler_enabled {
            self.scheduler.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_lifecycle(&self.lifecycle)?;
        validate_matching(&self.matching)?;
        validate_scheduler(&self.scheduler)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("carmarket.toml"), PathBuf::from("config/carmarket.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_lifecycle(lifecycle: &LifecycleConfig) -> Result<(), ConfigError> {
    let windows = [
        ("lifecycle.published_age_days", lifecycle.published_age_days),
        ("lifecycle.deletion_age_days", lifecycle.deletion_age_days),
        ("lifecycle.finalize_age_days", lifecycle.finalize_age_days),
        ("lifecycle.hot_deal_days", lifecycle.hot_deal_days),
    ];
    if let Some((key, _)) = windows.iter().find(|(_, days)| *days == 0) {
        return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
    }

    let lead = lifecycle.warning_lead_days;
    if lead >= lifecycle.published_age_days || lead >= lifecycle.deletion_age_days {
        return Err(ConfigError::Validation(
            "lifecycle.warning_lead_days must be shorter than the published and deletion ages"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    if matching.limit == 0 || matching.limit > 100 {
        return Err(ConfigError::Validation("matching.limit must be in range 1..=100".to_string()));
    }

    if matching.price_band < 0 {
        return Err(ConfigError::Validation(
            "matching.price_band must not be negative".to_string(),
        ));
    }

    if !(0..=10).contains(&matching.year_window) {
        return Err(ConfigError::Validation(
            "matching.year_window must be in range 0..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
    let expressions = [
        ("scheduler.expire_cron", &scheduler.expire_cron),
        ("scheduler.purge_cron", &scheduler.purge_cron),
        ("scheduler.finalize_cron", &scheduler.finalize_cron),
        ("scheduler.hot_deal_expiry_cron", &scheduler.hot_deal_expiry_cron),
        ("scheduler.pre_expiry_warning_cron", &scheduler.pre_expiry_warning_cron),
        ("scheduler.pre_deletion_warning_cron", &scheduler.pre_deletion_warning_cron),
    ];

    for (key, expression) in expressions {
        let fields = expression.split_whitespace().count();
        if !(6..=7).contains(&fields) {
            return Err(ConfigError::Validation(format!(
                "{key} must be a cron expression with seconds (6 or 7 fields), got `{expression}`"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    environment: Option<Environment>,
    lifecycle: Option<LifecyclePatch>,
    matching: Option<MatchingPatch>,
    scheduler: Option<SchedulerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LifecyclePatch {
    published_age_days: Option<u32>,
    deletion_age_days: Option<u32>,
    finalize_age_days: Option<u32>,
    hot_deal_days: Option<u32>,
    warning_lead_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    limit: Option<u32>,
    price_band: Option<i64>,
    year_window: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    enabled: Option<bool>,
    expire_cron: Option<String>,
    purge_cron: Option<String>,
    finalize_cron: Option<String>,
    hot_deal_expiry_cron: Option<String>,
    pre_expiry_warning_cron: Option<String>,
    pre_deletion_warning_cron: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
