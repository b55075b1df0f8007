use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use carmarket_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = [
        entry("database.url", config.database.url.clone(), &["CARMARKET_DATABASE_URL"]),
        entry("database.max_connections", config.database.max_connections.to_string(), &["CARMARKET_DATABASE_MAX_CONNECTIONS"]),
        entry("database.timeout_secs", config.database.timeout_secs.to_string(), &["CARMARKET_DATABASE_TIMEOUT_SECS"]),
        entry("environment", config.environment.as_str().to_string(), &["CARMARKET_ENVIRONMENT", "CARMARKET_ENV"]),
        entry("lifecycle.published_age_days", config.lifecycle.published_age_days.to_string(), &["CARMARKET_LIFECYCLE_PUBLISHED_AGE_DAYS"]),
        entry("lifecycle.deletion_age_days", config.lifecycle.deletion_age_days.to_string(), &["CARMARKET_LIFECYCLE_DELETION_AGE_DAYS"]),
        entry("lifecycle.finalize_age_days", config.lifecycle.finalize_age_days.to_string(), &["CARMARKET_LIFECYCLE_FINALIZE_AGE_DAYS"]),
        entry("lifecycle.hot_deal_days", config.lifecycle.hot_deal_days.to_string(), &["CARMARKET_LIFECYCLE_HOT_DEAL_DAYS"]),
        entry("lifecycle.warning_lead_days", config.lifecycle.warning_lead_days.to_string(), &["CARMARKET_LIFECYCLE_WARNING_LEAD_DAYS"]),
        entry("matching.limit", config.matching.limit.to_string(), &["CARMARKET_MATCHING_LIMIT"]),
        entry("matching.price_band", config.matching.price_band.to_string(), &["CARMARKET_MATCHING_PRICE_BAND"]),
        entry("matching.year_window", config.matching.year_window.to_string(), &["CARMARKET_MATCHING_YEAR_WINDOW"]),
        entry("scheduler.enabled", config.scheduler.enabled.to_string(), &["CARMARKET_SCHEDULER_ENABLED"]),
        entry("scheduler.expire_cron", config.scheduler.expire_cron.clone(), &["CARMARKET_SCHEDULER_EXPIRE_CRON"]),
        entry("scheduler.purge_cron", config.scheduler.purge_cron.clone(), &["CARMARKET_SCHEDULER_PURGE_CRON"]),
        entry("scheduler.finalize_cron", config.scheduler.finalize_cron.clone(), &["CARMARKET_SCHEDULER_FINALIZE_CRON"]),
        entry("scheduler.hot_deal_expiry_cron", config.scheduler.hot_deal_expiry_cron.clone(), &["CARMARKET_SCHEDULER_HOT_DEAL_EXPIRY_CRON"]),
        entry("scheduler.pre_expiry_warning_cron", config.scheduler.pre_expiry_warning_cron.clone(), &["CARMARKET_SCHEDULER_PRE_EXPIRY_WARNING_CRON"]),
        entry("scheduler.pre_deletion_warning_cron", config.scheduler.pre_deletion_warning_cron.clone(), &["CARMARKET_SCHEDULER_PRE_DELETION_WARNING_CRON"]),
        entry("logging.level", config.logging.level.clone(), &["CARMARKET_LOGGING_LEVEL", "CARMARKET_LOG_LEVEL"]),
        entry("logging.format", format!("{:?}", config.logging.format).to_ascii_lowercase(), &["CARMARKET_LOGGING_FORMAT", "CARMARKET_LOG_FORMAT"]),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for Entry { key_path, value, env_keys } in entries {
        let source = field_source(
            key_path,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn entry(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    Entry { key_path, value, env_keys }
}

struct Entry {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("carmarket.toml"), PathBuf::from("config/carmarket.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
