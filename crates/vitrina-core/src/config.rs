use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::sync::SyncStrategy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
/// Zureo credentials are optional here: their absence is reported by
/// [`AppConfig::zureo_credentials`] when a sync is attempted, so the server can
/// still start and serve the catalog.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.is_empty()) };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("VITRINA_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_value(
        "VITRINA_BIND_ADDR",
        &or_default("VITRINA_BIND_ADDR", "0.0.0.0:3000"),
    )?;
    let log_level = or_default("VITRINA_LOG_LEVEL", "info");
    let category_synonyms_path = PathBuf::from(or_default(
        "VITRINA_CATEGORY_SYNONYMS_PATH",
        "./config/category_synonyms.yaml",
    ));

    let db_max_connections: u32 = parse_value(
        "VITRINA_DB_MAX_CONNECTIONS",
        &or_default("VITRINA_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_value(
        "VITRINA_DB_MIN_CONNECTIONS",
        &or_default("VITRINA_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_value(
        "VITRINA_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("VITRINA_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }

    let zureo_base_url = or_default("ZUREO_BASE_URL", "https://api.zureo.com");
    let zureo_username = optional("ZUREO_USERNAME");
    let zureo_password = optional("ZUREO_PASSWORD");
    let zureo_domain = optional("ZUREO_DOMAIN");
    let zureo_company_id = optional("ZUREO_COMPANY_ID");

    let zureo_request_timeout_secs: u64 = parse_value(
        "VITRINA_ZUREO_REQUEST_TIMEOUT_SECS",
        &or_default("VITRINA_ZUREO_REQUEST_TIMEOUT_SECS", "60"),
    )?;
    let zureo_page_size: u32 = parse_value(
        "VITRINA_ZUREO_PAGE_SIZE",
        &or_default("VITRINA_ZUREO_PAGE_SIZE", "1000"),
    )?;
    if zureo_page_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_ZUREO_PAGE_SIZE".to_string(),
            reason: "page size must be greater than zero".to_string(),
        });
    }
    let zureo_page_delay_ms: u64 = parse_value(
        "VITRINA_ZUREO_PAGE_DELAY_MS",
        &or_default("VITRINA_ZUREO_PAGE_DELAY_MS", "3000"),
    )?;
    let zureo_slow_page_every: u32 = parse_value(
        "VITRINA_ZUREO_SLOW_PAGE_EVERY",
        &or_default("VITRINA_ZUREO_SLOW_PAGE_EVERY", "5"),
    )?;
    let zureo_slow_page_delay_ms: u64 = parse_value(
        "VITRINA_ZUREO_SLOW_PAGE_DELAY_MS",
        &or_default("VITRINA_ZUREO_SLOW_PAGE_DELAY_MS", "10000"),
    )?;
    let zureo_rate_limit_cooldown_secs: u64 = parse_value(
        "VITRINA_ZUREO_RATE_LIMIT_COOLDOWN_SECS",
        &or_default("VITRINA_ZUREO_RATE_LIMIT_COOLDOWN_SECS", "45"),
    )?;
    let zureo_max_rate_limit_retries: u32 = parse_value(
        "VITRINA_ZUREO_MAX_RATE_LIMIT_RETRIES",
        &or_default("VITRINA_ZUREO_MAX_RATE_LIMIT_RETRIES", "5"),
    )?;

    let sync_strategy: SyncStrategy = parse_value(
        "VITRINA_SYNC_STRATEGY",
        &or_default("VITRINA_SYNC_STRATEGY", "upsert"),
    )?;
    let sync_batch_size: usize = parse_value(
        "VITRINA_SYNC_BATCH_SIZE",
        &or_default("VITRINA_SYNC_BATCH_SIZE", "100"),
    )?;
    if sync_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_SYNC_BATCH_SIZE".to_string(),
            reason: "batch size must be greater than zero".to_string(),
        });
    }
    let sync_freshness_hours: u32 = parse_value(
        "VITRINA_SYNC_FRESHNESS_HOURS",
        &or_default("VITRINA_SYNC_FRESHNESS_HOURS", "24"),
    )?;
    let sync_lease_secs: u64 = parse_value(
        "VITRINA_SYNC_LEASE_SECS",
        &or_default("VITRINA_SYNC_LEASE_SECS", "900"),
    )?;
    let sync_schedule = or_default("VITRINA_SYNC_SCHEDULE", "0 0 4 * * *");
    let placeholder_image_url =
        or_default("VITRINA_PLACEHOLDER_IMAGE_URL", "/placeholder.svg");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        category_synonyms_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        zureo_base_url,
        zureo_username,
        zureo_password,
        zureo_domain,
        zureo_company_id,
        zureo_request_timeout_secs,
        zureo_page_size,
        zureo_page_delay_ms,
        zureo_slow_page_every,
        zureo_slow_page_delay_ms,
        zureo_rate_limit_cooldown_secs,
        zureo_max_rate_limit_retries,
        sync_strategy,
        sync_batch_size,
        sync_freshness_hours,
        sync_lease_secs,
        sync_schedule,
        placeholder_image_url,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
