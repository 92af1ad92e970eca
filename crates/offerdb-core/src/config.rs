use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid. A missing `DATABASE_URL`
/// only surfaces when [`AppConfig::database_url`] is called.
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
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let env = parse_environment(&or_default("OFFERDB_ENV", "development"));

    let bind_addr: SocketAddr = parse_as(
        "OFFERDB_BIND_ADDR",
        &or_default("OFFERDB_BIND_ADDR", "0.0.0.0:8080"),
    )?;
    let log_level = or_default("OFFERDB_LOG_LEVEL", "info");
    let stores_path = PathBuf::from(or_default("OFFERDB_STORES_PATH", "./config/stores.yaml"));

    let base_url = or_default("OFFERDB_BASE_URL", "https://www.ica.se/erbjudanden")
        .trim_end_matches('/')
        .to_string();
    if base_url.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "OFFERDB_BASE_URL".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let db_max_connections: u32 = parse_as(
        "OFFERDB_DB_MAX_CONNECTIONS",
        &or_default("OFFERDB_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "OFFERDB_DB_MIN_CONNECTIONS",
        &or_default("OFFERDB_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "OFFERDB_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("OFFERDB_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let render_timeout_secs: u64 = parse_as(
        "OFFERDB_RENDER_TIMEOUT_SECS",
        &or_default("OFFERDB_RENDER_TIMEOUT_SECS", "45"),
    )?;
    if render_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "OFFERDB_RENDER_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let render_settle_delay_ms: u64 = parse_as(
        "OFFERDB_RENDER_SETTLE_DELAY_MS",
        &or_default("OFFERDB_RENDER_SETTLE_DELAY_MS", "2000"),
    )?;
    let browser_headless: bool = parse_as(
        "OFFERDB_BROWSER_HEADLESS",
        &or_default("OFFERDB_BROWSER_HEADLESS", "true"),
    )?;
    let chrome_path = lookup("OFFERDB_CHROME_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let max_concurrent_stores: usize = parse_as(
        "OFFERDB_MAX_CONCURRENT_STORES",
        &or_default("OFFERDB_MAX_CONCURRENT_STORES", "4"),
    )?;

    let categorizer_api_key = lookup("OFFERDB_CATEGORIZER_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let categorizer_timeout_secs: u64 = parse_as(
        "OFFERDB_CATEGORIZER_TIMEOUT_SECS",
        &or_default("OFFERDB_CATEGORIZER_TIMEOUT_SECS", "30"),
    )?;
    let categorizer_batch_size: usize = parse_as(
        "OFFERDB_CATEGORIZER_BATCH_SIZE",
        &or_default("OFFERDB_CATEGORIZER_BATCH_SIZE", "50"),
    )?;
    if categorizer_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "OFFERDB_CATEGORIZER_BATCH_SIZE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let scrape_cron = or_default("OFFERDB_SCRAPE_CRON", "0 0 6 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        stores_path,
        base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        render_timeout_secs,
        render_settle_delay_ms,
        browser_headless,
        chrome_path,
        max_concurrent_stores,
        categorizer_api_key,
        categorizer_timeout_secs,
        categorizer_batch_size,
        scrape_cron,
    })
}

/// Parse a raw env value, mapping failures to [`ConfigError::InvalidEnvVar`].
fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
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
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
