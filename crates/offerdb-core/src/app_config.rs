use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only needed by commands that touch the database.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub stores_path: PathBuf,
    /// Listing root; a store's page lives at `{base_url}/{url_slug}`.
    pub base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub render_settle_delay_ms: u64,
    pub browser_headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub max_concurrent_stores: usize,
    pub categorizer_api_key: Option<String>,
    pub categorizer_timeout_secs: u64,
    pub categorizer_batch_size: usize,
    pub scrape_cron: String,
}

impl AppConfig {
    /// Returns the Postgres connection string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` is unset.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("stores_path", &self.stores_path)
            .field("base_url", &self.base_url)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("render_settle_delay_ms", &self.render_settle_delay_ms)
            .field("browser_headless", &self.browser_headless)
            .field("chrome_path", &self.chrome_path)
            .field("max_concurrent_stores", &self.max_concurrent_stores)
            .field(
                "categorizer_api_key",
                &self.categorizer_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("categorizer_timeout_secs", &self.categorizer_timeout_secs)
            .field("categorizer_batch_size", &self.categorizer_batch_size)
            .field("scrape_cron", &self.scrape_cron)
            .finish()
    }
}
