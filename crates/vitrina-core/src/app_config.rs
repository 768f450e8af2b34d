use std::net::SocketAddr;
use std::path::PathBuf;

use crate::sync::SyncStrategy;
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
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub category_synonyms_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub zureo_base_url: String,
    pub zureo_username: Option<String>,
    pub zureo_password: Option<String>,
    pub zureo_domain: Option<String>,
    pub zureo_company_id: Option<String>,
    pub zureo_request_timeout_secs: u64,
    pub zureo_page_size: u32,
    pub zureo_page_delay_ms: u64,
    /// Every N-th page waits `zureo_slow_page_delay_ms` instead of the short delay.
    pub zureo_slow_page_every: u32,
    pub zureo_slow_page_delay_ms: u64,
    pub zureo_rate_limit_cooldown_secs: u64,
    pub zureo_max_rate_limit_retries: u32,
    pub sync_strategy: SyncStrategy,
    pub sync_batch_size: usize,
    pub sync_freshness_hours: u32,
    pub sync_lease_secs: u64,
    pub sync_schedule: String,
    pub placeholder_image_url: String,
}

impl AppConfig {
    /// Collects the Zureo login credentials.
    ///
    /// All four values are required; the first missing one is reported so the
    /// sync can fail before any request leaves the process.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the absent variable.
    pub fn zureo_credentials(&self) -> Result<ZureoCredentials, ConfigError> {
        let require = |value: &Option<String>, var: &str| -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
        };

        Ok(ZureoCredentials {
            username: require(&self.zureo_username, "ZUREO_USERNAME")?,
            password: require(&self.zureo_password, "ZUREO_PASSWORD")?,
            domain: require(&self.zureo_domain, "ZUREO_DOMAIN")?,
            company_id: require(&self.zureo_company_id, "ZUREO_COMPANY_ID")?,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("category_synonyms_path", &self.category_synonyms_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("zureo_base_url", &self.zureo_base_url)
            .field("zureo_username", &self.zureo_username)
            .field(
                "zureo_password",
                &self.zureo_password.as_ref().map(|_| "[redacted]"),
            )
            .field("zureo_domain", &self.zureo_domain)
            .field("zureo_company_id", &self.zureo_company_id)
            .field(
                "zureo_request_timeout_secs",
                &self.zureo_request_timeout_secs,
            )
            .field("zureo_page_size", &self.zureo_page_size)
            .field("zureo_page_delay_ms", &self.zureo_page_delay_ms)
            .field("zureo_slow_page_every", &self.zureo_slow_page_every)
            .field("zureo_slow_page_delay_ms", &self.zureo_slow_page_delay_ms)
            .field(
                "zureo_rate_limit_cooldown_secs",
                &self.zureo_rate_limit_cooldown_secs,
            )
            .field(
                "zureo_max_rate_limit_retries",
                &self.zureo_max_rate_limit_retries,
            )
            .field("sync_strategy", &self.sync_strategy)
            .field("sync_batch_size", &self.sync_batch_size)
            .field("sync_freshness_hours", &self.sync_freshness_hours)
            .field("sync_lease_secs", &self.sync_lease_secs)
            .field("sync_schedule", &self.sync_schedule)
            .field("placeholder_image_url", &self.placeholder_image_url)
            .finish()
    }
}

/// Login material for the Zureo SDK.
#[derive(Clone, PartialEq, Eq)]
pub struct ZureoCredentials {
    pub username: String,
    pub password: String,
    pub domain: String,
    /// Sent as the `emp` query parameter on product endpoints.
    pub company_id: String,
}

impl std::fmt::Debug for ZureoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZureoCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("domain", &self.domain)
            .field("company_id", &self.company_id)
            .finish()
    }
}
