//! Application configuration management.

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Remote accounting API configuration.
    pub accounting: AccountingConfig,
    /// Invoicing behaviour.
    #[serde(default)]
    pub invoicing: InvoicingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token required on invoicing routes. Unset disables the check.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Remote accounting back office configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountingConfig {
    /// Base URL of the practice-management API.
    pub base_url: String,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Refresh the bearer token this many seconds before it expires.
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,
    /// Maximum entries kept in the account / period-code lookup cache.
    #[serde(default = "default_lookup_cache_capacity")]
    pub lookup_cache_capacity: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_margin_secs() -> u64 {
    60
}

fn default_lookup_cache_capacity() -> u64 {
    10_000
}

/// Invoicing behaviour: scheduling and the codes stamped on remote records.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// Seconds between scheduled retry passes. Zero disables the scheduler.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Failed invoices are retried while their retry count is below this.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    /// Codes stamped on every remote record.
    #[serde(default)]
    pub profile: AccountingProfile,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: default_retry_interval_secs(),
            max_retries: default_max_retries(),
            profile: AccountingProfile::default(),
        }
    }
}

fn default_retry_interval_secs() -> u64 {
    900 // 15 minutes
}

fn default_max_retries() -> i32 {
    3
}

/// Default accounting metadata for monthly praticas and their line records.
///
/// A snapshot is stored on each local monthly pratica row when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountingProfile {
    /// Agency owning the praticas.
    pub agency_code: String,
    /// Operator recorded as the author.
    pub operator_code: String,
    /// Customer the monthly pratica is issued to.
    pub customer_code: String,
    /// Supplier recorded on each service line.
    pub supplier_code: String,
    /// Service type code for tour activities.
    pub service_type_code: String,
    /// Payment type code used for payment movements.
    pub payment_type_code: String,
    /// Currency used when a booking carries none.
    pub default_currency: String,
}

impl Default for AccountingProfile {
    fn default() -> Self {
        Self {
            agency_code: "AG01".to_string(),
            operator_code: "SYNC".to_string(),
            customer_code: "WEB".to_string(),
            supplier_code: "TOURS".to_string(),
            service_type_code: "ESC".to_string(),
            payment_type_code: "CC".to_string(),
            default_currency: "EUR".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PRATICA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
