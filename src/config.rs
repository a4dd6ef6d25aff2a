use crate::config_validator::ConfigValidator;
use crate::error::{GuardError, Result};
use envconfig::Envconfig;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Deployment environment, selected by `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigValidator::check_environment(s)?;
        Ok(match s.to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            "test" => Environment::Test,
            _ => Environment::Development,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Deployment environment
    #[envconfig(from = "APP_ENV", default = "development")]
    pub environment: Environment,

    /// Redis connection URL; the in-memory store is used when unset
    #[envconfig(from = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Force rate limiting on or off; defaults to on in production only
    #[envconfig(from = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Distinct clients held by the in-memory store
    #[envconfig(from = "MAX_TRACKED_CLIENTS", default = "500")]
    pub max_tracked_clients: usize,

    /// Expired window sweep interval in seconds
    #[envconfig(from = "CLEANUP_INTERVAL", default = "300")]
    pub cleanup_interval_secs: u64,

    /// Optional JSON route policy file
    #[envconfig(from = "ROUTE_POLICY_FILE")]
    pub route_policy_file: Option<String>,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            environment: Environment::Development,
            redis_url: None,
            rate_limit_enabled: None,
            max_tracked_clients: crate::store::DEFAULT_MAX_TRACKED_CLIENTS,
            cleanup_interval_secs: 300,
            route_policy_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config::init_from_env()
            .map_err(|e| GuardError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::check_bind_addr(&self.bind_addr)?;
        if let Some(url) = &self.redis_url {
            ConfigValidator::check_redis_url(url)?;
        }
        ConfigValidator::check_tracked_clients(self.max_tracked_clients)?;
        ConfigValidator::check_cleanup_interval(self.cleanup_interval_secs)?;
        Ok(())
    }

    /// Rate limiting runs in production unless explicitly overridden.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_enabled
            .unwrap_or_else(|| self.environment.is_production())
    }
}
