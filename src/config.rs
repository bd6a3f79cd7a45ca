//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use tokio_postgres::config::Host;

/// Connection retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(2),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub retry: RetryConfig,
    /// Create the policies table when it does not exist yet
    pub ensure_schema: bool,
}

impl DatabaseConfig {
    /// Whether the connection string asks for TLS
    pub fn use_tls(&self) -> bool {
        self.url.contains("sslmode=require") || self.url.contains("neon.tech")
    }

    /// Connection string with the password masked, safe for logging.
    ///
    /// Both the URL and the `key=value` forms render as a URL.
    pub fn display_url(&self) -> String {
        let config = match self.url.parse::<tokio_postgres::Config>() {
            Ok(config) => config,
            Err(_) => return "postgres://****".to_string(),
        };

        let host = match config.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            #[cfg(unix)]
            Some(Host::Unix(path)) => path.display().to_string(),
            None => String::new(),
        };

        format!(
            "postgres://{}:****@{}:{}/{}",
            config.get_user().unwrap_or(""),
            host,
            config.get_ports().first().copied().unwrap_or(5432),
            config.get_dbname().unwrap_or("")
        )
    }
}

/// Policy source configuration
#[derive(Debug, Clone)]
pub struct PolicySourceConfig {
    pub root: PathBuf,
    pub extension: String,
}

impl Default for PolicySourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./policies"),
            extension: "rego".to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub policies: PolicySourceConfig,
    pub json_logs: bool,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// `.env` is merged into the environment by `main` before this runs.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        Self::validate_database_url(&url)?;

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            max_attempts: parse_or(&lookup, "DB_CONNECT_MAX_RETRIES", defaults.max_attempts)?,
            delay: Duration::from_secs(parse_or(
                &lookup,
                "DB_CONNECT_RETRY_DELAY_SECS",
                defaults.delay.as_secs(),
            )?),
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "DB_CONNECT_MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        let source_defaults = PolicySourceConfig::default();
        let policies = PolicySourceConfig {
            root: lookup("POLICY_DIR")
                .map(PathBuf::from)
                .unwrap_or(source_defaults.root),
            extension: lookup("POLICY_EXTENSION")
                .map(|e| e.trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .unwrap_or(source_defaults.extension),
        };

        Ok(Self {
            database: DatabaseConfig {
                url,
                retry,
                ensure_schema: parse_or(&lookup, "POLICY_LOADER_ENSURE_SCHEMA", false)?,
            },
            policies,
            json_logs: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Accepts `postgres://` URLs and libpq `key=value` strings.
    fn validate_database_url(url: &str) -> Result<(), ConfigError> {
        if url.contains("://") {
            let parsed = url::Url::parse(url).map_err(|_| {
                ConfigError::InvalidValue(
                    "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
                )
            })?;

            if !matches!(parsed.scheme(), "postgres" | "postgresql") {
                return Err(ConfigError::InvalidValue(format!(
                    "Unsupported DATABASE_URL scheme '{}'. Use postgres://",
                    parsed.scheme()
                )));
            }
        }

        url.parse::<tokio_postgres::Config>()
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid DATABASE_URL: {}", e)))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, raw))),
        None => Ok(default),
    }
}
