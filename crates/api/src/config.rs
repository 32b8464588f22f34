//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use store::TransactionStatus;
use thiserror::Error;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// A variable was set but could not be parsed.
#[derive(Debug, Error)]
#[error("invalid value for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub reason: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `HTTP_TIMEOUT_SECS`: per-request timeout (default: `4`)
/// - `TRANSACTION_STATUS`: status recorded for new orders (default: `pending`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub request_timeout: Duration,
    pub transaction_status: TransactionStatus,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    ///
    /// Unset and empty variables take their defaults; set but malformed
    /// ones are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(var("PORT"), "PORT")?.unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse(var("LOG_FORMAT"), "LOG_FORMAT")?.unwrap_or(defaults.log_format),
            database_url: var("DATABASE_URL"),
            database_max_connections: parse(
                var("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
            )?
            .unwrap_or(defaults.database_max_connections),
            request_timeout: parse::<u64>(var("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            transaction_status: parse(var("TRANSACTION_STATUS"), "TRANSACTION_STATUS")?
                .unwrap_or(defaults.transaction_status),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(value: Option<String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse().map_err(|e: T::Err| ConfigError {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            request_timeout: Duration::from_secs(4),
            transaction_status: TransactionStatus::Pending,
        }
    }
}
