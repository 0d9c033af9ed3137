//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use database::Database;

/// REST server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Connections kept in the pool.
    pub pool_size: u32,
    /// How many tutors the suggestion endpoint returns.
    pub suggested_tutor_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `LEARNUS_ADDR` | Server bind address | `127.0.0.1:3000` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:learnus.db?mode=rwc` |
    /// | `DB_POOL_SIZE` | Pool connections | `20` |
    /// | `SUGGESTED_TUTOR_LIMIT` | Suggested tutors returned | `10` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("LEARNUS_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:learnus.db?mode=rwc".to_string());

        let pool_size = match env::var("DB_POOL_SIZE") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidNumber("DB_POOL_SIZE", raw)),
            },
            Err(_) => Database::DEFAULT_POOL_SIZE,
        };

        let suggested_tutor_limit = match env::var("SUGGESTED_TUTOR_LIMIT") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidNumber("SUGGESTED_TUTOR_LIMIT", raw)),
            },
            Err(_) => DEFAULT_SUGGESTED_TUTOR_LIMIT,
        };

        Ok(Self {
            addr,
            database_url,
            pool_size,
            suggested_tutor_limit,
        })
    }
}

/// Suggested tutors returned when `SUGGESTED_TUTOR_LIMIT` is unset.
pub const DEFAULT_SUGGESTED_TUTOR_LIMIT: usize = 10;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid LEARNUS_ADDR format")]
    InvalidAddr,

    #[error("{0} must be a positive integer, got {1:?}")]
    InvalidNumber(&'static str, String),
}
