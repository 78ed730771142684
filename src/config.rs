//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the in-memory cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Interval in seconds between durable store sweeps
    pub cleanup_interval: u64,
    /// Durable store connection parameters
    pub database: DatabaseConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1024)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `POSTGRES_*` - see [`DatabaseConfig::from_env`]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_env("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            database: DatabaseConfig::from_env(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl: 300,
            server_port: 8080,
            cleanup_interval: 300,
            database: DatabaseConfig::default(),
        }
    }
}

// == Database Config ==
/// Connection parameters for the PostgreSQL durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    /// Empty means no password is sent
    pub password: String,
}

impl DatabaseConfig {
    /// Loads connection parameters from the environment.
    ///
    /// # Environment Variables
    /// - `POSTGRES_HOST` (default: localhost)
    /// - `POSTGRES_PORT` (default: 5432)
    /// - `POSTGRES_DB` (default: cache_db)
    /// - `POSTGRES_USER` (default: the OS user running the process)
    /// - `POSTGRES_PASSWORD` (default: empty)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("POSTGRES_HOST").unwrap_or(defaults.host),
            port: parse_env("POSTGRES_PORT").unwrap_or(defaults.port),
            name: env::var("POSTGRES_DB").unwrap_or(defaults.name),
            user: env::var("POSTGRES_USER").unwrap_or(defaults.user),
            password: env::var("POSTGRES_PASSWORD").unwrap_or(defaults.password),
        }
    }

    /// Builds sqlx connect options from these parameters.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "cache_db".to_string(),
            user: system_username(),
            password: String::new(),
        }
    }
}

/// Resolves the OS identity of the current process, falling back to `postgres`.
fn system_username() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "postgres".to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
