//! Application configuration loaded from environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{HasherConfig, MAX_TOKEN_TTL};

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. `0.0.0.0:3000`).
    pub server_addr: SocketAddr,
    /// PostgreSQL connection URL. Identities are kept in memory when unset.
    pub database_url: Option<String>,
    /// Redis connection URL. Tokens are kept in memory when unset.
    pub redis_url: Option<String>,
    /// How long an issued token stays valid.
    pub token_ttl: Duration,
    /// Upper bound on every directory and token-store call.
    pub store_timeout: Duration,
    /// Argon2 work factor for new credentials.
    pub hasher: HasherConfig,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let redis_url = lookup("REDIS_URL").filter(|v| !v.trim().is_empty());

        let token_ttl = Duration::from_secs(parse_or(&lookup, "TOKEN_TTL_SECS", 24 * 60 * 60)?);
        let store_timeout = Duration::from_millis(parse_or(&lookup, "STORE_TIMEOUT_MS", 2_000)?);
        if token_ttl.is_zero() || token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigLoadError::Invalid("TOKEN_TTL_SECS"));
        }
        if store_timeout.is_zero() {
            return Err(ConfigLoadError::Invalid("STORE_TIMEOUT_MS"));
        }

        let defaults = HasherConfig::default();
        let hasher = HasherConfig {
            memory_kib: parse_or(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            server_addr,
            database_url,
            redis_url,
            token_ttl,
            store_timeout,
            hasher,
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigLoadError::Invalid(key)),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,

    #[error("Invalid {0}")]
    Invalid(&'static str),
}
