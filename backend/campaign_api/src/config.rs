//! Application configuration loaded from environment variables.

use std::time::Duration;

use funding_engine::RetryPolicy;

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Commit attempts per contribution or edit before reporting contention
    pub max_commit_attempts: u32,
    /// Backoff after the first version conflict, doubled per retry
    pub retry_backoff_ms: u64,
    /// Upper bound on a single retry backoff
    pub retry_max_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults for
    /// anything missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_commit_attempts: u32 = parse_or(&lookup, "CONTRIBUTION_MAX_ATTEMPTS", 8)?;
        if max_commit_attempts == 0 {
            return Err(ApiError::Config(
                "CONTRIBUTION_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./campaigns.db".to_string()),
            api_port: parse_or(&lookup, "API_PORT", 3001)?,
            max_commit_attempts,
            retry_backoff_ms: parse_or(&lookup, "CONTRIBUTION_BACKOFF_MS", 5)?,
            retry_max_backoff_ms: parse_or(&lookup, "CONTRIBUTION_MAX_BACKOFF_MS", 200)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_commit_attempts,
            base_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ApiError::Config(format!("Invalid {key}: {raw:?}"))),
    }
}
