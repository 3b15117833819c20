//! Typed configuration from environment variables.
//!
//! Loaded once at startup. Malformed values fail fast instead of silently
//! falling back to defaults.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::db::{DEFAULT_BUSY_TIMEOUT, DEFAULT_READ_POOL_SIZE};

pub const DATABASE_PATH_VAR: &str = "CLINIC_QUEUE_DB";
pub const BUSY_TIMEOUT_VAR: &str = "CLINIC_QUEUE_BUSY_TIMEOUT_MS";
pub const READ_POOL_SIZE_VAR: &str = "CLINIC_QUEUE_READ_POOL_SIZE";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
    /// Read-only connections kept for display polls
    pub read_pool_size: u32,
    pub log_level: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("clinic_queue.db"),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DATABASE_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(BUSY_TIMEOUT_VAR) {
            let millis: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: BUSY_TIMEOUT_VAR,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(READ_POOL_SIZE_VAR) {
            config.read_pool_size = match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: READ_POOL_SIZE_VAR,
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: READ_POOL_SIZE_VAR,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
                }
            };
        }

        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Override the database path (e.g. from a CLI flag).
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}
