//! Bot configuration from environment variables

use crate::scheduler::{SchedulerConfig, DEFAULT_INTERVAL, DEFAULT_TOLERANCE, MAX_TOLERANCE};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} {limit}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        limit: &'static str,
    },
}

/// Runtime configuration for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub db_path: PathBuf,
    pub api_url: String,
    /// Long-poll timeout for `getUpdates`
    pub poll_timeout: Duration,
    pub scheduler: SchedulerConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("TASKLIST_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("TASKLIST_BOT_TOKEN"))?;

        let db_path = lookup("TASKLIST_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.tasklist-bot/tasklist.db"))
            },
            PathBuf::from,
        );

        let api_url = lookup("TASKLIST_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let secs = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
            }
        };

        let interval = secs("TASKLIST_REMINDER_INTERVAL_SECS", DEFAULT_INTERVAL)?;
        if interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "TASKLIST_REMINDER_INTERVAL_SECS",
                value: 0,
                limit: "must be at least 1",
            });
        }

        let tolerance = secs("TASKLIST_REMINDER_TOLERANCE_SECS", DEFAULT_TOLERANCE)?;
        if tolerance > MAX_TOLERANCE {
            return Err(ConfigError::OutOfRange {
                name: "TASKLIST_REMINDER_TOLERANCE_SECS",
                value: tolerance.as_secs(),
                limit: "must be below 43200",
            });
        }

        Ok(Self {
            token,
            db_path,
            api_url,
            poll_timeout: secs(
                "TASKLIST_POLL_TIMEOUT_SECS",
                Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            )?,
            scheduler: SchedulerConfig {
                interval,
                tolerance,
            },
        })
    }
}
