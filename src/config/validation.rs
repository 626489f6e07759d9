//! Configuration validation rules.
//!
//! Checks run after figment has merged every layer, so a bad environment
//! override is reported the same way as a bad file value.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::AppConfig;
use crate::data::SourceError;

/// Longest HTTP timeout accepted, in seconds
const MAX_TIMEOUT_SECS: u64 = 300;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("Missing required configuration key: {field} ({hint})")]
    Missing { field: String, hint: String },

    #[error("Unsupported raid name: {name}. Supported raids are: {supported}")]
    UnsupportedRaid { name: String, supported: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `spreadsheet_url` or `raid_name` is missing
    /// - `raid_name` is not a supported raid
    /// - `spreadsheet_url` is not a Google Sheets URL with a spreadsheet id
    /// - `timeout_secs` is 0 or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source()?;
        self.raid()?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".into(),
                reason: format!("must not exceed 5 minutes ({MAX_TIMEOUT_SECS}s)"),
            });
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "user_agent".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.cache_lifetime_secs == 0 {
            tracing::warn!("cache_lifetime_secs is 0; every run will download the sheet");
        }

        if self.heading.is_some() && self.rules.is_empty() {
            tracing::warn!("heading is set without any [[rules]]; it will be ignored");
        }

        Ok(())
    }
}
