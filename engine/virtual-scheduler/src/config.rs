//! Configuration for VirtualScheduler

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::time::Localizer;
use crate::{DEFAULT_LOG_LEVEL, DEFAULT_UTC_OFFSET_SECONDS};

/// Configuration for the VirtualScheduler
///
/// Fixed for the scheduler's lifetime once it has been constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Offset of the platform's local time east of UTC, in seconds
    pub utc_offset_seconds: i32,

    /// Local wall-clock time the simulation starts at (default: 2000-01-01 00:00)
    pub start_time: NaiveDateTime,

    /// Default filter for test tracing output
    pub log_level: String,
}

/// Jan 1st, 2000 at midnight
pub fn default_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN).and_time(NaiveTime::MIN)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_seconds: DEFAULT_UTC_OFFSET_SECONDS,
            start_time: default_start_time(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Config with the given local offset and default start time
    pub fn with_offset(utc_offset_seconds: i32) -> Self {
        Self { utc_offset_seconds, ..Default::default() }
    }

    /// Check the offset is usable
    pub fn validate(&self) -> Result<()> {
        self.localizer().map(|_| ())
    }

    /// Localizer for the configured offset
    pub fn localizer(&self) -> Result<Localizer> {
        Localizer::new(self.utc_offset_seconds)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: SchedulerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig =
            toml::from_str(content).map_err(|e| SchedulerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
