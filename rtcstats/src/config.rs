//! Configuration types and defaults

use crate::StatsError;
use rtcstats_diagnostics::engine::{DEFAULT_INTERVAL_SECS, MAX_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Explicit `tracing` filter directive, overriding `debug_logging`
    pub log_filter: Option<String>,
}

impl GlobalConfig {
    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, StatsError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            StatsError::InvalidConfiguration {
                field: "global".to_string(),
                reason: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values
    pub fn validate(&self) -> Result<(), StatsError> {
        if let Some(filter) = &self.log_filter {
            if filter.trim().is_empty() {
                return Err(StatsError::InvalidConfiguration {
                    field: "log_filter".to_string(),
                    reason: "filter directive must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Per-connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Polling period used by `get_stats` when no interval is given
    pub default_stats_interval_secs: u64,
    /// Upper bound on transport establishment
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_stats_interval_secs: DEFAULT_INTERVAL_SECS,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ConnectionConfig {
    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, StatsError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            StatsError::InvalidConfiguration {
                field: "connection".to_string(),
                reason: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.default_stats_interval_secs == 0
            || self.default_stats_interval_secs > MAX_INTERVAL_SECS
        {
            return Err(StatsError::InvalidConfiguration {
                field: "default_stats_interval_secs".to_string(),
                reason: format!(
                    "must be between 1 and {} seconds, got {}",
                    MAX_INTERVAL_SECS, self.default_stats_interval_secs
                ),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(StatsError::InvalidConfiguration {
                field: "connect_timeout_ms".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
