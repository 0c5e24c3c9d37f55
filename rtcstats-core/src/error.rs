//! Error types for RTC connection statistics

use std::time::Duration;
use thiserror::Error;

/// Main error type for statistics and connection operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// A polling interval that is not a finite positive integer
    #[error("Invalid interval value {value}")]
    InvalidInterval {
        /// The offending value, as supplied by the caller
        value: String,
    },

    /// Fetching a raw statistics report from the transport failed
    #[error("Failed to fetch raw statistics: {reason}")]
    FetchFailure {
        /// Reason reported by the transport
        reason: String,
    },

    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Configuration value rejected during validation
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Connection error
    #[error("Connection failed: {reason}")]
    Connection {
        /// Reason for connection failure
        reason: String,
        /// Suggested retry delay
        retry_in: Option<Duration>,
        /// Suggested action to resolve the issue
        suggested_action: String,
    },

    /// Operation timed out error
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: Duration,
    },

    /// Invalid operation error
    #[error("Invalid operation: {operation}")]
    InvalidOperation {
        /// Operation that was invalid
        operation: String,
    },
}

impl StatsError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            StatsError::InvalidInterval { .. } => "INVALID_INTERVAL".to_string(),
            StatsError::FetchFailure { .. } => "FETCH_FAILURE".to_string(),
            StatsError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            StatsError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            StatsError::Connection { .. } => "CONNECTION_FAILED".to_string(),
            StatsError::Timeout { .. } => "TIMEOUT".to_string(),
            StatsError::InvalidOperation { .. } => "INVALID_OPERATION".to_string(),
        }
    }

    /// Whether the failure is confined to a single operation and may be retried
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StatsError::FetchFailure { .. }
                | StatsError::Timeout { .. }
                | StatsError::Connection { .. }
        )
    }
}
