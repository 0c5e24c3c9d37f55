//! Structured logging setup

use rtcstats_core::StatsError;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide `tracing` subscriber
#[derive(Debug, Clone, Default)]
pub struct DebugLogger {
    debug_logging: bool,
    filter: Option<String>,
}

impl DebugLogger {
    /// Create a logger at `info` level
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `debug` level unless a filter says otherwise
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Use an explicit filter directive such as `rtcstats=trace`
    pub fn filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    /// Filter directive in effect when `RUST_LOG` is unset
    pub fn directive(&self) -> String {
        match (&self.filter, self.debug_logging) {
            (Some(filter), _) => filter.clone(),
            (None, true) => "debug".to_string(),
            (None, false) => "info".to_string(),
        }
    }

    /// Install the subscriber; `RUST_LOG` takes precedence over the
    /// configured directive
    pub fn init(&self) -> Result<(), StatsError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.directive()).map_err(|e| {
                StatsError::InvalidConfiguration {
                    field: "log_filter".to_string(),
                    reason: e.to_string(),
                }
            })?,
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| StatsError::Initialization {
                reason: format!("Failed to install log subscriber: {}", e),
            })
    }

    /// Initialize logging with default settings
    pub fn init_logging() -> Result<(), StatsError> {
        Self::new().init()
    }
}
