//! # RTC Stats - Connection Quality Telemetry
//!
//! RTC Stats tracks the lifecycle of a real-time audio/video transport and,
//! while it is connected, periodically samples the transport's cumulative
//! counters and publishes per-interval metrics: bitrate, packet loss, jitter
//! and round-trip time.
//!
//! ## Key Features
//!
//! - **Non-blocking sampling**: one fetch in flight at a time, missed ticks skipped
//! - **Strict start/stop semantics**: idempotent start, nothing delivered after stop
//! - **Typed events**: `stats`, `statusChange` and `statsError` topics
//! - **Pluggable transport**: implement [`Connector`] and [`RawStatsSource`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtcstats::{ConnectOptions, Connector, RtcStats, Topic};
//! use std::sync::Arc;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> Result<(), rtcstats::StatsError> {
//! let rtc_stats = RtcStats::init()?;
//! let connection = rtc_stats.connection(connector).build()?;
//!
//! connection.on(Topic::Stats, |event| {
//!     if let Some(report) = event.report() {
//!         println!("{:.0} bps sent", report.bitrate_sent_bps);
//!     }
//! });
//!
//! connection.connect(ConnectOptions::new("my-stream")).await?;
//! connection.get_stats(Some(4i64.into()))?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use rtcstats_core::{
    ConnectOptions, ConnectionStatus, Connector, Event, EventFeed, EventStream, QualityRating,
    RawSample, RawStatsSource, StatsError, StatsReport, SubscriptionId, Topic,
};

pub use rtcstats_diagnostics::{
    DebugLogger, IntervalArg, PollConfig, StatsEngine, StatsEngineMetrics,
};

// Public API modules
pub mod config;
pub mod connection;

// Re-export main API types
pub use config::{ConnectionConfig, GlobalConfig};
pub use connection::{ConnectionBuilder, ConnectionController};

use std::sync::Arc;
use tracing::debug;

/// Main entry point for RTC Stats
#[derive(Debug, Clone)]
pub struct RtcStats {
    inner: Arc<RtcStatsInner>,
}

#[derive(Debug)]
struct RtcStatsInner {
    config: GlobalConfig,
}

impl RtcStats {
    /// Initialize RTC Stats with default settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use rtcstats::RtcStats;
    ///
    /// let rtc_stats = RtcStats::init()?;
    /// # Ok::<(), rtcstats::StatsError>(())
    /// ```
    pub fn init() -> Result<Self, StatsError> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    ///
    /// Installs the logging subscriber. A subscriber installed earlier by the
    /// application is left in place.
    pub fn init_with(config: GlobalConfig) -> Result<Self, StatsError> {
        config.validate()?;

        let mut logger = DebugLogger::new().debug_logging(config.debug_logging);
        if let Some(filter) = &config.log_filter {
            logger = logger.filter(filter.clone());
        }
        match logger.init() {
            Ok(()) => {}
            Err(StatsError::Initialization { reason }) => {
                debug!("Keeping existing log subscriber: {}", reason);
            }
            Err(error) => return Err(error),
        }

        Ok(Self {
            inner: Arc::new(RtcStatsInner { config }),
        })
    }

    /// Global configuration in effect
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Create a connection builder that establishes transports via `connector`
    ///
    /// # Example
    /// ```rust,no_run
    /// use rtcstats::{Connector, RtcStats};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # fn example(connector: Arc<dyn Connector>) -> Result<(), rtcstats::StatsError> {
    /// let connection = RtcStats::init()?
    ///     .connection(connector)
    ///     .default_stats_interval(2)
    ///     .connect_timeout(Duration::from_secs(5))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connection(&self, connector: Arc<dyn Connector>) -> ConnectionBuilder {
        ConnectionBuilder::new(connector)
    }
}
