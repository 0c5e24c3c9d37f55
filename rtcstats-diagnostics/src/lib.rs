//! # RTC Stats Diagnostics
//!
//! Connection statistics for RTC transports.
//! Provides the periodic sampling engine, the counter-to-metric parser and
//! structured logging setup.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod engine;
pub mod parser;

// Re-export main types
pub use debug_logger::DebugLogger;
pub use engine::{IntervalArg, PollConfig, StatsEngine, StatsEngineMetrics};
pub use parser::{parse, parse_between};
