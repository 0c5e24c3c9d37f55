//! # RTC Stats Core
//!
//! Shared building blocks for RTC connection statistics: the transport
//! boundary a statistics engine samples, the derived report type, the error
//! taxonomy and the topic-based event feed reports are published on.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod report;
pub mod transport;

// Re-export main types
pub use error::StatsError;
pub use event::{Event, EventFeed, EventStream, SubscriptionId, Topic};
pub use report::{QualityRating, StatsReport};
pub use transport::{ConnectOptions, ConnectionStatus, Connector, RawSample, RawStatsSource};
