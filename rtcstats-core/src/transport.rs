//! Transport boundary: raw counter snapshots, lifecycle status and the
//! collaborators that establish a peer transport

use crate::error::StatsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a peer transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection attempt has been made yet
    #[default]
    New,
    /// Transport establishment is in progress
    Connecting,
    /// Transport is established and media can flow
    Connected,
    /// Transport was established but has been lost
    Disconnected,
    /// Transport establishment or the transport itself failed
    Failed,
    /// Transport was shut down
    Closed,
}

impl ConnectionStatus {
    /// Name used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::New => "new",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Failed => "failed",
            ConnectionStatus::Closed => "closed",
        }
    }

    /// Check if the transport can currently carry media
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Check if no further transitions are expected without a new `connect`
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Failed | ConnectionStatus::Closed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a transport's cumulative counters
///
/// Counters are monotonically non-decreasing for the life of one transport
/// and reset only when the transport restarts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    /// When the snapshot was taken, in milliseconds on the transport's clock
    pub timestamp_millis: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Packets sent
    pub packets_sent: u64,
    /// Packets received
    pub packets_received: u64,
    /// Packets lost
    pub packets_lost: u64,
    /// Most recent round-trip time sample
    pub round_trip_time_millis: Option<f64>,
    /// Interarrival jitter, when the transport measures it
    pub jitter_millis: Option<f64>,
}

/// Source of raw statistics snapshots, normally the peer transport itself
#[async_trait]
pub trait RawStatsSource: Send + Sync {
    /// Fetch a snapshot of the transport's cumulative counters
    async fn fetch_raw_stats(&self) -> Result<RawSample, StatsError>;
}

/// Options passed through to the collaborators that establish a transport
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Name of the stream to publish or view
    pub stream_name: String,
    /// Negotiate an audio track
    pub enable_audio: bool,
    /// Negotiate a video track
    pub enable_video: bool,
}

impl ConnectOptions {
    /// Options for the given stream with audio and video enabled
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            enable_audio: true,
            enable_video: true,
        }
    }
}

/// Establishes a peer transport (signaling, negotiation, candidate gathering)
///
/// The returned handle is owned by the caller; consumers that only sample it
/// should hold a `Weak` reference.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a transport for the given options
    async fn connect(&self, options: &ConnectOptions)
        -> Result<Arc<dyn RawStatsSource>, StatsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_names() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::New);
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert!(ConnectionStatus::Closed.is_terminal());
        assert!(ConnectionStatus::Failed.is_terminal());
        assert!(!ConnectionStatus::Disconnected.is_terminal());
        assert!(ConnectionStatus::Connected.is_connected());
    }

    #[test]
    fn test_connection_status_serialization() {
        let serialized = serde_json::to_string(&ConnectionStatus::Disconnected).unwrap();
        assert_eq!(serialized, "\"disconnected\"");
        let status: ConnectionStatus = serde_json::from_str("\"connecting\"").unwrap();
        assert_eq!(status, ConnectionStatus::Connecting);
    }

    #[test]
    fn test_raw_sample_uses_camel_case() {
        let sample = RawSample {
            timestamp_millis: 1000,
            bytes_sent: 10,
            round_trip_time_millis: Some(12.5),
            ..Default::default()
        };
        let value = serde_json::to_value(sample).unwrap();
        assert_eq!(value["timestampMillis"], 1000);
        assert_eq!(value["roundTripTimeMillis"], 12.5);
        assert!(value["jitterMillis"].is_null());
    }
}
