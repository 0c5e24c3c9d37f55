//! Derived per-interval connection metrics

use serde::{Deserialize, Serialize};

/// Metrics derived from two consecutive raw samples
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    /// Timestamp of the newer sample, in milliseconds on the transport's clock
    pub timestamp_millis: u64,
    /// Outgoing bitrate over the window, bits per second
    pub bitrate_sent_bps: f64,
    /// Incoming bitrate over the window, bits per second
    pub bitrate_received_bps: f64,
    /// Share of packets lost over the window (0.0 to 1.0)
    pub packet_loss_ratio: f64,
    /// Jitter in milliseconds, if known
    pub jitter_millis: Option<f64>,
    /// Round-trip time of the newer sample, if known
    pub round_trip_time_millis: Option<f64>,
    /// Length of the window the rates were computed over
    pub window_seconds: f64,
}

impl StatsReport {
    /// Rate the connection from loss and round-trip time
    pub fn quality_rating(&self) -> QualityRating {
        let loss_percentage = self.packet_loss_ratio * 100.0;
        let rtt = self.round_trip_time_millis.unwrap_or(0.0);

        match (loss_percentage, rtt) {
            (l, r) if l < 1.0 && r < 100.0 => QualityRating::Excellent,
            (l, r) if l < 3.0 && r < 200.0 => QualityRating::Good,
            (l, r) if l < 5.0 && r < 300.0 => QualityRating::Fair,
            (l, r) if l < 10.0 && r < 500.0 => QualityRating::Poor,
            _ => QualityRating::VeryPoor,
        }
    }
}

/// Quality rating enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityRating {
    /// Excellent connection quality
    Excellent,
    /// Good connection quality
    Good,
    /// Fair connection quality
    Fair,
    /// Poor connection quality
    Poor,
    /// Very poor connection quality
    VeryPoor,
}
