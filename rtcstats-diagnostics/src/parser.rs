//! Conversion of cumulative counter snapshots into per-interval metrics

use rtcstats_core::{RawSample, StatsReport};

/// Derive a report from two consecutive samples over `elapsed_seconds`
///
/// Counter deltas saturate at zero, so a transport restart yields zero rates
/// rather than negative ones. `elapsed_seconds` must be positive.
pub fn parse(current: &RawSample, previous: &RawSample, elapsed_seconds: f64) -> StatsReport {
    let bytes_sent = current.bytes_sent.saturating_sub(previous.bytes_sent);
    let bytes_received = current.bytes_received.saturating_sub(previous.bytes_received);
    let packets_sent = current.packets_sent.saturating_sub(previous.packets_sent);
    let packets_lost = current.packets_lost.saturating_sub(previous.packets_lost);

    StatsReport {
        timestamp_millis: current.timestamp_millis,
        bitrate_sent_bps: bitrate(bytes_sent, elapsed_seconds),
        bitrate_received_bps: bitrate(bytes_received, elapsed_seconds),
        packet_loss_ratio: packets_lost as f64 / (packets_sent + packets_lost).max(1) as f64,
        jitter_millis: jitter(current, previous),
        round_trip_time_millis: current.round_trip_time_millis,
        window_seconds: elapsed_seconds,
    }
}

/// Derive a report using the samples' own timestamps as the window
///
/// Returns `None` when `current` is not newer than `previous`.
pub fn parse_between(current: &RawSample, previous: &RawSample) -> Option<StatsReport> {
    let elapsed_seconds = elapsed_seconds(current, previous)?;
    Some(parse(current, previous, elapsed_seconds))
}

/// Seconds between two samples, `None` unless `current` is strictly newer
pub fn elapsed_seconds(current: &RawSample, previous: &RawSample) -> Option<f64> {
    if current.timestamp_millis <= previous.timestamp_millis {
        return None;
    }
    Some((current.timestamp_millis - previous.timestamp_millis) as f64 / 1000.0)
}

fn bitrate(bytes: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 {
        return 0.0;
    }
    8.0 * bytes as f64 / elapsed_seconds
}

// Transport-measured jitter wins; otherwise fall back to RTT variation.
fn jitter(current: &RawSample, previous: &RawSample) -> Option<f64> {
    current.jitter_millis.or_else(|| {
        match (current.round_trip_time_millis, previous.round_trip_time_millis) {
            (Some(now), Some(before)) => Some((now - before).abs()),
            _ => None,
        }
    })
}
