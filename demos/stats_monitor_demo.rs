//! Stats Monitor Demo
//!
//! Connects to an in-process simulated transport and prints connection
//! quality reports as they arrive, then stops collection and closes.

use async_trait::async_trait;
use rtcstats::{
    ConnectOptions, ConnectionStatus, Connector, Event, GlobalConfig, RawSample, RawStatsSource,
    RtcStats, StatsError, Topic,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Simulated transport: ~1.2 Mbps up, ~600 kbps down, with some loss
struct SimulatedTransport {
    started: Instant,
    fetches: AtomicU64,
}

#[async_trait]
impl RawStatsSource for SimulatedTransport {
    async fn fetch_raw_stats(&self) -> Result<RawSample, StatsError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let elapsed = self.started.elapsed();
        let seconds = elapsed.as_secs_f64();
        Ok(RawSample {
            timestamp_millis: elapsed.as_millis() as u64,
            bytes_sent: (seconds * 150_000.0) as u64,
            bytes_received: (seconds * 75_000.0) as u64,
            packets_sent: (seconds * 120.0) as u64,
            packets_received: (seconds * 60.0) as u64,
            packets_lost: n * 2,
            round_trip_time_millis: Some(60.0 + (n % 5) as f64 * 20.0),
            jitter_millis: None,
        })
    }
}

struct SimulatedConnector;

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn RawStatsSource>, StatsError> {
        println!("  Negotiating stream '{}'...", options.stream_name);
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Arc::new(SimulatedTransport {
            started: Instant::now(),
            fetches: AtomicU64::new(0),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rtc_stats = RtcStats::init_with(GlobalConfig {
        debug_logging: false,
        log_filter: Some("rtcstats=info,rtcstats_diagnostics=info".to_string()),
    })?;

    println!("📊 RTC Stats Monitor Demo");
    println!("=========================");

    let connection = rtc_stats
        .connection(Arc::new(SimulatedConnector))
        .default_stats_interval(1)
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    connection.on(Topic::StatusChange, |event| {
        if let Event::StatusChange { status } = event {
            println!("🔌 Status: {}", status);
        }
    });

    connection.on(Topic::StatsError, |event| {
        if let Event::StatsError { error } = event {
            println!("⚠️  {}", error);
        }
    });

    // Stats before connecting are silently ignored.
    connection.get_stats(None)?;
    println!("Collecting before connect: {}", connection.is_collecting_stats());

    connection.connect(ConnectOptions::new("demo-stream")).await?;

    // Invalid intervals are rejected up front.
    if let Err(e) = connection.get_stats(Some("InvalidInterval".into())) {
        println!("❌ {}", e);
    }

    let mut reports = connection.events(Topic::Stats);
    connection.get_stats(Some(2i64.into()))?;
    println!("\n📈 Polling every 2s (first report after the baseline sample)");

    for _ in 0..4 {
        let Some(event) = reports.next().await else {
            break;
        };
        if let Some(report) = event.report() {
            println!(
                "  {:>6.0} kbps up | {:>6.0} kbps down | loss {:>5.2}% | rtt {:>5.1} ms | jitter {:>5.1} ms | {:?}",
                report.bitrate_sent_bps / 1000.0,
                report.bitrate_received_bps / 1000.0,
                report.packet_loss_ratio * 100.0,
                report.round_trip_time_millis.unwrap_or_default(),
                report.jitter_millis.unwrap_or_default(),
                report.quality_rating(),
            );
        }
    }

    connection.stop_stats();
    println!("\n⏹️  Stats stopped, collecting: {}", connection.is_collecting_stats());

    connection.handle_transport_status(ConnectionStatus::Disconnected);
    connection.close();

    println!("\n✨ Stats monitor demo completed!");
    Ok(())
}
