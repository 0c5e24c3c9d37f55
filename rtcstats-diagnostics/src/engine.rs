//! Periodic sampling of a transport's raw statistics
//!
//! A [`StatsEngine`] owns one polling task. Each timer tick dispatches at
//! most one fetch against the transport; the first successful fetch after
//! arming only establishes a baseline, every later one is diffed against the
//! previous sample and published as [`Event::Stats`].

use crate::parser;
use futures::future::BoxFuture;
use parking_lot::{Mutex, ReentrantMutex};
use rtcstats_core::{Event, EventFeed, RawSample, RawStatsSource, StatsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Polling period used when the caller does not supply one
pub const DEFAULT_INTERVAL_SECS: u64 = 1;

/// Longest accepted polling period (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Polling interval as supplied by a caller, before validation
///
/// Intervals often come straight from application configuration, so any
/// JSON scalar deserializes into one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalArg {
    /// Whole number of seconds
    Integer(i64),
    /// Fractional number of seconds
    Float(f64),
    /// Free-form text
    Text(String),
}

impl IntervalArg {
    /// Whole, non-negative seconds this argument denotes, if any
    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            IntervalArg::Integer(value) => u64::try_from(*value).ok(),
            IntervalArg::Float(value)
                if value.is_finite()
                    && value.fract() == 0.0
                    && *value >= 0.0
                    && *value <= MAX_INTERVAL_SECS as f64 =>
            {
                Some(*value as u64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for IntervalArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalArg::Integer(value) => write!(f, "{}", value),
            IntervalArg::Float(value) => write!(f, "{}", value),
            IntervalArg::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for IntervalArg {
    fn from(value: i64) -> Self {
        IntervalArg::Integer(value)
    }
}

impl From<i32> for IntervalArg {
    fn from(value: i32) -> Self {
        IntervalArg::Integer(value.into())
    }
}

impl From<u32> for IntervalArg {
    fn from(value: u32) -> Self {
        IntervalArg::Integer(value.into())
    }
}

impl From<u64> for IntervalArg {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => IntervalArg::Integer(value),
            Err(_) => IntervalArg::Text(value.to_string()),
        }
    }
}

impl From<f64> for IntervalArg {
    fn from(value: f64) -> Self {
        IntervalArg::Float(value)
    }
}

impl From<&str> for IntervalArg {
    fn from(value: &str) -> Self {
        IntervalArg::Text(value.to_string())
    }
}

impl From<String> for IntervalArg {
    fn from(value: String) -> Self {
        IntervalArg::Text(value)
    }
}

/// Validated polling configuration, fixed for the lifetime of one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollConfig {
    interval_seconds: u64,
}

impl PollConfig {
    /// Create a configuration polling every `interval_seconds`
    pub fn new(interval_seconds: u64) -> Result<Self, StatsError> {
        if interval_seconds == 0 || interval_seconds > MAX_INTERVAL_SECS {
            return Err(StatsError::InvalidInterval {
                value: interval_seconds.to_string(),
            });
        }
        Ok(Self { interval_seconds })
    }

    /// Validate a caller-supplied interval; `None` selects the default
    pub fn from_arg(arg: Option<IntervalArg>) -> Result<Self, StatsError> {
        match arg {
            None => Ok(Self::default()),
            Some(arg) => arg
                .as_seconds()
                .and_then(|seconds| Self::new(seconds).ok())
                .ok_or_else(|| StatsError::InvalidInterval {
                    value: arg.to_string(),
                }),
        }
    }

    /// Polling period in whole seconds
    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    /// Polling period
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl TryFrom<IntervalArg> for PollConfig {
    type Error = StatsError;

    fn try_from(arg: IntervalArg) -> Result<Self, Self::Error> {
        Self::from_arg(Some(arg))
    }
}

/// Counters describing what a polling task has done so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsEngineMetrics {
    /// Timer ticks observed
    pub ticks: u64,
    /// Ticks skipped because a fetch was still in flight
    pub skipped_ticks: u64,
    /// Samples stored as a new baseline without emitting a report
    pub baselines: u64,
    /// Reports published
    pub reports_emitted: u64,
    /// Fetches that failed
    pub fetch_failures: u64,
}

#[derive(Debug, Default)]
struct EngineState {
    active: bool,
    generation: u64,
    last_sample: Option<RawSample>,
    metrics: StatsEngineMetrics,
}

impl EngineState {
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}

/// State shared between an engine handle and its polling task
///
/// `gate` serializes publication against `stop`. It is reentrant so a
/// subscriber may stop the engine from inside its own handler.
#[derive(Debug, Default)]
struct EngineShared {
    gate: ReentrantMutex<()>,
    state: Mutex<EngineState>,
}

impl EngineShared {
    fn record_tick(&self, skipped: bool) {
        let mut state = self.state.lock();
        state.metrics.ticks += 1;
        if skipped {
            state.metrics.skipped_ticks += 1;
        }
    }

    fn deactivate(&self, generation: u64) {
        let _gate = self.gate.lock();
        let mut state = self.state.lock();
        if state.is_current(generation) {
            state.active = false;
            state.last_sample = None;
        }
    }

    fn complete_fetch(
        &self,
        feed: &EventFeed,
        generation: u64,
        result: Result<RawSample, StatsError>,
    ) {
        let _gate = self.gate.lock();

        let event = {
            let mut state = self.state.lock();
            if !state.is_current(generation) {
                debug!("Discarding sample fetched by a stopped stats engine");
                return;
            }

            match result {
                Err(error) => {
                    state.metrics.fetch_failures += 1;
                    let error = match error {
                        StatsError::FetchFailure { .. } => error,
                        other => StatsError::FetchFailure {
                            reason: other.to_string(),
                        },
                    };
                    warn!("Stats fetch failed, retrying next tick: {}", error);
                    Event::StatsError { error }
                }
                Ok(sample) => {
                    let Some(previous) = state.last_sample.replace(sample) else {
                        state.metrics.baselines += 1;
                        debug!("Stored baseline sample at {}ms", sample.timestamp_millis);
                        return;
                    };

                    match parser::elapsed_seconds(&sample, &previous) {
                        Some(elapsed) => {
                            state.metrics.reports_emitted += 1;
                            Event::Stats {
                                report: parser::parse(&sample, &previous, elapsed),
                            }
                        }
                        None => {
                            state.metrics.baselines += 1;
                            debug!(
                                "Sample at {}ms does not advance past {}ms, re-baselining",
                                sample.timestamp_millis, previous.timestamp_millis
                            );
                            return;
                        }
                    }
                }
            }
        };

        // State lock released; the gate stays held until dispatch finishes.
        feed.emit(&event);
    }
}

type PendingFetch = BoxFuture<'static, Result<RawSample, StatsError>>;

/// Periodic sampler for one transport
pub struct StatsEngine {
    source: Weak<dyn RawStatsSource>,
    feed: Arc<EventFeed>,
    shared: Arc<EngineShared>,
    poll_config: Option<PollConfig>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for StatsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsEngine")
            .field("poll_config", &self.poll_config)
            .field("active", &self.is_active())
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl StatsEngine {
    /// Create an inert engine sampling `source` and publishing on `feed`
    pub fn new(source: Weak<dyn RawStatsSource>, feed: Arc<EventFeed>) -> Self {
        Self {
            source,
            feed,
            shared: Arc::new(EngineShared::default()),
            poll_config: None,
            task: None,
        }
    }

    /// Validate `interval` and start polling
    ///
    /// Fails with [`StatsError::InvalidInterval`] without touching any state
    /// when the interval is not a positive whole number of seconds. Starting
    /// an engine that is already active is a no-op.
    pub fn start(&mut self, interval: Option<IntervalArg>) -> Result<(), StatsError> {
        if self.is_active() {
            debug!("Stats engine already active, ignoring start");
            return Ok(());
        }
        let config = PollConfig::from_arg(interval)?;
        self.start_with(config)
    }

    /// Start polling with an already validated configuration
    pub fn start_with(&mut self, config: PollConfig) -> Result<(), StatsError> {
        if self.is_active() {
            debug!("Stats engine already active, ignoring start");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| StatsError::Initialization {
            reason: format!("Stats polling requires a Tokio runtime: {}", e),
        })?;

        let generation = {
            let _gate = self.shared.gate.lock();
            let mut state = self.shared.state.lock();
            state.active = true;
            state.generation += 1;
            state.last_sample = None;
            state.generation
        };

        // First tick is one full period after arming, not after first poll.
        let first_tick = Instant::now() + config.interval();
        let task = runtime.spawn(poll_loop(
            self.shared.clone(),
            self.source.clone(),
            self.feed.clone(),
            config,
            generation,
            first_tick,
        ));

        self.task = Some(task);
        self.poll_config = Some(config);
        info!(
            "Started stats polling every {}s",
            config.interval_seconds()
        );
        Ok(())
    }

    /// Stop polling and forget the baseline sample
    ///
    /// Idempotent. Once this returns no further report is published, even
    /// for a fetch that was already in flight.
    pub fn stop(&mut self) {
        let _gate = self.shared.gate.lock();

        let was_active = {
            let mut state = self.shared.state.lock();
            let was_active = state.active;
            state.active = false;
            state.generation += 1;
            state.last_sample = None;
            was_active
        };

        if let Some(task) = self.task.take() {
            task.abort();
        }

        if was_active {
            info!("Stopped stats polling");
        }
    }

    /// Check if the engine is polling
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }

    /// Configuration of the current or most recent run
    pub fn poll_config(&self) -> Option<PollConfig> {
        self.poll_config
    }

    /// Snapshot of the polling counters
    pub fn metrics(&self) -> StatsEngineMetrics {
        self.shared.state.lock().metrics
    }

    /// Whether a baseline sample is currently held
    pub fn has_baseline(&self) -> bool {
        self.shared.state.lock().last_sample.is_some()
    }
}

impl Drop for StatsEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    shared: Arc<EngineShared>,
    source: Weak<dyn RawStatsSource>,
    feed: Arc<EventFeed>,
    config: PollConfig,
    generation: u64,
    first_tick: Instant,
) {
    // Covers every exit path, including a source that panics mid-fetch.
    let _deactivate = DeactivateOnExit {
        shared: shared.clone(),
        generation,
    };

    let mut ticker = interval_at(first_tick, config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<PendingFetch> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if in_flight.is_some() {
                    shared.record_tick(true);
                    debug!("Previous stats fetch still in flight, skipping tick");
                    continue;
                }
                shared.record_tick(false);

                let Some(source) = source.upgrade() else {
                    debug!("Transport released, ending stats polling");
                    break;
                };
                in_flight = Some(Box::pin(async move { source.fetch_raw_stats().await }));
            }
            result = next_sample(&mut in_flight) => {
                in_flight = None;
                shared.complete_fetch(&feed, generation, result);
            }
        }
    }
}

/// Marks the engine inactive when its polling task ends on its own
///
/// After `stop` the generation has moved on, so this is a no-op there.
struct DeactivateOnExit {
    shared: Arc<EngineShared>,
    generation: u64,
}

impl Drop for DeactivateOnExit {
    fn drop(&mut self) {
        self.shared.deactivate(self.generation);
    }
}

async fn next_sample(in_flight: &mut Option<PendingFetch>) -> Result<RawSample, StatsError> {
    match in_flight {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}
