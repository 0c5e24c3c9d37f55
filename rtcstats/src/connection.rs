//! Connection lifecycle and statistics collection API

use crate::ConnectionConfig;
use parking_lot::Mutex;
use rtcstats_core::{
    ConnectOptions, ConnectionStatus, Connector, Event, EventFeed, EventStream, RawStatsSource,
    StatsError, SubscriptionId, Topic,
};
use rtcstats_diagnostics::{IntervalArg, PollConfig, StatsEngine, StatsEngineMetrics};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fluent builder for a [`ConnectionController`]
pub struct ConnectionBuilder {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConnectionBuilder {
    /// Start building a controller that establishes transports via `connector`
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            config: ConnectionConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Polling period used by `get_stats(None)`
    pub fn default_stats_interval(mut self, seconds: u64) -> Self {
        self.config.default_stats_interval_secs = seconds;
        self
    }

    /// Upper bound on transport establishment
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Validate the configuration and create the controller
    pub fn build(self) -> Result<ConnectionController, StatsError> {
        self.config.validate()?;
        Ok(ConnectionController::new(self.connector, self.config))
    }
}

#[derive(Default)]
struct ControllerState {
    status: ConnectionStatus,
    transport: Option<Arc<dyn RawStatsSource>>,
    stats_engine: Option<StatsEngine>,
}

/// Owns one peer transport's lifecycle and its statistics engine
///
/// All operations take `&self`; share the controller behind an `Arc` to call
/// it from event handlers or other tasks.
pub struct ConnectionController {
    id: Uuid,
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    feed: Arc<EventFeed>,
    state: Mutex<ControllerState>,
}

impl fmt::Debug for ConnectionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConnectionController")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("has_transport", &state.transport.is_some())
            .field("stats_engine", &state.stats_engine)
            .field("feed", &self.feed)
            .finish()
    }
}

impl ConnectionController {
    /// Create a disconnected controller from an already validated config
    pub(crate) fn new(connector: Arc<dyn Connector>, config: ConnectionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            connector,
            config,
            feed: Arc::new(EventFeed::new()),
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Unique identifier of this controller, used in log lines
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration in effect
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle status
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    /// Establish the peer transport
    ///
    /// Fails with [`StatsError::InvalidOperation`] while connected or while
    /// a connect is in progress. After `Disconnected`, `Failed` or `Closed`
    /// the previous transport and its stats engine are released first. A
    /// connector error or timeout leaves the controller `Failed`.
    pub async fn connect(&self, options: ConnectOptions) -> Result<(), StatsError> {
        let (engine, transport) = {
            let mut state = self.state.lock();
            if matches!(
                state.status,
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            ) {
                return Err(StatsError::InvalidOperation {
                    operation: format!("connect while {}", state.status),
                });
            }
            state.status = ConnectionStatus::Connecting;
            (state.stats_engine.take(), state.transport.take())
        };

        if let Some(mut engine) = engine {
            engine.stop();
            debug!("Connection {} released stale stats engine", self.id);
        }
        drop(transport);
        self.publish_status(ConnectionStatus::Connecting);

        info!(
            "Connection {} connecting to stream {}",
            self.id, options.stream_name
        );

        let timeout = self.config.connect_timeout();
        let result = match tokio::time::timeout(timeout, self.connector.connect(&options)).await {
            Ok(result) => result,
            Err(_) => Err(StatsError::Timeout {
                operation: "connect".to_string(),
                duration: timeout,
            }),
        };

        match result {
            Ok(transport) => {
                {
                    let mut state = self.state.lock();
                    if state.status != ConnectionStatus::Connecting {
                        // Closed while the connector was still running.
                        return Err(StatsError::InvalidOperation {
                            operation: format!("connect completed while {}", state.status),
                        });
                    }
                    state.transport = Some(transport);
                    state.status = ConnectionStatus::Connected;
                }
                info!("Connection {} established", self.id);
                self.publish_status(ConnectionStatus::Connected);
                Ok(())
            }
            Err(error) => {
                warn!("Connection {} failed: {}", self.id, error);
                {
                    let mut state = self.state.lock();
                    if state.status != ConnectionStatus::Connecting {
                        // Closed while the connector was still running.
                        return Err(error);
                    }
                    state.status = ConnectionStatus::Failed;
                }
                self.publish_status(ConnectionStatus::Failed);
                Err(error)
            }
        }
    }

    /// Begin periodic statistics collection
    ///
    /// Without a transport this is a silent no-op. While collection is
    /// active any further call is a no-op regardless of `interval`. `None`
    /// selects the configured default period. An invalid interval fails with
    /// [`StatsError::InvalidInterval`] and leaves no engine behind.
    pub fn get_stats(&self, interval: Option<IntervalArg>) -> Result<(), StatsError> {
        let mut state = self.state.lock();

        let Some(transport) = state.transport.as_ref() else {
            debug!("Connection {} has no transport, ignoring get_stats", self.id);
            return Ok(());
        };

        if state
            .stats_engine
            .as_ref()
            .is_some_and(|engine| engine.is_active())
        {
            debug!("Connection {} already collecting stats", self.id);
            return Ok(());
        }

        let config = match interval {
            Some(interval) => PollConfig::from_arg(Some(interval))?,
            None => PollConfig::new(self.config.default_stats_interval_secs)?,
        };

        let mut engine = StatsEngine::new(Arc::downgrade(transport), self.feed.clone());
        engine.start_with(config)?;
        let finished = state.stats_engine.replace(engine);
        drop(state);

        // An engine that ended on its own is already inactive.
        drop(finished);
        info!(
            "Connection {} collecting stats every {}s",
            self.id,
            config.interval_seconds()
        );
        Ok(())
    }

    /// Stop statistics collection, if running
    ///
    /// May be called from inside a stats handler. No report is delivered
    /// after this returns.
    pub fn stop_stats(&self) {
        let engine = self.state.lock().stats_engine.take();
        if let Some(mut engine) = engine {
            engine.stop();
            debug!("Connection {} released stats engine", self.id);
        }
    }

    /// Whether a statistics engine is currently polling
    pub fn is_collecting_stats(&self) -> bool {
        self.state
            .lock()
            .stats_engine
            .as_ref()
            .is_some_and(|engine| engine.is_active())
    }

    /// Polling configuration of the current engine
    pub fn stats_poll_config(&self) -> Option<PollConfig> {
        self.state
            .lock()
            .stats_engine
            .as_ref()
            .and_then(|engine| engine.poll_config())
    }

    /// Counters of the current engine
    pub fn stats_metrics(&self) -> Option<StatsEngineMetrics> {
        self.state
            .lock()
            .stats_engine
            .as_ref()
            .map(|engine| engine.metrics())
    }

    /// Apply a lifecycle notification from the transport
    ///
    /// Repeated identical statuses are ignored. `Closed` stops collection and
    /// releases the transport.
    pub fn handle_transport_status(&self, status: ConnectionStatus) {
        let (engine, transport) = {
            let mut state = self.state.lock();
            if state.status == status {
                return;
            }
            state.status = status;
            if status == ConnectionStatus::Closed {
                (state.stats_engine.take(), state.transport.take())
            } else {
                (None, None)
            }
        };

        if let Some(mut engine) = engine {
            engine.stop();
        }
        drop(transport);

        debug!("Connection {} status is now {}", self.id, status);
        self.publish_status(status);
    }

    /// Stop collection, release the transport and move to `Closed`
    pub fn close(&self) {
        self.handle_transport_status(ConnectionStatus::Closed);
        info!("Connection {} closed", self.id);
    }

    /// Subscribe a handler to a topic
    pub fn on<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.feed.on(topic, handler)
    }

    /// Remove a subscription, returning whether it existed
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.feed.off(id)
    }

    /// Async stream of the events published under `topic`
    pub fn events(&self, topic: Topic) -> EventStream {
        self.feed.stream(topic)
    }

    fn publish_status(&self, status: ConnectionStatus) {
        self.feed.emit(&Event::StatusChange { status });
    }
}
