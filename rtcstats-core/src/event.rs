//! Event feed for statistics and connection events
//!
//! [`EventFeed`] maps each [`Topic`] to an ordered list of subscribers and
//! dispatches synchronously, in subscription order, on the emitting thread.

use crate::error::StatsError;
use crate::report::StatsReport;
use crate::transport::ConnectionStatus;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::debug;

/// Named topics events are published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Derived statistics reports
    Stats,
    /// Connection lifecycle transitions
    StatusChange,
    /// Failed statistics fetches
    StatsError,
}

impl Topic {
    /// Topic name as exposed to applications
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Stats => "stats",
            Topic::StatusChange => "statusChange",
            Topic::StatsError => "statsError",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new statistics report is available
    Stats {
        /// The derived report
        report: StatsReport,
    },
    /// The connection status changed
    StatusChange {
        /// New connection status
        status: ConnectionStatus,
    },
    /// A statistics fetch failed; polling continues
    StatsError {
        /// Error that occurred
        error: StatsError,
    },
}

impl Event {
    /// Topic this event is published under
    pub fn topic(&self) -> Topic {
        match self {
            Event::Stats { .. } => Topic::Stats,
            Event::StatusChange { .. } => Topic::StatusChange,
            Event::StatsError { .. } => Topic::StatsError,
        }
    }

    /// Get the report carried by a stats event
    pub fn report(&self) -> Option<&StatsReport> {
        match self {
            Event::Stats { report } => Some(report),
            _ => None,
        }
    }
}

/// Identifies one subscription for later removal
pub type SubscriptionId = u64;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Topic-based publish/subscribe feed
pub struct EventFeed {
    subscribers: RwLock<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<Topic, usize> = self
            .subscribers
            .read()
            .iter()
            .map(|(topic, handlers)| (*topic, handlers.len()))
            .collect();
        f.debug_struct("EventFeed")
            .field("subscribers", &counts)
            .finish()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFeed {
    /// Create an empty feed
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a handler to a topic
    pub fn on<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!("Subscribed {} to topic {}", id, topic);
        id
    }

    /// Remove a subscription, returning whether it existed
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        for handlers in subscribers.values_mut() {
            if let Some(position) = handlers.iter().position(|(sub_id, _)| *sub_id == id) {
                handlers.remove(position);
                return true;
            }
        }
        false
    }

    /// Deliver an event to every subscriber of its topic, returning how many
    /// handlers ran
    ///
    /// Handlers run after the subscriber lock is released, so they may
    /// subscribe, unsubscribe or emit themselves.
    pub fn emit(&self, event: &Event) -> usize {
        let handlers: Vec<Handler> = match self.subscribers.read().get(&event.topic()) {
            Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of subscribers on a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .get(&topic)
            .map_or(0, |handlers| handlers.len())
    }

    /// Open an async stream of the events published under `topic`
    ///
    /// The subscription is removed when the stream is dropped.
    pub fn stream(self: &Arc<Self>, topic: Topic) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.on(topic, move |event| {
            let _ = tx.send(event.clone());
        });
        EventStream {
            receiver: rx,
            feed: Arc::downgrade(self),
            subscription: id,
        }
    }
}

/// Stream of events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
    feed: Weak<EventFeed>,
    subscription: SubscriptionId,
}

impl EventStream {
    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<Event>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Stop receiving new events; already buffered events can still be read
    pub fn close(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.off(self.subscription);
        }
        self.receiver.close();
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.off(self.subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn status_event(status: ConnectionStatus) -> Event {
        Event::StatusChange { status }
    }

    #[test]
    fn test_event_topics() {
        assert_eq!(Event::Stats { report: StatsReport::default() }.topic(), Topic::Stats);
        assert_eq!(status_event(ConnectionStatus::Connected).topic(), Topic::StatusChange);
        assert_eq!(Topic::StatusChange.as_str(), "statusChange");
        assert!(status_event(ConnectionStatus::New).report().is_none());
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let feed = EventFeed::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let calls = calls.clone();
            feed.on(Topic::StatusChange, move |_| calls.lock().push(label));
        }

        let delivered = feed.emit(&status_event(ConnectionStatus::Connecting));
        assert_eq!(delivered, 3);
        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let feed = EventFeed::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        feed.on(Topic::Stats, move |_| *counter.lock() += 1);

        assert_eq!(feed.emit(&status_event(ConnectionStatus::Connected)), 0);
        assert_eq!(*calls.lock(), 0);
        assert_eq!(feed.subscriber_count(Topic::Stats), 1);
        assert_eq!(feed.subscriber_count(Topic::StatsError), 0);
    }

    #[test]
    fn test_off_removes_subscription() {
        let feed = EventFeed::new();
        let id = feed.on(Topic::StatusChange, |_| {});
        assert!(feed.off(id));
        assert!(!feed.off(id));
        assert_eq!(feed.subscriber_count(Topic::StatusChange), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let feed = Arc::new(EventFeed::new());
        let own_id = Arc::new(Mutex::new(None));

        let weak_feed = Arc::downgrade(&feed);
        let slot = own_id.clone();
        let id = feed.on(Topic::StatusChange, move |_| {
            if let (Some(feed), Some(id)) = (weak_feed.upgrade(), *slot.lock()) {
                feed.off(id);
            }
        });
        *own_id.lock() = Some(id);

        assert_eq!(feed.emit(&status_event(ConnectionStatus::Connected)), 1);
        assert_eq!(feed.emit(&status_event(ConnectionStatus::Closed)), 0);
    }

    #[tokio::test]
    async fn test_event_stream_receives_topic_events() {
        let feed = Arc::new(EventFeed::new());
        let mut stream = feed.stream(Topic::StatusChange);

        feed.emit(&status_event(ConnectionStatus::Connecting));
        feed.emit(&Event::Stats { report: StatsReport::default() });

        let received = stream.next().await.unwrap();
        assert_eq!(received, status_event(ConnectionStatus::Connecting));
        assert!(stream.try_next().unwrap().is_none());
    }

    #[test]
    fn test_dropping_stream_unsubscribes() {
        let feed = Arc::new(EventFeed::new());
        let stream = feed.stream(Topic::Stats);
        assert_eq!(feed.subscriber_count(Topic::Stats), 1);
        drop(stream);
        assert_eq!(feed.subscriber_count(Topic::Stats), 0);
    }
}
