//! Event Bus implementation.
//!
//! Distributes generation events to synchronous handlers and async
//! receivers. Each engine owns its bus; there is no global instance.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventCategory, GenerationEvent};

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.simple().to_string()[..8])
    }
}

/// Which events a handler receives
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Events of any of these categories
    Categories(Vec<EventCategory>),
    /// Events of one output object
    Run(String),
}

impl EventFilter {
    pub fn matches(&self, event: &GenerationEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
            EventFilter::Run(name) => event.name() == name,
        }
    }
}

type EventHandler = Arc<dyn Fn(GenerationEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Broadcast channel capacity for async receivers
    pub channel_capacity: usize,
    /// Keep published events for later inspection
    pub enable_history: bool,
    /// Oldest events are dropped past this count
    pub max_history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 512,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Event bus for generation progress and results
pub struct EventBus {
    sender: broadcast::Sender<GenerationEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    history: Mutex<VecDeque<GenerationEvent>>,
    config: EventBusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// Publish an event to every matching handler and receiver
    ///
    /// Returns how many handlers and receivers got the event. Handlers run
    /// on the publishing thread, outside the handler lock, so they may
    /// subscribe or unsubscribe.
    pub fn publish(&self, event: GenerationEvent) -> Result<usize, EventBusError> {
        if self.config.enable_history {
            let mut history = self.history.lock();
            history.push_back(event.clone());
            while history.len() > self.config.max_history_size {
                history.pop_front();
            }
        }

        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        let handled = matching.len();
        for handler in matching {
            handler(event.clone());
        }

        let received = self.sender.send(event).unwrap_or(0);
        if handled + received == 0 && self.subscriber_count() == 0 {
            return Err(EventBusError::NoSubscribers);
        }
        Ok(handled + received)
    }

    /// Subscribe a synchronous handler
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(GenerationEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers
            .write()
            .insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Receiver for polling events from a tokio task
    pub fn receiver(&self) -> broadcast::Receiver<GenerationEvent> {
        self.sender.subscribe()
    }

    /// Returns true if the subscription existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Number of synchronous handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Recorded events, oldest first; empty unless history is enabled
    pub fn history(&self) -> Vec<GenerationEvent> {
        self.history.lock().iter().cloned().collect()
    }

    /// Recorded events of one output object
    pub fn run_history(&self, name: &str) -> Vec<GenerationEvent> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ToolId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn progress(name: &str, percent: u8) -> GenerationEvent {
        GenerationEvent::Progress {
            name: name.to_string(),
            tool_id: ToolId(1),
            percent,
        }
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.publish(progress("job", 10)),
            Err(EventBusError::NoSubscribers)
        ));
    }

    #[test]
    fn test_filtered_subscriber_still_counts_as_listener() {
        let bus = EventBus::new();
        bus.subscribe(EventFilter::Run("other".to_string()), |_| {});
        assert_eq!(bus.publish(progress("job", 10)).unwrap(), 0);
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let failures = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let fc = failures.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Failure]),
            move |_| {
                fc.fetch_add(1, Ordering::SeqCst);
            },
        );
        let rc = runs.clone();
        bus.subscribe(EventFilter::Run("top".to_string()), move |_| {
            rc.fetch_add(1, Ordering::SeqCst);
        });
        let ac = all.clone();
        bus.subscribe(EventFilter::All, move |_| {
            ac.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(progress("top", 50)).unwrap(), 2);
        bus.publish(GenerationEvent::Cancelled {
            name: "bottom".to_string(),
        })
        .unwrap();

        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let (b, s) = (Arc::downgrade(&bus), slot.clone());
        let id = bus.subscribe(EventFilter::All, move |_| {
            if let (Some(bus), Some(id)) = (b.upgrade(), *s.lock()) {
                bus.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);
        bus.publish(progress("job", 1)).unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_history_per_run() {
        let bus = EventBus::with_config(EventBusConfig {
            enable_history: true,
            max_history_size: 5,
            ..Default::default()
        });
        for i in 0..8 {
            let name = if i % 2 == 0 { "a" } else { "b" };
            bus.publish(progress(name, i * 10)).ok();
        }
        assert_eq!(bus.history().len(), 5);
        assert_eq!(bus.run_history("a").len(), 2);

        bus.clear_history();
        assert!(bus.history().is_empty());
    }

    #[test]
    fn test_history_disabled_by_default() {
        let bus = EventBus::new();
        bus.publish(progress("job", 1)).ok();
        assert!(bus.history().is_empty());
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();
        assert_eq!(bus.publish(progress("job", 100)).unwrap(), 1);
        match receiver.try_recv() {
            Ok(GenerationEvent::Progress { percent, .. }) => assert_eq!(percent, 100),
            other => panic!("Wrong event received: {:?}", other),
        }
    }
}
