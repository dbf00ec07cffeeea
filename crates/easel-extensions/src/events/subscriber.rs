//! Synchronous event subscribers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::events::{EventBus, ExtensionEvent};

/// Handle returned by [`SubscriberRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Receives events synchronously.
pub trait EventSubscriber: Send + Sync {
    /// Handle one event. `bus` is the bus that published it, so a subscriber
    /// may unregister itself from here.
    fn on_event(&self, event: &ExtensionEvent<'_>, bus: &EventBus);
}

/// Event kinds a [`FilterSubscriber`] accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Accept every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given [`ExtensionEvent::event_type`] names.
    #[must_use]
    pub fn types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            event_types: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `event` passes the filter.
    #[must_use]
    pub fn matches(&self, event: &ExtensionEvent<'_>) -> bool {
        self.event_types
            .as_ref()
            .is_none_or(|types| types.iter().any(|t| t == event.event_type()))
    }
}

type Handler = dyn Fn(&ExtensionEvent<'_>) + Send + Sync;

/// Subscriber built from a closure.
pub struct FilterSubscriber {
    name: String,
    filter: EventFilter,
    handler: Box<Handler>,
}

impl FilterSubscriber {
    /// Wrap `handler`; it receives every event until a filter is set.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExtensionEvent<'_>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            filter: EventFilter::all(),
            handler: Box::new(handler),
        }
    }

    /// Restrict delivery to events matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl EventSubscriber for FilterSubscriber {
    fn on_event(&self, event: &ExtensionEvent<'_>, _bus: &EventBus) {
        if self.filter.matches(event) {
            (self.handler)(event);
        }
    }
}

impl fmt::Debug for FilterSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSubscriber")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

type Entry = (SubscriberId, Arc<dyn EventSubscriber>);

/// Set of synchronous subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Subscribers are called in registration order.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        trace!(subscriber = %id, "Registered subscriber");
        id
    }

    /// Remove a subscriber, returning whether it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .iter()
                .position(|(sid, _)| *sid == id)
                .map(|index| subscribers.remove(index))
        };
        // Dropped after the lock is released: a subscriber's Drop may publish.
        let found = removed.is_some();
        drop(removed);
        if found {
            trace!(subscriber = %id, "Unregistered subscriber");
        }
        found
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every subscriber with `event`, returning how many were called.
    ///
    /// Works on a snapshot, so subscribers may register or unregister from
    /// inside their callback.
    pub(crate) fn notify(&self, event: &ExtensionEvent<'_>, bus: &EventBus) -> usize {
        let snapshot: Vec<Arc<dyn EventSubscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        for subscriber in &snapshot {
            subscriber.on_event(event, bus);
        }
        snapshot.len()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}
