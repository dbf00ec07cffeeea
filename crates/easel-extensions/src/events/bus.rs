//! Synchronous event bus.

use std::sync::Arc;

use tracing::trace;

use crate::events::ExtensionEvent;
use crate::events::subscriber::SubscriberRegistry;

/// Broadcasts [`ExtensionEvent`]s to every registered subscriber.
///
/// Clones share one [`SubscriberRegistry`]. A subscriber that stores a clone
/// of the bus it is registered on creates an `Arc` cycle and is never
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<SubscriberRegistry>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to all subscribers, returning how many were called.
    pub fn publish(&self, event: &ExtensionEvent<'_>) -> usize {
        let count = self.registry.notify(event, self);
        trace!(
            event_type = event.event_type(),
            extension = %event.extension().name(),
            subscribers = count,
            "Published event"
        );
        count
    }

    /// The subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use easel_test::{FixedTheme, RecordingConfigStore};

    use super::*;
    use crate::context::ExtensionContext;
    use crate::events::{EventFilter, EventSubscriber, FilterSubscriber, SubscriberId};
    use crate::extension::Extension;

    fn extension(name: &str) -> Extension {
        let ctx = ExtensionContext::new(
            Arc::new(RecordingConfigStore::new()),
            Arc::new(FixedTheme::new("default")),
        );
        Extension::new("/x", name, name, true, false, ctx)
    }

    #[test]
    fn publish_without_subscribers() {
        let bus = EventBus::new();
        let ext = extension("foo");
        assert_eq!(bus.publish(&ExtensionEvent::NewExtension(&ext)), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.registry().register(Arc::new(FilterSubscriber::new(tag, move |event| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{}:{}", event.event_type(), event.extension().name()));
            })));
        }

        let ext = extension("foo");
        assert_eq!(bus.publish(&ExtensionEvent::ThemesChange(&ext)), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            ["first:themes_change:foo", "second:themes_change:foo"]
        );
    }

    #[test]
    fn filter_limits_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let subscriber = FilterSubscriber::new("palettes-only", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .with_filter(EventFilter::types(["palettes_change"]));
        bus.registry().register(Arc::new(subscriber));

        let ext = extension("foo");
        bus.publish(&ExtensionEvent::NewExtension(&ext));
        bus.publish(&ExtensionEvent::ThemesChange(&ext));
        bus.publish(&ExtensionEvent::PalettesChange(&ext));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let id = clone
            .registry()
            .register(Arc::new(FilterSubscriber::new("noop", |_| {})));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.registry().unregister(id));
        assert!(!bus.registry().unregister(id));
        assert!(clone.registry().is_empty());
    }

    #[test]
    fn subscriber_can_unregister_itself() {
        struct UnregisteringSubscriber {
            my_id: Mutex<Option<SubscriberId>>,
        }

        impl EventSubscriber for UnregisteringSubscriber {
            fn on_event(&self, _event: &ExtensionEvent<'_>, bus: &EventBus) {
                let id = self.my_id.lock().unwrap().expect("id not set");
                // Must not deadlock against notify.
                bus.registry().unregister(id);
            }
        }

        let bus = EventBus::new();
        let subscriber = Arc::new(UnregisteringSubscriber {
            my_id: Mutex::new(None),
        });
        let id = bus
            .registry()
            .register(Arc::clone(&subscriber) as Arc<dyn EventSubscriber>);
        *subscriber.my_id.lock().unwrap() = Some(id);

        let ext = extension("foo");
        bus.publish(&ExtensionEvent::NewExtension(&ext));
        assert_eq!(bus.registry().len(), 0);
    }
}
