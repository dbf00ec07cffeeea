//! Change notifications for the extension registry.
//!
//! Delivery is synchronous: [`EventBus::publish`] calls every registered
//! [`EventSubscriber`] on the calling thread before returning. Events borrow
//! the [`Extension`] they describe, so subscribers that need data beyond the
//! callback must copy it out.

mod bus;
mod subscriber;

pub use bus::EventBus;
pub use subscriber::{
    EventFilter, EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry,
};

use crate::extension::Extension;

/// An event emitted by the registry.
#[derive(Debug, Clone, Copy)]
pub enum ExtensionEvent<'a> {
    /// An extension was installed from an archive.
    NewExtension(&'a Extension),
    /// The extension's themes became available or unavailable.
    ThemesChange(&'a Extension),
    /// The extension's palettes became available or unavailable.
    PalettesChange(&'a Extension),
}

impl<'a> ExtensionEvent<'a> {
    /// Stable name of the event kind, used by [`EventFilter`].
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewExtension(_) => "new_extension",
            Self::ThemesChange(_) => "themes_change",
            Self::PalettesChange(_) => "palettes_change",
        }
    }

    /// The extension the event is about.
    #[must_use]
    pub fn extension(&self) -> &'a Extension {
        match *self {
            Self::NewExtension(ext) | Self::ThemesChange(ext) | Self::PalettesChange(ext) => ext,
        }
    }
}

/// Publish the contribution events for `extension`: themes first, then
/// palettes, each only when the extension has entries of that kind.
pub(crate) fn publish_contribution_changes(bus: &EventBus, extension: &Extension) {
    if !extension.themes().is_empty() {
        bus.publish(&ExtensionEvent::ThemesChange(extension));
    }
    if !extension.palettes().is_empty() {
        bus.publish(&ExtensionEvent::PalettesChange(extension));
    }
}
