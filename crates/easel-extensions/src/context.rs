//! Collaborators injected into every extension.

use std::fmt;
use std::sync::Arc;

use easel_config::{ConfigStore, CurrentTheme};

/// Host services an [`Extension`](crate::Extension) needs: where to persist
/// its enabled flag and which theme is currently selected.
#[derive(Clone)]
pub struct ExtensionContext {
    config: Arc<dyn ConfigStore>,
    theme: Arc<dyn CurrentTheme>,
}

impl ExtensionContext {
    /// Create a context from its two collaborators.
    #[must_use]
    pub fn new(config: Arc<dyn ConfigStore>, theme: Arc<dyn CurrentTheme>) -> Self {
        Self { config, theme }
    }

    /// Create a context where one object serves both roles, as
    /// [`Preferences`](easel_config::Preferences) does.
    #[must_use]
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: ConfigStore + CurrentTheme + 'static,
    {
        let config: Arc<dyn ConfigStore> = Arc::<T>::clone(&store);
        let theme: Arc<dyn CurrentTheme> = store;
        Self { config, theme }
    }

    /// Flag storage.
    #[must_use]
    pub fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    /// Current theme selection.
    #[must_use]
    pub fn theme(&self) -> &dyn CurrentTheme {
        self.theme.as_ref()
    }
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("selected_theme", &self.theme.selected_theme())
            .finish_non_exhaustive()
    }
}
