//! Shared handles every view needs.

use std::sync::Arc;

use helpful_core::Settings;
use helpful_db::ObjectStore;

use crate::template::TemplateRenderer;

/// The store, settings and renderer a view runs against.
///
/// Cheap to clone; views hold their own copy.
#[derive(Clone)]
pub struct ViewServices {
    /// The object store.
    pub store: Arc<dyn ObjectStore>,
    /// View-layer settings.
    pub settings: Arc<Settings>,
    /// The template renderer. Without one, views fall back to a JSON dump
    /// of the context.
    pub renderer: Option<Arc<dyn TemplateRenderer>>,
}

impl ViewServices {
    /// Creates services with default settings and no renderer.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            settings: Arc::new(Settings::default()),
            renderer: None,
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Sets the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

impl std::fmt::Debug for ViewServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewServices")
            .field("models", &self.store.models().len())
            .field("settings", &self.settings)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}
