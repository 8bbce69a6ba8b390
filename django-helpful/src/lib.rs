//! # django-helpful
//!
//! Class-based view helpers for model CRUD pages.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on it for
//! everything, or on the individual `helpful-*` crates for finer control.
//!
//! Features: `views` (default) and `testing`.

/// Errors, settings and logging setup.
pub use helpful_core as core;

/// Requests, responses, query dicts and flash messages.
pub use helpful_http as http;

/// Model metadata, the object store and cascade collection.
pub use helpful_db as db;

/// Forms, model forms, formsets and field layout specs.
pub use helpful_forms as forms;

/// View mixins, generic views, multi-object views and the axum router.
#[cfg(feature = "views")]
pub use helpful_views as views;

/// The `WebTest` client and form error assertions.
#[cfg(feature = "testing")]
pub use helpful_test as test;

/// Third-party crates the public API is built on.
pub use async_trait::async_trait;
pub use axum;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The names most views need.
pub mod prelude {
    pub use helpful_core::{HelpfulError, HelpfulResult, Settings};
    pub use helpful_db::{FieldDef, FieldType, Instance, MemoryStore, ModelMeta, ObjectStore, OnDelete};
    pub use helpful_forms::{field_layout, FieldLayout, Form, FormClass};
    pub use helpful_http::{HttpRequest, HttpResponse, HttpResponseRedirect, QueryDict};

    #[cfg(feature = "views")]
    pub use helpful_views::{
        ContextMixin, CreateView, DeleteView, DetailView, FormFieldMixin, FormSlot, ListView,
        ModelFormMixin, ModelMixin, MultiFormMixin, MultiObjectUpdateView,
        MultipleObjectCreateView, SearchableListMixin, SingleObjectMixin, SlotMap,
        SortableListMixin, TemplateResponseMixin, TitleMixin, UpdateView, View, ViewServices,
    };

    #[cfg(feature = "testing")]
    pub use helpful_test::{assert_form_has_no_errors, WebTest};

    pub use async_trait::async_trait;
}
