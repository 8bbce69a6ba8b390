//! # helpful-views
//!
//! Class-based view mixins and generic views for model CRUD pages.
//!
//! Views are plain structs that implement a stack of traits: [`View`] for
//! method dispatch, [`ModelMixin`] for the store and model, and one generic
//! view trait ([`ListView`], [`DetailView`], [`CreateView`], [`UpdateView`],
//! [`DeleteView`], [`MultipleObjectCreateView`] or
//! [`MultiObjectUpdateView`]) whose default methods implement the page.
//!
//! [`FormFieldMixin`] turns a nested field spec into a model form with a
//! grid layout, and [`TitleMixin`] adds a page title to the context.
//! [`server::ViewRouter`] serves views over axum.

pub mod mixins;
pub mod pagination;
pub mod server;
pub mod services;
pub mod template;
pub mod views;

pub use mixins::{
    FormFieldMixin, SearchableListMixin, SingleObjectMixin, SortDirection, SortableListMixin,
    TitleMixin,
};
pub use services::ViewServices;
pub use template::{TemplateRenderer, TeraRenderer};
pub use views::{
    error_response, format_object, popup_response, ContextMixin, CreateView, DeleteView,
    DetailView, FormSlot, FormSource, ListView, ModelFormMixin, ModelMixin, MultiFormMixin,
    MultiObjectUpdateView, MultipleObjectCreateView, SlotMap, TemplateResponseMixin, UpdateView,
    View, ViewFunction,
};
