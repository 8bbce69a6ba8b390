//! Class-based views.
//!
//! - [`class_based`] - The view base and the shared mixins
//! - [`generic`] - List, detail, create and update views
//! - [`delete`] - Cascade-aware delete confirmation
//! - [`multi`] - Several model forms saved from one submission

pub mod class_based;
pub mod delete;
pub mod generic;
pub mod multi;

pub use class_based::{
    error_response, render_template_response, ContextMixin, ModelMixin, TemplateResponseMixin,
    View, ViewFunction,
};
pub use delete::{format_object, DeleteView};
pub use generic::{popup_response, CreateView, DetailView, ListView, ModelFormMixin, UpdateView};
pub use multi::{
    FormSlot, FormSource, MultiFormMixin, MultiObjectUpdateView, MultipleObjectCreateView, SlotMap,
};
