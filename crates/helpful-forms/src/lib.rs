//! # helpful-forms
//!
//! Forms for the django-helpful views: typed field cleaning, model forms
//! generated from [`ModelMeta`](helpful_db::ModelMeta), formsets, and the
//! grid layouts built from declarative field layout specs.
//!
//! ## Modules
//!
//! - [`fields`] - Field types, cleaning and widgets
//! - [`errors`] - Per-field error maps
//! - [`form`] - The [`Form`] trait, [`FormClass`] and [`BaseForm`]
//! - [`model_form`] - [`modelform_factory`] and [`ModelForm`]
//! - [`formset`] - [`FormSet`]
//! - [`layout`] - Layout trees and [`FormHelper`]
//! - [`field_layout`] - Field layout specs and the grid builder

pub mod errors;
pub mod field_layout;
pub mod fields;
pub mod form;
pub mod formset;
pub mod layout;
pub mod model_form;

pub use errors::{FormErrors, NON_FIELD_ERRORS};
pub use field_layout::{construct_form_layout, get_flat_fields, FieldLayout, DELETE_FIELD};
pub use fields::{FormFieldDef, FormFieldType, Widget};
pub use form::{all_valid, BaseForm, Form, FormClass, FormKwargs};
pub use formset::{FormSet, DEFAULT_ABSOLUTE_MAX};
pub use layout::{Div, FormHelper, Layout, LayoutObject};
pub use model_form::{modelform_factory, ModelForm, ModelFormClass};
