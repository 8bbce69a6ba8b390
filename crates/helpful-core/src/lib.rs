//! # helpful-core
//!
//! Core types shared by every django-helpful crate: the error enum, the
//! settings struct and the tracing setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - View-layer settings and TOML loading
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{HelpfulError, HelpfulResult, ValidationError};
pub use settings::{ModelFormBase, Settings};
